//! Book instance (physical copy) model and loan-related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Availability of a physical copy.
///
/// Stored as the single-letter codes `m`, `o`, `a`, `r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    #[sqlx(rename = "m")]
    Maintenance,
    #[sqlx(rename = "o")]
    OnLoan,
    #[default]
    #[sqlx(rename = "a")]
    Available,
    #[sqlx(rename = "r")]
    Reserved,
}

impl LoanStatus {
    /// Single-letter storage code
    pub fn code(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "m",
            LoanStatus::OnLoan => "o",
            LoanStatus::Available => "a",
            LoanStatus::Reserved => "r",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanStatus::Maintenance => "in maintenance",
            LoanStatus::OnLoan => "on loan",
            LoanStatus::Available => "available",
            LoanStatus::Reserved => "reserved",
        };
        write!(f, "{}", label)
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "m" | "maintenance" => Ok(LoanStatus::Maintenance),
            "o" | "on_loan" => Ok(LoanStatus::OnLoan),
            "a" | "available" => Ok(LoanStatus::Available),
            "r" | "reserved" => Ok(LoanStatus::Reserved),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

/// A specific copy of a book that can be borrowed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookInstance {
    pub id: Uuid,
    pub book_id: i64,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub status: LoanStatus,
    pub borrower_id: Option<i64>,
}

impl BookInstance {
    pub fn new(book_id: i64, imprint: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id,
            imprint: imprint.into(),
            due_back: None,
            status: LoanStatus::default(),
            borrower_id: None,
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_back.is_some_and(|d| d < today)
    }
}

impl AsRef<BookInstance> for BookInstance {
    fn as_ref(&self) -> &BookInstance {
        self
    }
}

/// Copy joined with its book title and borrower, as shown in loan listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct LoanEntry {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub instance: BookInstance,
    pub book_title: String,
    pub borrower_login: Option<String>,
    #[sqlx(default)]
    pub is_overdue: bool,
}

impl AsRef<BookInstance> for LoanEntry {
    fn as_ref(&self) -> &BookInstance {
        &self.instance
    }
}

/// Create a copy of an existing book
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInstance {
    #[validate(length(min = 1, max = 200, message = "Imprint must be 1 to 200 characters"))]
    pub imprint: String,
    /// Initial status (defaults to available)
    pub status: Option<LoanStatus>,
    /// Borrower, required when the copy starts out on loan
    pub borrower_id: Option<i64>,
    pub due_back: Option<NaiveDate>,
}

/// Librarian renewal request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RenewRequest {
    /// New due date (between today and 4 weeks ahead)
    pub renewal_date: NaiveDate,
}

/// Renewal form: the copy and the proposed new due date
#[derive(Debug, Serialize, ToSchema)]
pub struct RenewForm {
    pub instance: LoanEntry,
    pub proposed_renewal_date: NaiveDate,
}

/// Lend a copy to a user
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub borrower_id: i64,
    /// Defaults to three weeks from today
    pub due_back: Option<NaiveDate>,
}

/// Maintenance / reservation toggle
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatus {
    pub status: LoanStatus,
}

/// Page selector for loan listings
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    pub page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip_through_from_str() {
        for status in [
            LoanStatus::Maintenance,
            LoanStatus::OnLoan,
            LoanStatus::Available,
            LoanStatus::Reserved,
        ] {
            assert_eq!(status.code().parse::<LoanStatus>(), Ok(status));
        }
        assert!("x".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn test_new_copy_is_available() {
        let copy = BookInstance::new(3, "Penguin, 2001");
        assert_eq!(copy.status, LoanStatus::Available);
        assert_eq!(copy.borrower_id, None);
        assert_eq!(copy.book_id, 3);
    }

    #[test]
    fn test_overdue_is_strictly_before_today() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let mut copy = BookInstance::new(1, "Imprint");
        assert!(!copy.is_overdue(today));

        copy.due_back = Some(today);
        assert!(!copy.is_overdue(today));

        copy.due_back = today.pred_opt();
        assert!(copy.is_overdue(today));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&LoanStatus::OnLoan).unwrap();
        assert_eq!(json, "\"on_loan\"");
    }
}
