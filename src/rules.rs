//! Loan validation rules
//!
//! Pure functions that guard writes to authors and book instances, and that
//! define the canonical ordering of loan listings. Nothing in here reads the
//! clock or touches the database: the caller passes `today` and the records.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::instance::{BookInstance, LoanStatus};

/// Furthest a renewal (or a checkout due date) may be set ahead of today.
pub const MAX_RENEWAL_WEEKS: i64 = 4;

/// Renewal date proposed to librarians when none was supplied.
pub const DEFAULT_RENEWAL_WEEKS: i64 = 3;

/// Form field a date error is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    DateOfBirth,
    DateOfDeath,
    RenewalDate,
    DueBack,
}

impl DateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateField::DateOfBirth => "date_of_birth",
            DateField::DateOfDeath => "date_of_death",
            DateField::RenewalDate => "renewal_date",
            DateField::DueBack => "due_back",
        }
    }
}

/// Why a single date was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvalidDateReason {
    FutureDated,
    PastDated,
    TooFarAhead,
}

/// Librarian action attempted on a book instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanAction {
    Checkout,
    Renew,
    Return,
    SetStatus,
}

impl std::fmt::Display for LoanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanAction::Checkout => "check out",
            LoanAction::Renew => "renew",
            LoanAction::Return => "return",
            LoanAction::SetStatus => "change the status of",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("{}", invalid_date_message(.field, .reason))]
    InvalidDate {
        field: DateField,
        reason: InvalidDateReason,
    },

    #[error("Invalid date - date of death before date of birth")]
    InvalidDateOrder,

    #[error("Cannot {action} a copy that is {from}")]
    InvalidTransition { from: LoanStatus, action: LoanAction },
}

impl RuleError {
    /// Field the error belongs to; `None` for form-wide errors.
    pub fn field(&self) -> Option<DateField> {
        match self {
            RuleError::InvalidDate { field, .. } => Some(*field),
            RuleError::InvalidDateOrder | RuleError::InvalidTransition { .. } => None,
        }
    }
}

fn invalid_date_message(field: &DateField, reason: &InvalidDateReason) -> String {
    match (field, reason) {
        (DateField::DateOfBirth, InvalidDateReason::FutureDated) => {
            "Invalid date - date of birth in the future".to_string()
        }
        (DateField::DateOfDeath, InvalidDateReason::FutureDated) => {
            "Invalid date - date of death in the future".to_string()
        }
        (DateField::RenewalDate, InvalidDateReason::PastDated) => {
            "Invalid date - renewal in past".to_string()
        }
        (DateField::RenewalDate, InvalidDateReason::TooFarAhead) => {
            "Invalid date - renewal more than 4 weeks ahead".to_string()
        }
        (field, InvalidDateReason::PastDated) => {
            format!("Invalid date - {} in the past", field.as_str().replace('_', " "))
        }
        (field, InvalidDateReason::TooFarAhead) => {
            format!("Invalid date - {} more than 4 weeks ahead", field.as_str().replace('_', " "))
        }
        (field, InvalidDateReason::FutureDated) => {
            format!("Invalid date - {} in the future", field.as_str().replace('_', " "))
        }
    }
}

// ---------------------------------------------------------------------------
// Date validators
// ---------------------------------------------------------------------------

/// Validate an author's life dates against `today`.
///
/// Checks run in a fixed order: date of death in the future, date of birth in
/// the future, then birth after death. The pair is returned unchanged.
pub fn validate_author_dates(
    date_of_birth: Option<NaiveDate>,
    date_of_death: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), RuleError> {
    if date_of_death.is_some_and(|dod| dod > today) {
        return Err(RuleError::InvalidDate {
            field: DateField::DateOfDeath,
            reason: InvalidDateReason::FutureDated,
        });
    }

    if date_of_birth.is_some_and(|dob| dob > today) {
        return Err(RuleError::InvalidDate {
            field: DateField::DateOfBirth,
            reason: InvalidDateReason::FutureDated,
        });
    }

    if let (Some(dob), Some(dod)) = (date_of_birth, date_of_death) {
        if dob > dod {
            return Err(RuleError::InvalidDateOrder);
        }
    }

    Ok((date_of_birth, date_of_death))
}

/// Validate a renewal date: not before today, at most four weeks ahead.
pub fn validate_renewal_date(candidate: NaiveDate, today: NaiveDate) -> Result<NaiveDate, RuleError> {
    validate_due_date(candidate, today, DateField::RenewalDate)
}

/// Renewal date offered when the librarian has not picked one yet.
pub fn default_renewal_date(today: NaiveDate) -> NaiveDate {
    today + Duration::weeks(DEFAULT_RENEWAL_WEEKS)
}

/// Expected return date of a copy that is not on loan: today or later, no upper bound.
pub fn validate_expected_back(candidate: NaiveDate, today: NaiveDate) -> Result<NaiveDate, RuleError> {
    if candidate < today {
        return Err(RuleError::InvalidDate {
            field: DateField::DueBack,
            reason: InvalidDateReason::PastDated,
        });
    }
    Ok(candidate)
}

fn validate_due_date(candidate: NaiveDate, today: NaiveDate, field: DateField) -> Result<NaiveDate, RuleError> {
    if candidate < today {
        return Err(RuleError::InvalidDate {
            field,
            reason: InvalidDateReason::PastDated,
        });
    }

    if candidate > today + Duration::weeks(MAX_RENEWAL_WEEKS) {
        return Err(RuleError::InvalidDate {
            field,
            reason: InvalidDateReason::TooFarAhead,
        });
    }

    Ok(candidate)
}

// ---------------------------------------------------------------------------
// Loan listings
// ---------------------------------------------------------------------------

/// Copies on loan to `borrower_id`, soonest due first.
///
/// The sort is stable, so copies sharing a due date keep their input order.
/// Copies without a due date come last.
pub fn select_active_loans_for_borrower<T>(instances: &[T], borrower_id: i64) -> Vec<T>
where
    T: AsRef<BookInstance> + Clone,
{
    let selected = instances
        .iter()
        .filter(|i| {
            let instance = i.as_ref();
            instance.status == LoanStatus::OnLoan && instance.borrower_id == Some(borrower_id)
        })
        .cloned()
        .collect();
    order_by_due_back(selected)
}

/// Every copy currently on loan, soonest due first.
pub fn select_all_active_loans<T>(instances: &[T]) -> Vec<T>
where
    T: AsRef<BookInstance> + Clone,
{
    let selected = instances
        .iter()
        .filter(|i| i.as_ref().status == LoanStatus::OnLoan)
        .cloned()
        .collect();
    order_by_due_back(selected)
}

fn order_by_due_back<T: AsRef<BookInstance>>(mut loans: Vec<T>) -> Vec<T> {
    // (false, date) sorts before (true, _): dated loans first.
    loans.sort_by_key(|l| {
        let due_back = l.as_ref().due_back;
        (due_back.is_none(), due_back)
    });
    loans
}

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

/// available -> on loan, assigning the borrower and a validated due date.
pub fn checkout(
    instance: &mut BookInstance,
    borrower_id: i64,
    due_back: NaiveDate,
    today: NaiveDate,
) -> Result<(), RuleError> {
    if instance.status != LoanStatus::Available {
        return Err(RuleError::InvalidTransition {
            from: instance.status,
            action: LoanAction::Checkout,
        });
    }
    let due_back = validate_due_date(due_back, today, DateField::DueBack)?;

    instance.status = LoanStatus::OnLoan;
    instance.borrower_id = Some(borrower_id);
    instance.due_back = Some(due_back);
    Ok(())
}

/// on loan -> on loan with a new due date.
pub fn renew(instance: &mut BookInstance, renewal_date: NaiveDate, today: NaiveDate) -> Result<(), RuleError> {
    if instance.status != LoanStatus::OnLoan {
        return Err(RuleError::InvalidTransition {
            from: instance.status,
            action: LoanAction::Renew,
        });
    }
    instance.due_back = Some(validate_renewal_date(renewal_date, today)?);
    Ok(())
}

/// on loan -> available, clearing the borrower and due date.
pub fn mark_returned(instance: &mut BookInstance) -> Result<(), RuleError> {
    if instance.status != LoanStatus::OnLoan {
        return Err(RuleError::InvalidTransition {
            from: instance.status,
            action: LoanAction::Return,
        });
    }
    instance.status = LoanStatus::Available;
    instance.borrower_id = None;
    instance.due_back = None;
    Ok(())
}

/// Librarian toggle among available, maintenance and reserved.
pub fn set_status(instance: &mut BookInstance, status: LoanStatus) -> Result<(), RuleError> {
    if instance.status == LoanStatus::OnLoan || status == LoanStatus::OnLoan {
        return Err(RuleError::InvalidTransition {
            from: instance.status,
            action: LoanAction::SetStatus,
        });
    }
    instance.status = status;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn copy(status: LoanStatus, borrower_id: Option<i64>, due_back: Option<NaiveDate>) -> BookInstance {
        BookInstance {
            id: Uuid::new_v4(),
            book_id: 1,
            imprint: "Unlikely Imprint, 2016".to_string(),
            due_back,
            status,
            borrower_id,
        }
    }

    #[test]
    fn test_author_future_death_rejected() {
        let err = validate_author_dates(None, Some(today() + Duration::days(1)), today()).unwrap_err();
        assert_eq!(
            err,
            RuleError::InvalidDate {
                field: DateField::DateOfDeath,
                reason: InvalidDateReason::FutureDated
            }
        );
        assert_eq!(err.to_string(), "Invalid date - date of death in the future");
    }

    #[test]
    fn test_author_future_birth_rejected() {
        for days in [1, 30, 3650] {
            let err = validate_author_dates(Some(today() + Duration::days(days)), None, today()).unwrap_err();
            assert_eq!(err.field(), Some(DateField::DateOfBirth));
            assert_eq!(err.to_string(), "Invalid date - date of birth in the future");
        }
    }

    #[test]
    fn test_author_future_death_checked_before_birth() {
        let err = validate_author_dates(
            Some(today() + Duration::days(2)),
            Some(today() + Duration::days(1)),
            today(),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some(DateField::DateOfDeath));
    }

    #[test]
    fn test_author_birth_after_death_rejected() {
        let err = validate_author_dates(Some(date(1963, 7, 3)), Some(date(1945, 6, 18)), today()).unwrap_err();
        assert_eq!(err, RuleError::InvalidDateOrder);
        assert_eq!(err.field(), None);
        assert_eq!(err.to_string(), "Invalid date - date of death before date of birth");
    }

    #[test]
    fn test_author_valid_pairs_returned_unchanged() {
        let cases = [
            (Some(date(1963, 7, 3)), Some(date(2009, 4, 13))),
            (Some(date(1920, 1, 1)), Some(date(1920, 1, 1))),
            (Some(today()), Some(today())),
            (Some(date(1990, 2, 2)), None),
            (None, Some(date(2000, 1, 1))),
            (None, None),
        ];
        for (dob, dod) in cases {
            assert_eq!(validate_author_dates(dob, dod, today()), Ok((dob, dod)));
        }
    }

    #[test]
    fn test_renewal_in_past_rejected() {
        let err = validate_renewal_date(today() - Duration::days(1), today()).unwrap_err();
        assert_eq!(
            err,
            RuleError::InvalidDate {
                field: DateField::RenewalDate,
                reason: InvalidDateReason::PastDated
            }
        );
        assert_eq!(err.to_string(), "Invalid date - renewal in past");
    }

    #[test]
    fn test_renewal_too_far_ahead_rejected() {
        let err = validate_renewal_date(today() + Duration::weeks(5), today()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid date - renewal more than 4 weeks ahead");
        assert_err!(validate_renewal_date(today() + Duration::days(29), today()));
    }

    #[test]
    fn test_renewal_bounds_are_inclusive() {
        assert_ok!(validate_renewal_date(today(), today()));
        assert_ok!(validate_renewal_date(today() + Duration::weeks(4), today()));
        assert_eq!(
            validate_renewal_date(today() + Duration::weeks(2), today()),
            Ok(today() + Duration::weeks(2))
        );
    }

    #[test]
    fn test_default_renewal_is_three_weeks() {
        assert_eq!(default_renewal_date(today()), date(2024, 6, 5));
        assert_ok!(validate_renewal_date(default_renewal_date(today()), today()));
    }

    fn thirty_copies() -> Vec<BookInstance> {
        (0..30)
            .map(|n| {
                let status = if n % 2 == 0 { LoanStatus::Maintenance } else { LoanStatus::OnLoan };
                let borrower = if n % 3 == 0 { 1 } else { 2 };
                copy(status, Some(borrower), Some(today() + Duration::days(n % 5)))
            })
            .collect()
    }

    #[test]
    fn test_select_for_borrower_filters_and_orders() {
        let copies = thirty_copies();
        let expected: Vec<_> = copies
            .iter()
            .filter(|c| c.status == LoanStatus::OnLoan && c.borrower_id == Some(1))
            .collect();

        let loans = select_active_loans_for_borrower(&copies, 1);
        assert_eq!(loans.len(), expected.len());
        assert_eq!(loans.len(), 5);
        assert!(loans
            .iter()
            .all(|l| l.status == LoanStatus::OnLoan && l.borrower_id == Some(1)));
        assert!(loans.windows(2).all(|w| w[0].due_back <= w[1].due_back));

        // Same input, same output
        assert_eq!(select_active_loans_for_borrower(&copies, 1), loans);
    }

    #[test]
    fn test_select_all_ignores_borrower() {
        let copies = thirty_copies();
        let loans = select_all_active_loans(&copies);
        assert_eq!(loans.len(), 15);
        assert!(loans.iter().all(|l| l.status == LoanStatus::OnLoan));
        assert!(loans.windows(2).all(|w| w[0].due_back <= w[1].due_back));
    }

    #[test]
    fn test_select_keeps_insertion_order_for_equal_dates() {
        let due = Some(today());
        let copies = vec![
            copy(LoanStatus::OnLoan, Some(1), Some(today() + Duration::days(3))),
            copy(LoanStatus::OnLoan, Some(1), due),
            copy(LoanStatus::OnLoan, Some(1), None),
            copy(LoanStatus::OnLoan, Some(1), due),
        ];
        let loans = select_active_loans_for_borrower(&copies, 1);
        let ids: Vec<_> = loans.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![copies[1].id, copies[3].id, copies[0].id, copies[2].id]);
    }

    #[test]
    fn test_select_with_no_loans_is_empty() {
        let copies: Vec<_> = thirty_copies()
            .into_iter()
            .map(|mut c| {
                c.status = LoanStatus::Maintenance;
                c
            })
            .collect();
        assert!(select_active_loans_for_borrower(&copies, 1).is_empty());
        assert!(select_all_active_loans(&copies).is_empty());
    }

    #[test]
    fn test_checkout_then_return() {
        let mut c = copy(LoanStatus::Available, None, None);
        assert_ok!(checkout(&mut c, 7, today() + Duration::weeks(3), today()));
        assert_eq!(c.status, LoanStatus::OnLoan);
        assert_eq!(c.borrower_id, Some(7));

        assert_ok!(mark_returned(&mut c));
        assert_eq!(c.status, LoanStatus::Available);
        assert_eq!(c.borrower_id, None);
        assert_eq!(c.due_back, None);
    }

    #[test]
    fn test_checkout_requires_available_copy() {
        let mut c = copy(LoanStatus::Maintenance, None, None);
        let err = checkout(&mut c, 7, today(), today()).unwrap_err();
        assert_eq!(
            err,
            RuleError::InvalidTransition {
                from: LoanStatus::Maintenance,
                action: LoanAction::Checkout
            }
        );
        assert_eq!(c.status, LoanStatus::Maintenance);
    }

    #[test]
    fn test_checkout_due_date_bounded() {
        let mut c = copy(LoanStatus::Available, None, None);
        let err = checkout(&mut c, 7, today() + Duration::weeks(6), today()).unwrap_err();
        assert_eq!(err.field(), Some(DateField::DueBack));
        assert_eq!(err.to_string(), "Invalid date - due back more than 4 weeks ahead");
        assert_eq!(c.status, LoanStatus::Available);
    }

    #[test]
    fn test_expected_back_not_in_past() {
        assert_ok!(validate_expected_back(today(), today()));
        assert_ok!(validate_expected_back(today() + Duration::weeks(10), today()));

        let err = validate_expected_back(today() - Duration::days(1), today()).unwrap_err();
        assert_eq!(err.field(), Some(DateField::DueBack));
        assert_eq!(err.to_string(), "Invalid date - due back in the past");
    }

    #[test]
    fn test_renew_updates_due_date_only_when_valid() {
        let original = Some(today() + Duration::days(5));
        let mut c = copy(LoanStatus::OnLoan, Some(1), original);

        assert_err!(renew(&mut c, today() - Duration::weeks(1), today()));
        assert_eq!(c.due_back, original);

        assert_ok!(renew(&mut c, today() + Duration::weeks(2), today()));
        assert_eq!(c.due_back, Some(today() + Duration::weeks(2)));
        assert_eq!(c.borrower_id, Some(1));
    }

    #[test]
    fn test_renew_and_return_require_loan() {
        let mut c = copy(LoanStatus::Available, None, None);
        assert_err!(renew(&mut c, today(), today()));
        assert_err!(mark_returned(&mut c));
    }

    #[test]
    fn test_set_status_cannot_touch_loans() {
        let mut c = copy(LoanStatus::Available, None, None);
        assert_ok!(set_status(&mut c, LoanStatus::Reserved));
        assert_ok!(set_status(&mut c, LoanStatus::Maintenance));
        assert_err!(set_status(&mut c, LoanStatus::OnLoan));

        let mut loaned = copy(LoanStatus::OnLoan, Some(1), Some(today()));
        assert_err!(set_status(&mut loaned, LoanStatus::Available));
        assert_eq!(loaned.status, LoanStatus::OnLoan);
    }
}
