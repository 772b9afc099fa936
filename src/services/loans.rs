//! Loan management service: copies, checkouts, renewals and returns

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::instance::{BookInstance, CreateInstance, LoanEntry, LoanStatus, RenewForm},
    repository::Repository,
    rules,
};

use super::{page_number, Clock, Page};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    page_size: i64,
}

impl LoansService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, page_size: i64) -> Self {
        Self {
            repository,
            clock,
            page_size,
        }
    }

    /// Copies on loan to a user, soonest due first
    pub async fn my_loans(&self, borrower_id: i64, page: Option<i64>) -> AppResult<Page<LoanEntry>> {
        let page = page_number(page)?;
        let candidates = self.repository.instances.loan_candidates(Some(borrower_id)).await?;
        let loans = rules::select_active_loans_for_borrower(&candidates, borrower_id);
        Page::slice(self.with_overdue(loans), page, self.page_size)
    }

    /// Every copy on loan, soonest due first
    pub async fn all_loans(&self, page: Option<i64>) -> AppResult<Page<LoanEntry>> {
        let page = page_number(page)?;
        let candidates = self.repository.instances.loan_candidates(None).await?;
        let loans = rules::select_all_active_loans(&candidates);
        Page::slice(self.with_overdue(loans), page, self.page_size)
    }

    pub async fn get_instance(&self, id: Uuid) -> AppResult<LoanEntry> {
        let entry = self.repository.instances.get_entry(id).await?;
        Ok(self.mark_overdue(entry))
    }

    /// The copy and the renewal date offered by default
    pub async fn renew_form(&self, id: Uuid) -> AppResult<RenewForm> {
        let instance = self.get_instance(id).await?;
        Ok(RenewForm {
            instance,
            proposed_renewal_date: rules::default_renewal_date(self.clock.today()),
        })
    }

    /// Move the due date of a copy on loan
    pub async fn renew(&self, id: Uuid, renewal_date: NaiveDate) -> AppResult<LoanEntry> {
        let today = self.clock.today();
        let previous = self.repository.instances.get_by_id(id).await?;
        let mut next = previous.clone();

        if let Err(e) = rules::renew(&mut next, renewal_date, today) {
            tracing::warn!(instance_id = %id, %renewal_date, error = %e, "Renewal rejected");
            return Err(e.into());
        }
        self.repository.instances.save(&previous, &next).await?;

        tracing::info!(
            instance_id = %id,
            borrower_id = ?next.borrower_id,
            %renewal_date,
            "Loan renewed"
        );
        self.get_instance(id).await
    }

    /// Lend an available copy
    pub async fn checkout(
        &self,
        id: Uuid,
        borrower_id: i64,
        due_back: Option<NaiveDate>,
    ) -> AppResult<LoanEntry> {
        let today = self.clock.today();
        self.ensure_borrower_exists(borrower_id).await?;

        let previous = self.repository.instances.get_by_id(id).await?;
        let mut next = previous.clone();
        let due_back = due_back.unwrap_or_else(|| rules::default_renewal_date(today));
        rules::checkout(&mut next, borrower_id, due_back, today)?;
        self.repository.instances.save(&previous, &next).await?;

        tracing::info!(instance_id = %id, borrower_id, %due_back, "Copy checked out");
        self.get_instance(id).await
    }

    pub async fn mark_returned(&self, id: Uuid) -> AppResult<LoanEntry> {
        let previous = self.repository.instances.get_by_id(id).await?;
        let mut next = previous.clone();
        rules::mark_returned(&mut next)?;
        self.repository.instances.save(&previous, &next).await?;

        tracing::info!(instance_id = %id, borrower_id = ?previous.borrower_id, "Copy returned");
        self.get_instance(id).await
    }

    /// Toggle a copy among available, maintenance and reserved
    pub async fn set_status(&self, id: Uuid, status: LoanStatus) -> AppResult<LoanEntry> {
        let previous = self.repository.instances.get_by_id(id).await?;
        let mut next = previous.clone();
        rules::set_status(&mut next, status)?;
        self.repository.instances.save(&previous, &next).await?;

        tracing::info!(instance_id = %id, from = %previous.status, to = %status, "Copy status changed");
        self.get_instance(id).await
    }

    /// Add a copy of a book. A copy created on loan goes through the checkout rule.
    pub async fn create_instance(&self, book_id: i64, input: &CreateInstance) -> AppResult<LoanEntry> {
        let today = self.clock.today();
        self.repository.books.get_by_id(book_id).await?;

        let mut instance = BookInstance::new(book_id, input.imprint.trim());
        match input.status.unwrap_or_default() {
            LoanStatus::OnLoan => {
                let borrower_id = input.borrower_id.ok_or_else(|| {
                    AppError::BadRequest("A copy on loan needs a borrower".to_string())
                })?;
                self.ensure_borrower_exists(borrower_id).await?;
                let due_back = input
                    .due_back
                    .unwrap_or_else(|| rules::default_renewal_date(today));
                rules::checkout(&mut instance, borrower_id, due_back, today)?;
            }
            status => {
                if input.borrower_id.is_some() {
                    return Err(AppError::BadRequest(
                        "Only a copy on loan can have a borrower".to_string(),
                    ));
                }
                rules::set_status(&mut instance, status)?;
                instance.due_back = input
                    .due_back
                    .map(|due_back| rules::validate_expected_back(due_back, today))
                    .transpose()?;
            }
        }

        self.repository.instances.insert(&instance).await?;
        tracing::info!(instance_id = %instance.id, book_id, status = %instance.status, "Copy created");
        self.get_instance(instance.id).await
    }

    /// Remove a copy that is not on loan
    pub async fn delete_instance(&self, id: Uuid) -> AppResult<()> {
        let instance = self.repository.instances.get_by_id(id).await?;
        if instance.status == LoanStatus::OnLoan {
            return Err(AppError::BusinessRule(format!(
                "Book instance {} is on loan and cannot be deleted",
                id
            )));
        }

        self.repository.instances.delete(id).await?;
        tracing::info!(instance_id = %id, "Copy deleted");
        Ok(())
    }

    async fn ensure_borrower_exists(&self, borrower_id: i64) -> AppResult<()> {
        match self.repository.users.get_by_id(borrower_id).await {
            Ok(_) => Ok(()),
            Err(AppError::NotFound(_)) => Err(AppError::BadRequest(format!(
                "Borrower {} does not exist",
                borrower_id
            ))),
            Err(e) => Err(e),
        }
    }

    fn with_overdue(&self, loans: Vec<LoanEntry>) -> Vec<LoanEntry> {
        loans.into_iter().map(|l| self.mark_overdue(l)).collect()
    }

    fn mark_overdue(&self, mut entry: LoanEntry) -> LoanEntry {
        entry.is_overdue = entry.instance.is_overdue(self.clock.today());
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::DatabaseConfig,
        models::book::BookInput,
        repository::users::NewUser,
        rules::{InvalidDateReason, RuleError},
        services::MockClock,
    };
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    struct Fixture {
        service: LoansService,
        book_id: i64,
        reader_id: i64,
    }

    async fn fixture() -> Fixture {
        let repository = Repository::connect(&DatabaseConfig::in_memory()).await.unwrap();
        let book = repository
            .books
            .create(&BookInput {
                title: "Book Title".to_string(),
                summary: Some("My book summary".to_string()),
                isbn: "ABCDEFG".to_string(),
                author_id: None,
                genre_ids: vec![],
            })
            .await
            .unwrap();
        let reader = repository
            .users
            .create(NewUser {
                login: "testuser1",
                password_hash: "not-a-real-hash",
                first_name: "",
                last_name: "",
                is_admin: false,
                permissions: &[],
            })
            .await
            .unwrap();

        let mut clock = MockClock::new();
        clock.expect_today().return_const(today());

        Fixture {
            service: LoansService::new(repository, Arc::new(clock), 10),
            book_id: book.id,
            reader_id: reader.id,
        }
    }

    fn copy(imprint: &str) -> CreateInstance {
        CreateInstance {
            imprint: imprint.to_string(),
            status: None,
            borrower_id: None,
            due_back: None,
        }
    }

    #[tokio::test]
    async fn test_checkout_defaults_due_date_to_three_weeks() {
        let f = fixture().await;
        let created = f.service.create_instance(f.book_id, &copy("Imprint")).await.unwrap();
        assert_eq!(created.instance.status, LoanStatus::Available);

        let entry = f.service.checkout(created.instance.id, f.reader_id, None).await.unwrap();
        assert_eq!(entry.instance.status, LoanStatus::OnLoan);
        assert_eq!(entry.instance.due_back, Some(today() + Duration::weeks(3)));
        assert_eq!(entry.borrower_login.as_deref(), Some("testuser1"));
    }

    #[tokio::test]
    async fn test_renewal_in_past_leaves_copy_untouched() {
        let f = fixture().await;
        let created = f.service.create_instance(f.book_id, &copy("Imprint")).await.unwrap();
        let id = created.instance.id;
        let loaned = f.service.checkout(id, f.reader_id, None).await.unwrap();

        let err = f.service.renew(id, today() - Duration::weeks(1)).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Rule(RuleError::InvalidDate {
                reason: InvalidDateReason::PastDated,
                ..
            })
        ));

        let unchanged = f.service.get_instance(id).await.unwrap();
        assert_eq!(unchanged.instance.due_back, loaned.instance.due_back);
    }

    #[tokio::test]
    async fn test_renewal_within_bounds_is_saved() {
        let f = fixture().await;
        let created = f.service.create_instance(f.book_id, &copy("Imprint")).await.unwrap();
        let id = created.instance.id;
        f.service.checkout(id, f.reader_id, None).await.unwrap();

        let limit = today() + Duration::weeks(4);
        let renewed = f.service.renew(id, limit).await.unwrap();
        assert_eq!(renewed.instance.due_back, Some(limit));
    }

    #[tokio::test]
    async fn test_return_clears_loan() {
        let f = fixture().await;
        let created = f.service.create_instance(f.book_id, &copy("Imprint")).await.unwrap();
        let id = created.instance.id;
        f.service.checkout(id, f.reader_id, None).await.unwrap();

        let returned = f.service.mark_returned(id).await.unwrap();
        assert_eq!(returned.instance.status, LoanStatus::Available);
        assert_eq!(returned.instance.borrower_id, None);
        assert_eq!(returned.instance.due_back, None);

        assert!(matches!(
            f.service.mark_returned(id).await,
            Err(AppError::Rule(RuleError::InvalidTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn test_my_loans_sorted_and_flagged_overdue() {
        let f = fixture().await;
        let on_loan = |imprint: &str, days: i64| CreateInstance {
            status: Some(LoanStatus::OnLoan),
            borrower_id: Some(f.reader_id),
            due_back: Some(today() + Duration::days(days)),
            ..copy(imprint)
        };
        let later = on_loan("Later", 10);
        let sooner = on_loan("Sooner", 0);
        f.service.create_instance(f.book_id, &later).await.unwrap();
        f.service.create_instance(f.book_id, &sooner).await.unwrap();
        f.service.create_instance(f.book_id, &copy("Shelf")).await.unwrap();

        let page = f.service.my_loans(f.reader_id, None).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].instance.due_back, Some(today()));
        assert_eq!(page.items[1].instance.imprint, "Later");
        assert!(page.items.iter().all(|l| !l.is_overdue));

        let all = f.service.all_loans(None).await.unwrap();
        assert_eq!(all.total, 2);
        assert!(f.service.my_loans(f.reader_id + 1, None).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_copy_on_loan_needs_borrower() {
        let f = fixture().await;
        let input = CreateInstance {
            status: Some(LoanStatus::OnLoan),
            ..copy("Imprint")
        };
        assert!(matches!(
            f.service.create_instance(f.book_id, &input).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_copy_on_loan_cannot_be_deleted() {
        let f = fixture().await;
        let created = f.service.create_instance(f.book_id, &copy("Imprint")).await.unwrap();
        let id = created.instance.id;
        f.service.checkout(id, f.reader_id, None).await.unwrap();

        assert!(matches!(
            f.service.delete_instance(id).await,
            Err(AppError::BusinessRule(_))
        ));

        f.service.mark_returned(id).await.unwrap();
        f.service.delete_instance(id).await.unwrap();
        assert!(matches!(f.service.get_instance(id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stale_save_is_conflict() {
        let f = fixture().await;
        let created = f.service.create_instance(f.book_id, &copy("Imprint")).await.unwrap();
        let previous = created.instance.clone();

        f.service.set_status(previous.id, LoanStatus::Maintenance).await.unwrap();

        let mut next = previous.clone();
        rules::set_status(&mut next, LoanStatus::Reserved).unwrap();
        let err = f.service.repository.instances.save(&previous, &next).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
