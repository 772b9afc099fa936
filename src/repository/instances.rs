//! Book instances (copies) repository for database operations

use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::instance::{BookInstance, LoanEntry, LoanStatus},
};

use super::map_constraint_error;

const ENTRY_COLUMNS: &str = r#"
    SELECT i.id, i.book_id, i.imprint, i.due_back, i.status, i.borrower_id,
           b.title AS book_title, u.login AS borrower_login
    FROM book_instances i
    JOIN books b ON b.id = i.book_id
    LEFT JOIN users u ON u.id = i.borrower_id
"#;

#[derive(Clone)]
pub struct InstancesRepository {
    pool: Pool<Sqlite>,
}

impl InstancesRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Get copy by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance> {
        sqlx::query_as::<_, BookInstance>(
            r#"
            SELECT id, book_id, imprint, due_back, status, borrower_id
            FROM book_instances WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    /// Get copy by ID with its book title and borrower login
    pub async fn get_entry(&self, id: Uuid) -> AppResult<LoanEntry> {
        let query = format!("{} WHERE i.id = $1", ENTRY_COLUMNS);
        sqlx::query_as::<_, LoanEntry>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    /// Every copy of a book, in insertion order
    pub async fn for_book(&self, book_id: i64) -> AppResult<Vec<BookInstance>> {
        let instances = sqlx::query_as::<_, BookInstance>(
            r#"
            SELECT id, book_id, imprint, due_back, status, borrower_id
            FROM book_instances WHERE book_id = $1
            ORDER BY rowid
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(instances)
    }

    /// Copies that may be part of a loan listing, in insertion order.
    ///
    /// With a borrower, only copies attributed to them; otherwise every copy on loan.
    /// Callers still apply the loan selection rules to the result.
    pub async fn loan_candidates(&self, borrower_id: Option<i64>) -> AppResult<Vec<LoanEntry>> {
        let entries = match borrower_id {
            Some(borrower_id) => {
                let query = format!("{} WHERE i.borrower_id = $1 ORDER BY i.rowid", ENTRY_COLUMNS);
                sqlx::query_as::<_, LoanEntry>(&query)
                    .bind(borrower_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!("{} WHERE i.status = $1 ORDER BY i.rowid", ENTRY_COLUMNS);
                sqlx::query_as::<_, LoanEntry>(&query)
                    .bind(LoanStatus::OnLoan)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(entries)
    }

    pub async fn insert(&self, instance: &BookInstance) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO book_instances (id, book_id, imprint, due_back, status, borrower_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(instance.id)
        .bind(instance.book_id)
        .bind(&instance.imprint)
        .bind(instance.due_back)
        .bind(instance.status)
        .bind(instance.borrower_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, "Book instance"))?;
        Ok(())
    }

    /// Persist `next` only if the stored loan fields still match `previous`.
    ///
    /// A concurrent change between read and write yields `Conflict` and nothing is written.
    pub async fn save(&self, previous: &BookInstance, next: &BookInstance) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE book_instances
            SET imprint = $1, due_back = $2, status = $3, borrower_id = $4
            WHERE id = $5 AND status IS $6 AND due_back IS $7 AND borrower_id IS $8
            "#,
        )
        .bind(&next.imprint)
        .bind(next.due_back)
        .bind(next.status)
        .bind(next.borrower_id)
        .bind(previous.id)
        .bind(previous.status)
        .bind(previous.due_back)
        .bind(previous.borrower_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, "Book instance"))?;

        if result.rows_affected() == 0 {
            // Distinguish a vanished copy from a lost race
            self.get_by_id(previous.id).await?;
            return Err(AppError::Conflict(format!(
                "Book instance {} was modified concurrently",
                previous.id
            )));
        }
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM book_instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book instance {} not found", id)));
        }
        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Whether any copy of the book is currently on loan
    pub async fn any_on_loan_for_book(&self, book_id: i64) -> AppResult<bool> {
        let on_loan: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM book_instances WHERE book_id = $1 AND status = $2)",
        )
        .bind(book_id)
        .bind(LoanStatus::OnLoan)
        .fetch_one(&self.pool)
        .await?;
        Ok(on_loan)
    }
}
