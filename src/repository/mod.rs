//! Repository layer for database operations

pub mod authors;
pub mod books;
pub mod genres;
pub mod instances;
pub mod users;

use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Sqlite>,
    pub authors: authors::AuthorsRepository,
    pub books: books::BooksRepository,
    pub genres: genres::GenresRepository,
    pub instances: instances::InstancesRepository,
    pub users: users::UsersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            authors: authors::AuthorsRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            genres: genres::GenresRepository::new(pool.clone()),
            instances: instances::InstancesRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            pool,
        }
    }

    /// Open the pool and bring the schema up to date
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let mut options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections);

        // An in-memory database lives as long as its connection.
        if config.is_in_memory() {
            options = options.idle_timeout(None).max_lifetime(None);
        }

        let pool = options.connect(&config.url).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to run database migrations: {}", e)))?;

        Ok(Self::new(pool))
    }

    /// Round-trip to the database, for readiness checks
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Offset of the first row of a 1-based page; a page too far out to address is not found.
pub(crate) fn page_offset(page: i64, per_page: i64) -> AppResult<i64> {
    (page.max(1) - 1)
        .checked_mul(per_page)
        .ok_or_else(|| AppError::NotFound(format!("Page {} not found", page)))
}

/// `LIKE` pattern matching `word` literally anywhere; use with `ESCAPE '\'`.
pub(crate) fn contains_pattern(word: &str) -> String {
    let mut pattern = String::with_capacity(word.len() + 2);
    pattern.push('%');
    for c in word.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Map constraint violations to client errors; pass anything else through.
pub(crate) fn map_constraint_error(err: sqlx::Error, what: &str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return AppError::Conflict(format!("{} already exists", what));
        }
        if db_err.is_foreign_key_violation() {
            return AppError::BadRequest(format!("{} references a record that does not exist", what));
        }
    }
    AppError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("dune"), "%dune%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }

    #[test]
    fn test_page_offset_overflow_is_not_found() {
        assert_eq!(page_offset(1, 10).unwrap(), 0);
        assert_eq!(page_offset(3, 10).unwrap(), 20);
        assert!(matches!(page_offset(i64::MAX, 10), Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_on_loan_copy_keeps_its_borrower() {
        let repository = Repository::connect(&DatabaseConfig::in_memory()).await.unwrap();
        let pool = &repository.pool;
        sqlx::query("INSERT INTO users (id, login, password) VALUES (1, 'reader', 'x')")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO books (id, title, isbn) VALUES (1, 'Dune', '1')")
            .execute(pool)
            .await
            .unwrap();

        let unborrowed = sqlx::query(
            "INSERT INTO book_instances (id, book_id, imprint, status) VALUES (x'01', 1, 'Imprint', 'o')",
        )
        .execute(pool)
        .await;
        assert!(unborrowed.is_err());

        sqlx::query(
            "INSERT INTO book_instances (id, book_id, imprint, status, borrower_id) VALUES (x'02', 1, 'Imprint', 'o', 1)",
        )
        .execute(pool)
        .await
        .unwrap();
        let deleted = sqlx::query("DELETE FROM users WHERE id = 1").execute(pool).await;
        assert!(deleted.is_err());
    }
}
