//! Books repository for database operations

use sqlx::{Pool, Sqlite, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::book::{genre_display, Book, BookInput, BookSummary, DEFAULT_SUMMARY},
};

use super::{contains_pattern, map_constraint_error, page_offset};

const SUMMARY_COLUMNS: &str = r#"
    SELECT b.id, b.title, b.author_id,
           CASE WHEN a.id IS NULL THEN NULL ELSE a.last_name || ', ' || a.first_name END AS author_name
    FROM books b
    LEFT JOIN authors a ON a.id = b.author_id
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Sqlite>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            "SELECT id, title, summary, isbn, author_id FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Search books by title fragment (case-insensitive), ordered by title
    pub async fn search(
        &self,
        title: Option<&str>,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<BookSummary>, i64)> {
        let pattern = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(contains_pattern);

        let query = format!(
            r"{} WHERE ($1 IS NULL OR b.title LIKE $1 ESCAPE '\') ORDER BY b.title, b.id LIMIT $2 OFFSET $3",
            SUMMARY_COLUMNS
        );
        let mut books = sqlx::query_as::<_, BookSummary>(&query)
            .bind(pattern.as_deref())
            .bind(per_page)
            .bind(page_offset(page, per_page)?)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            r"SELECT COUNT(*) FROM books WHERE ($1 IS NULL OR title LIKE $1 ESCAPE '\')",
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        self.fill_genre_display(&mut books).await?;
        Ok((books, total))
    }

    /// Books written by an author, ordered by title
    pub async fn by_author(&self, author_id: i64) -> AppResult<Vec<BookSummary>> {
        let query = format!("{} WHERE b.author_id = $1 ORDER BY b.title, b.id", SUMMARY_COLUMNS);
        let mut books = sqlx::query_as::<_, BookSummary>(&query)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;

        self.fill_genre_display(&mut books).await?;
        Ok(books)
    }

    async fn fill_genre_display(&self, books: &mut [BookSummary]) -> AppResult<()> {
        for book in books.iter_mut() {
            let names: Vec<String> = sqlx::query_scalar(
                r#"
                SELECT g.name FROM book_genres bg
                JOIN genres g ON g.id = bg.genre_id
                WHERE bg.book_id = $1
                ORDER BY g.name
                "#,
            )
            .bind(book.id)
            .fetch_all(&self.pool)
            .await?;
            book.genre_display = genre_display(&names);
        }
        Ok(())
    }

    /// Create a book together with its genre links
    pub async fn create(&self, book: &BookInput) -> AppResult<Book> {
        let summary = book.summary.as_deref().unwrap_or(DEFAULT_SUMMARY);
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            "INSERT INTO books (title, summary, isbn, author_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(&book.title)
        .bind(summary)
        .bind(&book.isbn)
        .bind(book.author_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_constraint_error(e, "Book"))?
        .last_insert_rowid();

        link_genres(&mut tx, id, &book.genre_ids).await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Replace a book's fields and genre links
    pub async fn update(&self, id: i64, book: &BookInput) -> AppResult<Book> {
        let summary = book.summary.as_deref().unwrap_or(DEFAULT_SUMMARY);
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE books SET title = $1, summary = $2, isbn = $3, author_id = $4 WHERE id = $5",
        )
        .bind(&book.title)
        .bind(summary)
        .bind(&book.isbn)
        .bind(book.author_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_constraint_error(e, "Book"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_genres(&mut tx, id, &book.genre_ids).await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Delete a book; its copies and genre links go with it
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Books whose title contains `word`, ignoring case
    pub async fn count_title_contains(&self, word: &str) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar(r"SELECT COUNT(*) FROM books WHERE title LIKE $1 ESCAPE '\'")
                .bind(contains_pattern(word))
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

async fn link_genres(
    tx: &mut Transaction<'_, Sqlite>,
    book_id: i64,
    genre_ids: &[i64],
) -> AppResult<()> {
    for genre_id in genre_ids {
        sqlx::query("INSERT OR IGNORE INTO book_genres (book_id, genre_id) VALUES ($1, $2)")
            .bind(book_id)
            .bind(genre_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_constraint_error(e, &format!("Genre {}", genre_id)))?;
    }
    Ok(())
}
