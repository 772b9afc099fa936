//! Catalog service: books, authors and genres

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorDefaults, AuthorDetail, AuthorInput},
        book::{Book, BookDetail, BookInput, BookQuery, BookSummary},
        catalog::CatalogIndex,
        genre::Genre,
        instance::LoanStatus,
    },
    repository::Repository,
    rules,
};

use super::{page_number, Clock, Page};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    page_size: i64,
}

impl CatalogService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, page_size: i64) -> Self {
        Self {
            repository,
            clock,
            page_size,
        }
    }

    /// Counts for the catalog home page
    pub async fn index(&self, filter_word: &str) -> AppResult<CatalogIndex> {
        let instances = &self.repository.instances;
        Ok(CatalogIndex {
            num_books: self.repository.books.count().await?,
            num_instances: instances.count().await?,
            num_instances_available: instances.count_by_status(LoanStatus::Available).await?,
            num_authors: self.repository.authors.count().await?,
            num_genres: self.repository.genres.count().await?,
            filter_word: filter_word.to_string(),
            num_books_title_filtered: self.repository.books.count_title_contains(filter_word).await?,
        })
    }

    // Books

    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Page<BookSummary>> {
        let page = page_number(query.page)?;
        let (books, total) = self
            .repository
            .books
            .search(query.title.as_deref(), page, self.page_size)
            .await?;
        Page::checked(books, total, page, self.page_size)
    }

    /// Book with author, genres and every copy
    pub async fn get_book(&self, id: i64) -> AppResult<BookDetail> {
        let book = self.repository.books.get_by_id(id).await?;
        let author = match book.author_id {
            Some(author_id) => Some(self.repository.authors.get_by_id(author_id).await?),
            None => None,
        };
        let genres = self.repository.genres.for_book(id).await?;
        let instances = self.repository.instances.for_book(id).await?;

        Ok(BookDetail {
            book,
            author,
            genres,
            instances,
        })
    }

    pub async fn create_book(&self, input: &BookInput) -> AppResult<Book> {
        let book = self.repository.books.create(input).await?;
        tracing::info!(book_id = book.id, title = %book.title, "Book created");
        Ok(book)
    }

    pub async fn update_book(&self, id: i64, input: &BookInput) -> AppResult<Book> {
        let book = self.repository.books.update(id, input).await?;
        tracing::info!(book_id = id, "Book updated");
        Ok(book)
    }

    /// Delete a book and its copies; refused while a copy is on loan unless forced
    pub async fn delete_book(&self, id: i64, force: bool) -> AppResult<()> {
        self.repository.books.get_by_id(id).await?;

        if !force && self.repository.instances.any_on_loan_for_book(id).await? {
            return Err(AppError::BusinessRule(format!(
                "Book {} has copies on loan. Use force=true to delete anyway.",
                id
            )));
        }

        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, force, "Book deleted");
        Ok(())
    }

    // Authors

    pub async fn list_authors(&self, page: Option<i64>) -> AppResult<Page<Author>> {
        let page = page_number(page)?;
        let (authors, total) = self.repository.authors.list(page, self.page_size).await?;
        Page::checked(authors, total, page, self.page_size)
    }

    /// Author with the books they wrote
    pub async fn get_author(&self, id: i64) -> AppResult<AuthorDetail> {
        let author = self.repository.authors.get_by_id(id).await?;
        let books = self.repository.books.by_author(id).await?;
        Ok(AuthorDetail { author, books })
    }

    /// Initial values for a new author form
    pub fn author_defaults(&self) -> AuthorDefaults {
        AuthorDefaults {
            date_of_death: self.clock.today(),
        }
    }

    pub async fn create_author(&self, input: &AuthorInput) -> AppResult<Author> {
        rules::validate_author_dates(input.date_of_birth, input.date_of_death, self.clock.today())?;

        let author = self.repository.authors.create(input).await?;
        tracing::info!(author_id = author.id, name = %author, "Author created");
        Ok(author)
    }

    pub async fn update_author(&self, id: i64, input: &AuthorInput) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await?;
        rules::validate_author_dates(input.date_of_birth, input.date_of_death, self.clock.today())?;

        let author = self.repository.authors.update(id, input).await?;
        tracing::info!(author_id = id, "Author updated");
        Ok(author)
    }

    pub async fn delete_author(&self, id: i64) -> AppResult<()> {
        self.repository.authors.delete(id).await?;
        tracing::info!(author_id = id, "Author deleted");
        Ok(())
    }

    // Genres

    pub async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        self.repository.genres.list().await
    }

    pub async fn create_genre(&self, name: &str) -> AppResult<Genre> {
        let genre = self.repository.genres.create(name.trim()).await?;
        tracing::info!(genre_id = genre.id, name = %genre.name, "Genre created");
        Ok(genre)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DatabaseConfig, rules::RuleError, services::MockClock};
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    async fn service() -> CatalogService {
        let repository = Repository::connect(&DatabaseConfig::in_memory()).await.unwrap();
        let mut clock = MockClock::new();
        clock.expect_today().return_const(today());
        CatalogService::new(repository, Arc::new(clock), 10)
    }

    fn author(first: &str, last: &str) -> AuthorInput {
        AuthorInput {
            first_name: first.to_string(),
            last_name: last.to_string(),
            date_of_birth: None,
            date_of_death: None,
        }
    }

    fn book(title: &str, author_id: Option<i64>, genre_ids: Vec<i64>) -> BookInput {
        BookInput {
            title: title.to_string(),
            summary: None,
            isbn: "1234567890123".to_string(),
            author_id,
            genre_ids,
        }
    }

    #[tokio::test]
    async fn test_author_with_death_in_future_rejected() {
        let service = service().await;
        let mut input = author("Mary", "Shelley");
        input.date_of_death = today().succ_opt();

        let err = service.create_author(&input).await.unwrap_err();
        assert!(matches!(err, AppError::Rule(RuleError::InvalidDate { .. })));
        assert_eq!(service.repository.authors.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_author_birth_after_death_rejected_on_update() {
        let service = service().await;
        let created = service.create_author(&author("Mary", "Shelley")).await.unwrap();

        let mut input = author("Mary", "Shelley");
        input.date_of_birth = NaiveDate::from_ymd_opt(1851, 2, 1);
        input.date_of_death = NaiveDate::from_ymd_opt(1851, 1, 1);

        let err = service.update_author(created.id, &input).await.unwrap_err();
        assert!(matches!(err, AppError::Rule(RuleError::InvalidDateOrder)));
    }

    #[tokio::test]
    async fn test_author_defaults_use_clock() {
        let service = service().await;
        assert_eq!(service.author_defaults().date_of_death, today());
    }

    #[tokio::test]
    async fn test_book_detail_and_listing() {
        let service = service().await;
        let writer = service.create_author(&author("Ursula", "Le Guin")).await.unwrap();
        let fantasy = service.create_genre("Fantasy").await.unwrap();
        let scifi = service.create_genre("Science Fiction").await.unwrap();

        let created = service
            .create_book(&book("The Dispossessed", Some(writer.id), vec![scifi.id, fantasy.id]))
            .await
            .unwrap();
        assert_eq!(created.summary, crate::models::book::DEFAULT_SUMMARY);

        let detail = service.get_book(created.id).await.unwrap();
        assert_eq!(detail.author.as_ref().map(|a| a.display_name()), Some("Le Guin, Ursula".to_string()));
        assert_eq!(detail.genres.len(), 2);

        let page = service.list_books(&BookQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].genre_display, "Fantasy, Science Fiction");
        assert_eq!(page.items[0].author_name.as_deref(), Some("Le Guin, Ursula"));
    }

    #[tokio::test]
    async fn test_duplicate_genre_is_conflict() {
        let service = service().await;
        service.create_genre("Poetry").await.unwrap();
        let err = service.create_genre("Poetry").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_deleting_author_keeps_books() {
        let service = service().await;
        let writer = service.create_author(&author("Jane", "Austen")).await.unwrap();
        let created = service.create_book(&book("Emma", Some(writer.id), vec![])).await.unwrap();

        service.delete_author(writer.id).await.unwrap();

        let book = service.repository.books.get_by_id(created.id).await.unwrap();
        assert_eq!(book.author_id, None);
    }

    #[tokio::test]
    async fn test_page_past_end_not_found() {
        let service = service().await;
        for n in 0..11 {
            service
                .create_author(&author(&format!("First{}", n), &format!("Last{:02}", n)))
                .await
                .unwrap();
        }

        let second = service.list_authors(Some(2)).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].last_name, "Last10");
        assert!(matches!(service.list_authors(Some(3)).await, Err(AppError::NotFound(_))));
    }
}
