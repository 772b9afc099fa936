//! Book (title record) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{author::Author, genre::Genre, instance::BookInstance};

/// Summary used when a book is created without one
pub const DEFAULT_SUMMARY: &str = "Please write a blurb here...";

/// Number of genres shown in `genre_display`
const GENRE_DISPLAY_LIMIT: usize = 3;

/// Full book model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub summary: String,
    /// 13 character ISBN
    pub isbn: String,
    pub author_id: Option<i64>,
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Short book representation for lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub author_id: Option<i64>,
    /// "last, first" of the author, if any
    pub author_name: Option<String>,
    /// First few genre names, comma separated
    #[sqlx(default)]
    pub genre_display: String,
}

/// Book with its author, genres and every copy
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub author: Option<Author>,
    pub genres: Vec<Genre>,
    pub instances: Vec<BookInstance>,
}

/// Create or replace a book
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[validate(length(max = 1000, message = "Summary must be at most 1000 characters"))]
    pub summary: Option<String>,
    #[validate(length(min = 1, max = 13, message = "ISBN must be 1 to 13 characters"))]
    pub isbn: String,
    pub author_id: Option<i64>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
}

/// Book list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive title filter
    pub title: Option<String>,
    pub page: Option<i64>,
}

/// Delete options
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteBookParams {
    /// Delete even when copies are on loan
    pub force: Option<bool>,
}

/// Comma-separated names of the first genres, as shown in listings.
pub fn genre_display<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .take(GENRE_DISPLAY_LIMIT)
        .map(|n| n.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_display_takes_first_three() {
        assert_eq!(genre_display::<&str>(&[]), "");
        assert_eq!(genre_display(&["Fantasy"]), "Fantasy");
        assert_eq!(
            genre_display(&["Fantasy", "Thriller", "Adventure", "Poetry"]),
            "Fantasy, Thriller, Adventure"
        );
    }

    #[test]
    fn test_book_display_is_title() {
        let book = Book {
            id: 1,
            title: "A Short History of Everything".to_string(),
            summary: "A very cool book!".to_string(),
            isbn: "1234567891011".to_string(),
            author_id: None,
        };
        assert_eq!(book.to_string(), "A Short History of Everything");
    }

    #[test]
    fn test_isbn_longer_than_thirteen_rejected() {
        let input = BookInput {
            title: "Book Title".to_string(),
            summary: None,
            isbn: "12345678901234".to_string(),
            author_id: None,
            genre_ids: vec![],
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("isbn"));
    }
}
