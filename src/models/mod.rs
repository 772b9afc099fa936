//! Data models for the local library catalog

pub mod author;
pub mod book;
pub mod catalog;
pub mod genre;
pub mod instance;
pub mod user;

// Re-export commonly used types
pub use author::{Author, AuthorDetail};
pub use book::{Book, BookDetail, BookSummary};
pub use catalog::CatalogIndex;
pub use genre::Genre;
pub use instance::{BookInstance, LoanEntry, LoanStatus};
pub use user::{Permission, User, UserClaims};
