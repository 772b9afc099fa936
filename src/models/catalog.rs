//! Catalog index counts

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Record counts shown on the catalog home page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CatalogIndex {
    pub num_books: i64,
    pub num_instances: i64,
    pub num_instances_available: i64,
    pub num_authors: i64,
    pub num_genres: i64,
    pub filter_word: String,
    /// Books whose title contains `filter_word`, ignoring case
    pub num_books_title_filtered: i64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IndexQuery {
    pub filter_word: Option<String>,
}
