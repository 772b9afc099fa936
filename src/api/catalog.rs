//! Catalog home page

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::catalog::{CatalogIndex, IndexQuery},
    AppState,
};

/// Record counts for the catalog home page
#[utoipa::path(
    get,
    path = "/catalog",
    tag = "catalog",
    params(IndexQuery),
    responses(
        (status = 200, description = "Catalog counts", body = CatalogIndex)
    )
)]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> AppResult<Json<CatalogIndex>> {
    let filter_word = query.filter_word.unwrap_or_default();
    let index = state.services.catalog.index(&filter_word).await?;
    Ok(Json(index))
}
