//! API handlers for the local library REST endpoints

pub mod auth;
pub mod authors;
pub mod books;
pub mod catalog;
pub mod genres;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{error::AppError, models::user::UserClaims, services::Page, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Get the Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Entries of the requested page
    pub items: Vec<T>,
    /// Total number of entries across all pages
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Entries per page
    pub per_page: i64,
}

impl<T> From<Page<T>> for PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    fn from(page: Page<T>) -> Self {
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            per_page: page.per_page,
        }
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Users
        .route("/users", post(users::create_user))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/permissions", put(users::update_permissions))
        // Catalog
        .route("/catalog", get(catalog::index))
        .route("/catalog/books", get(books::list_books).post(books::create_book))
        .route(
            "/catalog/books/:id",
            get(books::get_book).put(books::update_book).delete(books::delete_book),
        )
        .route("/catalog/books/:id/instances", post(books::create_instance))
        .route("/catalog/authors", get(authors::list_authors).post(authors::create_author))
        .route("/catalog/authors/new", get(authors::author_defaults))
        .route(
            "/catalog/authors/:id",
            get(authors::get_author)
                .put(authors::update_author)
                .delete(authors::delete_author),
        )
        .route("/catalog/genres", get(genres::list_genres).post(genres::create_genre))
        // Loans
        .route("/catalog/mybooks", get(loans::my_books))
        .route("/catalog/borrowed", get(loans::borrowed))
        .route(
            "/catalog/instances/:id",
            get(loans::get_instance).delete(loans::delete_instance),
        )
        .route(
            "/catalog/instances/:id/renew",
            get(loans::renew_form).post(loans::renew),
        )
        .route("/catalog/instances/:id/return", post(loans::mark_returned))
        .route("/catalog/instances/:id/checkout", post(loans::checkout))
        .route("/catalog/instances/:id/status", put(loans::set_status))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
