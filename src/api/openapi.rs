//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, authors, books, catalog, genres, health, loans, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LocalLibrary API",
        version = "1.0.0",
        description = "Local library catalog and loans REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Users
        users::create_user,
        users::get_user,
        users::update_permissions,
        // Catalog
        catalog::index,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::create_instance,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::author_defaults,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Genres
        genres::list_genres,
        genres::create_genre,
        // Loans
        loans::my_books,
        loans::borrowed,
        loans::get_instance,
        loans::renew_form,
        loans::renew,
        loans::mark_returned,
        loans::checkout,
        loans::set_status,
        loans::delete_instance,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Users
            crate::models::user::User,
            crate::models::user::Permission,
            crate::models::user::CreateUser,
            crate::models::user::UpdatePermissions,
            // Catalog
            crate::models::catalog::CatalogIndex,
            crate::models::book::Book,
            crate::models::book::BookSummary,
            crate::models::book::BookDetail,
            crate::models::book::BookInput,
            crate::models::author::Author,
            crate::models::author::AuthorDetail,
            crate::models::author::AuthorInput,
            crate::models::author::AuthorDefaults,
            crate::models::genre::Genre,
            crate::models::genre::CreateGenre,
            // Loans
            crate::models::instance::BookInstance,
            crate::models::instance::LoanStatus,
            crate::models::instance::LoanEntry,
            crate::models::instance::CreateInstance,
            crate::models::instance::RenewRequest,
            crate::models::instance::RenewForm,
            crate::models::instance::CheckoutRequest,
            crate::models::instance::UpdateStatus,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "User management"),
        (name = "catalog", description = "Catalog overview"),
        (name = "books", description = "Books and their copies"),
        (name = "authors", description = "Authors"),
        (name = "genres", description = "Genres"),
        (name = "loans", description = "Loans, renewals and returns")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by secured paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_catalog_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/catalog/books"));
        assert!(doc.paths.paths.contains_key("/catalog/instances/{id}/renew"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
