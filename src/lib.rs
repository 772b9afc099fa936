//! LocalLibrary server
//!
//! A REST JSON API for a small lending library: the catalog of books, authors
//! and genres, the physical copies of each book, and the loans librarians
//! record against them.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod rules;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use repository::Repository;
use services::{Clock, Services};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<Services>,
    pub repository: Repository,
}

impl AppState {
    /// Wire services over `repository` using `clock` for the date rules
    pub fn new(config: AppConfig, repository: Repository, clock: Arc<dyn Clock>) -> Self {
        let services = Services::new(
            repository.clone(),
            config.auth.clone(),
            config.catalog.clone(),
            clock,
        );
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
            repository,
        }
    }
}
