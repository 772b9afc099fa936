//! Business logic services

pub mod catalog;
pub mod loans;
pub mod users;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::{
    config::{AuthConfig, CatalogConfig},
    error::{AppError, AppResult},
    repository::{page_offset, Repository},
};

/// Source of the current civil date for the date rules
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// UTC calendar date of the host clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock pinned to one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub users: users::UsersService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        catalog_config: CatalogConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let page_size = catalog_config.page_size.max(1);
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), clock.clone(), page_size),
            loans: loans::LoansService::new(repository.clone(), clock, page_size),
            users: users::UsersService::new(repository, auth_config),
        }
    }
}

/// One page of results plus the total across all pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> Page<T> {
    /// Wrap a page fetched from the database; an empty page past the first is not found.
    pub(crate) fn checked(items: Vec<T>, total: i64, page: i64, per_page: i64) -> AppResult<Self> {
        if page > 1 && items.is_empty() {
            return Err(AppError::NotFound(format!("Page {} not found", page)));
        }
        Ok(Self {
            items,
            total,
            page,
            per_page,
        })
    }

    /// Cut one page out of an already ordered list
    pub(crate) fn slice(all: Vec<T>, page: i64, per_page: i64) -> AppResult<Self> {
        let total = all.len() as i64;
        let start = usize::try_from(page_offset(page, per_page)?)
            .map_err(|_| AppError::NotFound(format!("Page {} not found", page)))?;
        let items: Vec<T> = all.into_iter().skip(start).take(per_page as usize).collect();
        Self::checked(items, total, page, per_page)
    }
}

/// Normalize an optional 1-based page number
pub(crate) fn page_number(page: Option<i64>) -> AppResult<i64> {
    match page {
        None => Ok(1),
        Some(p) if p >= 1 => Ok(p),
        Some(p) => Err(AppError::BadRequest(format!("Invalid page number {}", p))),
    }
}
