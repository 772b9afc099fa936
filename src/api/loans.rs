//! Loan management endpoints: listings, checkout, renewal, return

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        instance::{CheckoutRequest, LoanEntry, LoanQuery, RenewForm, RenewRequest, UpdateStatus},
        user::Permission,
    },
    AppState,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// Copies on loan to the current user
#[utoipa::path(
    get,
    path = "/catalog/mybooks",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "Current user's loans, soonest due first", body = PaginatedResponse<LoanEntry>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanEntry>>> {
    let page = state.services.loans.my_loans(claims.user_id, query.page).await?;
    Ok(Json(page.into()))
}

/// Every copy on loan
#[utoipa::path(
    get,
    path = "/catalog/borrowed",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "All loans, soonest due first", body = PaginatedResponse<LoanEntry>),
        (status = 403, description = "Missing can_mark_returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrowed(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanEntry>>> {
    claims.require(Permission::CanMarkReturned)?;

    let page = state.services.loans.all_loans(query.page).await?;
    Ok(Json(page.into()))
}

/// Librarian view of a copy
#[utoipa::path(
    get,
    path = "/catalog/instances/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy details", body = LoanEntry),
        (status = 404, description = "Copy not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_instance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LoanEntry>> {
    claims.require(Permission::CanMarkReturned)?;

    let instance = state.services.loans.get_instance(id).await?;
    Ok(Json(instance))
}

/// Copy and the proposed renewal date
#[utoipa::path(
    get,
    path = "/catalog/instances/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Renewal form", body = RenewForm),
        (status = 404, description = "Copy not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn renew_form(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RenewForm>> {
    claims.require(Permission::CanRenew)?;

    let form = state.services.loans.renew_form(id).await?;
    Ok(Json(form))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/catalog/instances/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    request_body = RenewRequest,
    responses(
        (status = 200, description = "Loan renewed", body = LoanEntry),
        (status = 400, description = "Renewal date out of range", body = crate::error::ErrorResponse),
        (status = 404, description = "Copy not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Copy not on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn renew(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RenewRequest>,
) -> AppResult<Json<LoanEntry>> {
    claims.require(Permission::CanRenew)?;

    let instance = state.services.loans.renew(id, request.renewal_date).await?;
    Ok(Json(instance))
}

/// Mark a copy as returned
#[utoipa::path(
    post,
    path = "/catalog/instances/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy returned", body = LoanEntry),
        (status = 404, description = "Copy not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Copy not on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_returned(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LoanEntry>> {
    claims.require(Permission::CanMarkReturned)?;

    let instance = state.services.loans.mark_returned(id).await?;
    Ok(Json(instance))
}

/// Lend a copy
#[utoipa::path(
    post,
    path = "/catalog/instances/{id}/checkout",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Copy checked out", body = LoanEntry),
        (status = 400, description = "Invalid due date or borrower", body = crate::error::ErrorResponse),
        (status = 409, description = "Copy not available", body = crate::error::ErrorResponse)
    )
)]
pub async fn checkout(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<Json<LoanEntry>> {
    claims.require(Permission::CanMarkReturned)?;

    let instance = state
        .services
        .loans
        .checkout(id, request.borrower_id, request.due_back)
        .await?;
    Ok(Json(instance))
}

/// Put a copy in maintenance, reserve it, or make it available
#[utoipa::path(
    put,
    path = "/catalog/instances/{id}/status",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    request_body = UpdateStatus,
    responses(
        (status = 200, description = "Status changed", body = LoanEntry),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn set_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatus>,
) -> AppResult<Json<LoanEntry>> {
    claims.require(Permission::CanModifyBook)?;

    let instance = state.services.loans.set_status(id, request.status).await?;
    Ok(Json(instance))
}

/// Delete a copy
#[utoipa::path(
    delete,
    path = "/catalog/instances/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 404, description = "Copy not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Copy on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_instance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    claims.require(Permission::CanModifyBook)?;

    state.services.loans.delete_instance(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
