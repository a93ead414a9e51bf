//! Back-office endpoints (administrators only)

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        penalty::{CreatePenalty, Penalty, PenaltyQuery, WaivePenalty},
        transaction::{TransactionAction, TransactionDetails, TransactionQuery},
        user::{UpdateUserStatus, User},
    },
    services::{export::ExportResource, items::BulkDeleteResult, transactions::ActionOutcome},
};

use super::{AuthenticatedUser, PaginatedResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkDeleteRequest {
    pub ids: Vec<i32>,
}

/// All transactions, filterable by user, item, status and type
#[utoipa::path(
    get,
    path = "/admin/transactions",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(TransactionQuery),
    responses(
        (status = 200, description = "Transactions", body = PaginatedResponse<TransactionDetails>),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_transactions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<PaginatedResponse<TransactionDetails>>> {
    let page = state.services.transactions.list_all(&claims.actor(), &query).await?;
    Ok(Json(PaginatedResponse::from_page(page)))
}

/// Close a late transaction
#[utoipa::path(
    post,
    path = "/admin/transactions/{id}/complete",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction completed", body = ActionOutcome),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse),
        (status = 409, description = "Transaction is not late", body = crate::error::ErrorResponse)
    )
)]
pub async fn complete_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ActionOutcome>> {
    let actor = claims.actor();
    actor.require_admin()?;
    let outcome = state
        .services
        .transactions
        .apply(&actor, id, TransactionAction::AdminComplete)
        .await?;
    Ok(Json(outcome))
}

/// Create a manual penalty on a lending transaction
#[utoipa::path(
    post,
    path = "/admin/transactions/{id}/penalties",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    request_body = CreatePenalty,
    responses(
        (status = 201, description = "Penalty created", body = Penalty),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse),
        (status = 422, description = "Not a loan that went out", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_penalty(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<CreatePenalty>,
) -> AppResult<(StatusCode, Json<Penalty>)> {
    let penalty = state
        .services
        .penalties
        .create_manual(&claims.actor(), id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(penalty)))
}

/// All penalties, filterable by status and borrower
#[utoipa::path(
    get,
    path = "/admin/penalties",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(PenaltyQuery),
    responses(
        (status = 200, description = "Penalties", body = PaginatedResponse<Penalty>),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_penalties(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PenaltyQuery>,
) -> AppResult<Json<PaginatedResponse<Penalty>>> {
    let page = state.services.penalties.list_all(&claims.actor(), &query).await?;
    Ok(Json(PaginatedResponse::from_page(page)))
}

/// Waive a penalty
#[utoipa::path(
    post,
    path = "/admin/penalties/{id}/waive",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Penalty ID")
    ),
    request_body = WaivePenalty,
    responses(
        (status = 200, description = "Penalty waived", body = Penalty),
        (status = 400, description = "Reason too short", body = crate::error::ErrorResponse),
        (status = 409, description = "Penalty already resolved", body = crate::error::ErrorResponse)
    )
)]
pub async fn waive_penalty(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<WaivePenalty>,
) -> AppResult<Json<Penalty>> {
    let penalty = state
        .services
        .penalties
        .waive(&claims.actor(), id, &request.reason)
        .await?;
    Ok(Json(penalty))
}

/// Delete any rating
#[utoipa::path(
    delete,
    path = "/admin/ratings/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rating ID")
    ),
    responses(
        (status = 204, description = "Rating deleted"),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse),
        (status = 404, description = "Rating not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_rating(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let actor = claims.actor();
    actor.require_admin()?;
    state.services.ratings.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete several items; items with transaction history are skipped
#[utoipa::path(
    post,
    path = "/admin/items/bulk-delete",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Deleted and skipped item ids", body = BulkDeleteResult),
        (status = 400, description = "No ids given", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn bulk_delete_items(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BulkDeleteRequest>,
) -> AppResult<Json<BulkDeleteResult>> {
    let result = state
        .services
        .items
        .bulk_delete(&claims.actor(), &request.ids)
        .await?;
    Ok(Json(result))
}

/// Block or unblock a user
#[utoipa::path(
    put,
    path = "/admin/users/{id}/status",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateUserStatus,
    responses(
        (status = 200, description = "Status updated", body = User),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateUserStatus>,
) -> AppResult<Json<User>> {
    let user = state
        .services
        .users
        .set_status(&claims.actor(), id, request.status)
        .await?;
    Ok(Json(user))
}

/// Download a table as CSV
#[utoipa::path(
    get,
    path = "/admin/export/{resource}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("resource" = String, Path, description = "items, transactions, penalties or ratings")
    ),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 400, description = "Unknown resource", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn export(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(resource): Path<String>,
) -> AppResult<impl IntoResponse> {
    let actor = claims.actor();
    actor.require_admin()?;
    let resource: ExportResource = resource.parse()?;
    let file = state.services.export.export(&actor, resource).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.content,
    ))
}
