//! Transaction endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::transaction::{TransactionAction, TransactionDetails, TransactionQuery, UpdateTransaction},
    services::transactions::ActionOutcome,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List the caller's transactions
#[utoipa::path(
    get,
    path = "/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(TransactionQuery),
    responses(
        (status = 200, description = "Transactions where the caller is borrower or owner", body = PaginatedResponse<TransactionDetails>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_transactions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<PaginatedResponse<TransactionDetails>>> {
    let page = state.services.transactions.list_mine(&claims.actor(), &query).await?;
    Ok(Json(PaginatedResponse::from_page(page)))
}

/// Get a transaction (parties and admins)
#[utoipa::path(
    get,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction details", body = TransactionDetails),
        (status = 403, description = "Not a party", body = crate::error::ErrorResponse),
        (status = 404, description = "Transaction not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<TransactionDetails>> {
    let details = state.services.transactions.get(&claims.actor(), id).await?;
    Ok(Json(details))
}

/// Apply a lifecycle action
#[utoipa::path(
    patch,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    request_body = UpdateTransaction,
    responses(
        (status = 200, description = "Transaction updated, with the penalty a late return created", body = ActionOutcome),
        (status = 403, description = "Wrong party for this action", body = crate::error::ErrorResponse),
        (status = 404, description = "Transaction not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Action not allowed in the current status", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateTransaction>,
) -> AppResult<Json<ActionOutcome>> {
    if request.action == TransactionAction::AdminComplete {
        return Err(AppError::BadRequest(
            "Use POST /admin/transactions/{id}/complete".to_string(),
        ));
    }
    let outcome = state
        .services
        .transactions
        .apply(&claims.actor(), id, request.action)
        .await?;
    Ok(Json(outcome))
}
