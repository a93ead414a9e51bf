//! Penalty endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::penalty::{Penalty, WaivePenalty},
};

use super::AuthenticatedUser;

/// Penalties of a transaction
#[utoipa::path(
    get,
    path = "/transactions/{id}/penalties",
    tag = "penalties",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Penalties of the transaction", body = Vec<Penalty>),
        (status = 403, description = "Not a party", body = crate::error::ErrorResponse),
        (status = 404, description = "Transaction not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_transaction_penalties(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Penalty>>> {
    let penalties = state
        .services
        .penalties
        .list_for_transaction(&claims.actor(), id)
        .await?;
    Ok(Json(penalties))
}

/// Pay a penalty (borrower or admin)
#[utoipa::path(
    post,
    path = "/transactions/{id}/penalties/{penalty_id}/pay",
    tag = "penalties",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID"),
        ("penalty_id" = i32, Path, description = "Penalty ID")
    ),
    responses(
        (status = 200, description = "Penalty paid", body = Penalty),
        (status = 403, description = "Not the borrower, or account blocked", body = crate::error::ErrorResponse),
        (status = 404, description = "Penalty not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Penalty already resolved", body = crate::error::ErrorResponse)
    )
)]
pub async fn pay_penalty(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, penalty_id)): Path<(i32, i32)>,
) -> AppResult<Json<Penalty>> {
    let penalty = state
        .services
        .penalties
        .pay(&claims.actor(), id, penalty_id)
        .await?;
    Ok(Json(penalty))
}

/// Waive a penalty (admin only)
#[utoipa::path(
    post,
    path = "/transactions/{id}/penalties/{penalty_id}/waive",
    tag = "penalties",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID"),
        ("penalty_id" = i32, Path, description = "Penalty ID")
    ),
    request_body = WaivePenalty,
    responses(
        (status = 200, description = "Penalty waived", body = Penalty),
        (status = 400, description = "Reason too short", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse),
        (status = 409, description = "Penalty already resolved", body = crate::error::ErrorResponse)
    )
)]
pub async fn waive_penalty(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, penalty_id)): Path<(i32, i32)>,
    Json(request): Json<WaivePenalty>,
) -> AppResult<Json<Penalty>> {
    let penalty = state
        .services
        .penalties
        .waive_in_transaction(&claims.actor(), id, penalty_id, &request.reason)
        .await?;
    Ok(Json(penalty))
}

/// The caller's penalties as a borrower
#[utoipa::path(
    get,
    path = "/penalties/me",
    tag = "penalties",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's penalties", body = Vec<Penalty>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_penalties(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Penalty>>> {
    let penalties = state.services.penalties.list_mine(&claims.actor()).await?;
    Ok(Json(penalties))
}
