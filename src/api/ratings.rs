//! Rating endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::rating::{CreateRating, Rating, UpdateRating},
};

use super::AuthenticatedUser;

/// Ratings of a transaction
#[utoipa::path(
    get,
    path = "/transactions/{id}/ratings",
    tag = "ratings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Ratings of the transaction", body = Vec<Rating>),
        (status = 403, description = "Not a party", body = crate::error::ErrorResponse),
        (status = 404, description = "Transaction not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_transaction_ratings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Rating>>> {
    let ratings = state
        .services
        .ratings
        .list_for_transaction(&claims.actor(), id)
        .await?;
    Ok(Json(ratings))
}

/// Rate the other party of a finished transaction
#[utoipa::path(
    post,
    path = "/transactions/{id}/ratings",
    tag = "ratings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    request_body = CreateRating,
    responses(
        (status = 201, description = "Rating created", body = Rating),
        (status = 400, description = "Rating out of range", body = crate::error::ErrorResponse),
        (status = 403, description = "Not a party", body = crate::error::ErrorResponse),
        (status = 409, description = "Not ratable yet or already rated", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_rating(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<CreateRating>,
) -> AppResult<(StatusCode, Json<Rating>)> {
    let rating = state
        .services
        .ratings
        .create(&claims.actor(), id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(rating)))
}

/// Edit one's own rating
#[utoipa::path(
    patch,
    path = "/ratings/{id}",
    tag = "ratings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rating ID")
    ),
    request_body = UpdateRating,
    responses(
        (status = 200, description = "Rating updated", body = Rating),
        (status = 403, description = "Not the author", body = crate::error::ErrorResponse),
        (status = 404, description = "Rating not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_rating(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateRating>,
) -> AppResult<Json<Rating>> {
    let rating = state
        .services
        .ratings
        .update(&claims.actor(), id, request)
        .await?;
    Ok(Json(rating))
}

/// Delete one's own rating
#[utoipa::path(
    delete,
    path = "/ratings/{id}",
    tag = "ratings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rating ID")
    ),
    responses(
        (status = 204, description = "Rating deleted"),
        (status = 403, description = "Not the author", body = crate::error::ErrorResponse),
        (status = 404, description = "Rating not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_rating(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.ratings.delete(&claims.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
