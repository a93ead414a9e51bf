//! User profile endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{rating::RatingSummary, user::UserProfile},
};

use super::AuthenticatedUser;

/// Public profile with rating summary
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<UserProfile>> {
    let profile = state.services.users.get_profile(id).await?;
    Ok(Json(profile))
}

/// Ratings received by a user
#[utoipa::path(
    get,
    path = "/users/{id}/ratings",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Received ratings with average and count", body = RatingSummary),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user_ratings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<RatingSummary>> {
    let summary = state.services.ratings.received(id).await?;
    Ok(Json(summary))
}
