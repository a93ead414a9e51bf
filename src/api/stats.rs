//! Statistics endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::error::AppResult;

use super::AuthenticatedUser;

/// Admin dashboard
#[derive(Serialize, ToSchema)]
pub struct DashboardStats {
    /// Registered users
    pub users: i64,
    pub items: ItemStats,
    pub transactions: TransactionStats,
    pub penalties: PenaltyStats,
    pub ratings: RatingStats,
    /// 0 to 100, lower when late returns, cancellations and unpaid penalties pile up
    pub health_score: f64,
}

#[derive(Serialize, ToSchema)]
pub struct ItemStats {
    pub total: i64,
    pub by_status: Vec<StatEntry>,
    pub by_mode: Vec<StatEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct TransactionStats {
    pub total: i64,
    /// Active loans past their due date
    pub overdue: i64,
    pub by_status: Vec<StatEntry>,
    pub by_type: Vec<StatEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct PenaltyStats {
    pub total: i64,
    pub by_status: Vec<AmountEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct RatingStats {
    pub total: i64,
    pub average: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct StatEntry {
    pub label: String,
    pub value: i64,
}

/// Count and amount sum for one label
#[derive(Serialize, ToSchema)]
pub struct AmountEntry {
    pub label: String,
    pub count: i64,
    pub amount: Decimal,
}

/// Time interval for grouping statistics
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct TrendsQuery {
    /// Start of the range (RFC 3339), default 30 days before end
    pub start_date: Option<DateTime<Utc>>,
    /// End of the range (RFC 3339), default now
    pub end_date: Option<DateTime<Utc>>,
    /// Grouping interval (day, week, month, year)
    pub interval: Option<Interval>,
}

#[derive(Serialize, ToSchema)]
pub struct TimeSeriesEntry {
    /// Period label (e.g. 2024-01-15, 2024-W03, 2024-01, 2024)
    pub period: String,
    /// Transactions created in the period
    pub transactions: i64,
    /// Penalties created in the period
    pub penalties: i64,
}

#[derive(Serialize, ToSchema)]
pub struct TrendsResponse {
    pub interval: Interval,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub series: Vec<TimeSeriesEntry>,
}

/// Figures for one user
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct UserStats {
    pub user_id: i32,
    pub items_listed: i64,
    pub transactions_as_borrower: i64,
    pub transactions_as_owner: i64,
    pub late_returns: i64,
    /// Sum of the user's pending penalties
    pub pending_penalty_total: Decimal,
    pub ratings_count: i64,
    pub average_rating: Option<f64>,
}

/// Platform dashboard
#[utoipa::path(
    get,
    path = "/admin/stats",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard", body = DashboardStats),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_dashboard(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<DashboardStats>> {
    let stats = state.services.stats.dashboard(&claims.actor()).await?;
    Ok(Json(stats))
}

/// Transactions and penalties over time
#[utoipa::path(
    get,
    path = "/admin/stats/trends",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(TrendsQuery),
    responses(
        (status = 200, description = "Time series", body = TrendsResponse),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_trends(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<TrendsQuery>,
) -> AppResult<Json<TrendsResponse>> {
    let interval = query.interval.unwrap_or(Interval::Day);
    let trends = state
        .services
        .stats
        .trends(&claims.actor(), query.start_date, query.end_date, interval)
        .await?;
    Ok(Json(trends))
}

/// Statistics of one user (the user or an admin)
#[utoipa::path(
    get,
    path = "/users/{id}/stats",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User statistics", body = UserStats),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<UserStats>> {
    let stats = state.services.stats.user_stats(&claims.actor(), id).await?;
    Ok(Json(stats))
}
