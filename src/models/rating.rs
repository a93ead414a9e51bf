//! Rating model and the post-transaction rating gate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::RaterRole;
use super::transaction::Transaction;
use crate::error::{AppError, AppResult};

/// Rating model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Rating {
    pub id: i32,
    pub transaction_id: i32,
    pub rater_id: i32,
    /// The other party of the transaction
    pub rated_user_id: i32,
    pub rater_role: RaterRole,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ratings received by a user with their summary
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RatingSummary {
    pub user_id: i32,
    pub count: i64,
    pub average: Option<f64>,
    pub ratings: Vec<Rating>,
}

/// Create rating request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRating {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

/// Update rating request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRating {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i16>,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

/// Role of `rater_id` in the transaction and the user being rated
pub fn rater_role(transaction: &Transaction, rater_id: i32) -> AppResult<(RaterRole, i32)> {
    let is_owner = transaction.owner_id == rater_id;
    let is_borrower = transaction.borrower_id == rater_id;
    match (is_owner, is_borrower) {
        (true, true) => Err(AppError::BusinessRule(
            "Cannot rate a transaction with yourself".to_string(),
        )),
        (true, false) => Ok((RaterRole::Owner, transaction.borrower_id)),
        (false, true) => Ok((RaterRole::Borrower, transaction.owner_id)),
        (false, false) => Err(AppError::Authorization(
            "Only the owner or the borrower can rate this transaction".to_string(),
        )),
    }
}

/// Gate applied before a rating is stored
pub fn check_can_rate(
    transaction: &Transaction,
    rater_id: i32,
    already_rated: bool,
) -> AppResult<(RaterRole, i32)> {
    let role = rater_role(transaction, rater_id)?;
    if !transaction.status.is_ratable() {
        return Err(AppError::Conflict(format!(
            "A {} transaction cannot be rated",
            transaction.status
        )));
    }
    if already_rated {
        return Err(AppError::Conflict(
            "You have already rated this transaction".to_string(),
        ));
    }
    Ok(role)
}
