//! Penalty model and the late-return charge rule

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::PenaltyStatus;
use crate::error::{AppError, AppResult};

/// Penalty model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Penalty {
    pub id: i32,
    pub transaction_id: i32,
    pub days_late: i32,
    pub amount: Decimal,
    pub status: PenaltyStatus,
    /// Created by a late return rather than by an administrator
    pub auto_created: bool,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Penalty {
    /// Paid and waived penalties are final
    pub fn ensure_pending(&self) -> AppResult<()> {
        if self.status == PenaltyStatus::Pending {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "Penalty {} is already {}",
                self.id, self.status
            )))
        }
    }
}

/// Whole days between `due` and `returned`, partial days counted as a full day.
/// Zero when the return is on time.
///
/// Counted from the due instant, not from calendar dates: a 7-day loan
/// approved at 09:00 and returned at 09:00 ten days later is 3 days late,
/// returned at 10:00 that day it is 4.
pub fn days_late(due: DateTime<Utc>, returned: DateTime<Utc>) -> i64 {
    if returned <= due {
        return 0;
    }
    let late = returned - due;
    let days = late.num_days();
    if late > Duration::days(days) {
        days + 1
    } else {
        days
    }
}

/// Flat charge: no proration, no cap, no compounding
pub fn penalty_amount(days_late: i64, rate_per_day: Decimal) -> Decimal {
    Decimal::from(days_late) * rate_per_day
}

/// Waive request (admin only)
#[derive(Debug, Deserialize, ToSchema)]
pub struct WaivePenalty {
    pub reason: String,
}

/// Manual penalty created by an administrator
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePenalty {
    #[validate(range(min = 1, max = 3650, message = "days_late must be positive"))]
    pub days_late: i32,
    #[validate(length(min = 3, max = 1000, message = "A reason is required"))]
    pub reason: String,
}

/// Penalty query parameters (admin listing)
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct PenaltyQuery {
    pub status: Option<PenaltyStatus>,
    pub borrower_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_late_rounds_up_partial_days() {
        let due = Utc::now();
        assert_eq!(days_late(due, due), 0);
        assert_eq!(days_late(due, due - Duration::days(2)), 0);
        assert_eq!(days_late(due, due + Duration::days(3)), 3);
        assert_eq!(days_late(due, due + Duration::hours(1)), 1);
        assert_eq!(days_late(due, due + Duration::days(2) + Duration::minutes(5)), 3);
    }

    #[test]
    fn test_days_late_counts_from_due_instant() {
        let approved = Utc::now();
        let due = approved + Duration::days(7);
        assert_eq!(days_late(due, approved + Duration::days(10)), 3);
        assert_eq!(days_late(due, approved + Duration::days(10) + Duration::hours(1)), 4);
    }

    #[test]
    fn test_penalty_amount_is_flat() {
        let rate = Decimal::from(50);
        assert_eq!(penalty_amount(3, rate), Decimal::from(150));
        assert_eq!(penalty_amount(1, rate), Decimal::from(50));
        assert_eq!(penalty_amount(40, rate), Decimal::from(2000));
    }

    #[test]
    fn test_resolved_penalty_is_final() {
        let mut penalty = Penalty {
            id: 1,
            transaction_id: 1,
            days_late: 2,
            amount: Decimal::from(100),
            status: PenaltyStatus::Pending,
            auto_created: true,
            reason: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        assert!(penalty.ensure_pending().is_ok());
        penalty.status = PenaltyStatus::Waived;
        assert!(matches!(penalty.ensure_pending(), Err(AppError::Conflict(_))));
    }
}
