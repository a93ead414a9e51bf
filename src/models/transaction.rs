//! Transaction model and lifecycle rules
//!
//! Transitions are planned here without touching storage; the repository
//! applies a [`Transition`] to the transaction, its item and an optional
//! penalty inside one database transaction.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{ItemStatus, TransactionStatus, TransactionType};
use super::item::Item;
use super::penalty::days_late;
use super::user::Actor;
use crate::error::{AppError, AppResult};

/// Transaction model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Transaction {
    pub id: i32,
    pub item_id: i32,
    pub borrower_id: i32,
    /// Item owner at request time
    pub owner_id: i32,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub status: TransactionStatus,
    pub start_date: Option<DateTime<Utc>>,
    /// Only set for lending
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub deposit_amount: Option<Decimal>,
    pub final_price: Option<Decimal>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Transaction joined with its item title, overdue flag computed at read time
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TransactionDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub transaction: Transaction,
    pub item_title: String,
    #[sqlx(skip)]
    pub is_overdue: bool,
}

impl TransactionDetails {
    pub fn with_overdue(mut self, now: DateTime<Utc>) -> Self {
        self.is_overdue = self.transaction.is_overdue(now);
        self
    }
}

/// Actions a party (or an admin acting for one) can apply to a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionAction {
    Approve,
    Reject,
    MarkReturned,
    Cancel,
    Complete,
    /// Close a late transaction (admin only)
    AdminComplete,
}

/// Outcome of a planned action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub status: TransactionStatus,
    /// New item status, `None` leaves the item untouched
    pub item_status: Option<ItemStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    /// Set when the return is late and a penalty must be created
    pub days_late: Option<i64>,
}

impl Transition {
    fn to(status: TransactionStatus, item_status: Option<ItemStatus>) -> Self {
        Self {
            status,
            item_status,
            start_date: None,
            due_date: None,
            return_date: None,
            days_late: None,
        }
    }
}

impl Transaction {
    /// Lazily computed: active loan past its due date
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TransactionStatus::Active
            && self.kind == TransactionType::Lend
            && self.due_date.map(|due| now > due).unwrap_or(false)
    }

    pub fn is_party(&self, user_id: i32) -> bool {
        self.owner_id == user_id || self.borrower_id == user_id
    }

    /// Require the actor to be a party of the transaction or an admin
    pub fn ensure_visible_to(&self, actor: &Actor) -> AppResult<()> {
        if self.is_party(actor.user_id) || actor.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Not a party to this transaction".to_string(),
            ))
        }
    }

    fn ensure_status(&self, allowed: &[TransactionStatus], action: TransactionAction) -> AppResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "Cannot {:?} a {} transaction",
                action, self.status
            )))
        }
    }

    fn ensure_kind(&self, kind: TransactionType, action: TransactionAction) -> AppResult<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(AppError::BusinessRule(format!(
                "{:?} only applies to {} transactions",
                action, kind
            )))
        }
    }

    /// Plan `action` by `actor` at `now`.
    ///
    /// `lending_duration_days` is the item's loan length, needed to set the
    /// due date on approval of a lending transaction.
    pub fn plan(
        &self,
        action: TransactionAction,
        actor: &Actor,
        lending_duration_days: Option<i32>,
        now: DateTime<Utc>,
    ) -> AppResult<Transition> {
        self.ensure_visible_to(actor)?;

        let is_owner = actor.user_id == self.owner_id;
        let is_borrower = actor.user_id == self.borrower_id;
        let is_admin = actor.is_admin();

        let permitted = match action {
            TransactionAction::Approve | TransactionAction::Reject | TransactionAction::Complete => {
                is_owner || is_admin
            }
            TransactionAction::MarkReturned => is_borrower || is_admin,
            TransactionAction::Cancel => is_owner || is_borrower || is_admin,
            TransactionAction::AdminComplete => is_admin,
        };
        if !permitted {
            return Err(AppError::Authorization(format!(
                "Not allowed to {:?} this transaction",
                action
            )));
        }

        match action {
            TransactionAction::Approve => {
                self.ensure_status(&[TransactionStatus::Pending], action)?;
                let mut transition = match self.kind {
                    TransactionType::Lend => {
                        let days = lending_duration_days.ok_or_else(|| {
                            AppError::BusinessRule("Item has no lending duration".to_string())
                        })?;
                        let mut t = Transition::to(TransactionStatus::Active, Some(ItemStatus::Borrowed));
                        t.due_date = Some(now + Duration::days(days as i64));
                        t
                    }
                    // The item stays reserved until the sale is completed
                    TransactionType::Sell => Transition::to(TransactionStatus::Active, None),
                };
                transition.start_date = Some(now);
                Ok(transition)
            }
            TransactionAction::Reject => {
                self.ensure_status(&[TransactionStatus::Pending], action)?;
                Ok(Transition::to(TransactionStatus::Cancelled, Some(ItemStatus::Available)))
            }
            TransactionAction::Cancel => {
                self.ensure_status(&[TransactionStatus::Pending, TransactionStatus::Active], action)?;
                Ok(Transition::to(TransactionStatus::Cancelled, Some(ItemStatus::Available)))
            }
            TransactionAction::MarkReturned => {
                self.ensure_kind(TransactionType::Lend, action)?;
                self.ensure_status(&[TransactionStatus::Active], action)?;
                let due = self.due_date.ok_or_else(|| {
                    AppError::Internal(format!("Active loan {} has no due date", self.id))
                })?;
                let late = days_late(due, now);
                let mut transition = if late > 0 {
                    let mut t = Transition::to(TransactionStatus::Late, Some(ItemStatus::Available));
                    t.days_late = Some(late);
                    t
                } else {
                    Transition::to(TransactionStatus::Completed, Some(ItemStatus::Available))
                };
                transition.return_date = Some(now);
                Ok(transition)
            }
            TransactionAction::Complete => {
                self.ensure_kind(TransactionType::Sell, action)?;
                self.ensure_status(&[TransactionStatus::Active], action)?;
                let mut transition = Transition::to(TransactionStatus::Completed, Some(ItemStatus::Sold));
                transition.return_date = Some(now);
                Ok(transition)
            }
            TransactionAction::AdminComplete => {
                self.ensure_status(&[TransactionStatus::Late], action)?;
                Ok(Transition::to(TransactionStatus::Completed, None))
            }
        }
    }
}

/// Check whether `requester` may open a `kind` transaction on `item`
pub fn check_request(
    item: &Item,
    requester: &Actor,
    kind: TransactionType,
    has_pending_penalty: bool,
) -> AppResult<()> {
    if item.owner_id == requester.user_id {
        return Err(AppError::BusinessRule("You cannot request your own item".to_string()));
    }
    if has_pending_penalty {
        return Err(AppError::Authorization(
            "Settle your pending penalties before requesting items".to_string(),
        ));
    }
    if item.status != ItemStatus::Available {
        return Err(AppError::Conflict(format!("Item is {}", item.status)));
    }
    if !item.availability_mode.allows(kind) {
        return Err(AppError::BusinessRule(format!(
            "Item is not offered for {}",
            kind
        )));
    }
    if kind == TransactionType::Sell && item.price.is_none() {
        return Err(AppError::BusinessRule("Item has no sale price".to_string()));
    }
    Ok(())
}

/// Request an item (creates a pending transaction)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RequestItem {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Deposit offered for a loan
    pub deposit_amount: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub message: Option<String>,
}

impl RequestItem {
    pub fn check_terms(&self) -> AppResult<()> {
        match (self.kind, self.deposit_amount) {
            (TransactionType::Sell, Some(_)) => Err(AppError::Validation(
                "A deposit only applies to lending".to_string(),
            )),
            (TransactionType::Lend, Some(d)) if d < Decimal::ZERO => Err(AppError::Validation(
                "Deposit cannot be negative".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Apply an action to a transaction
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTransaction {
    pub action: TransactionAction,
}

/// Which side of the transactions to list for the actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PartyFilter {
    Borrower,
    Owner,
}

/// Transaction query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct TransactionQuery {
    /// Restrict to transactions where the actor is borrower or owner
    pub role: Option<PartyFilter>,
    pub status: Option<TransactionStatus>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    /// Admin listing only: filter by participating user
    pub user_id: Option<i32>,
    pub item_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{AccountType, AvailabilityMode};
    use crate::models::penalty::penalty_amount;
    use tokio_test::{assert_err, assert_ok};

    const OWNER: i32 = 1;
    const BORROWER: i32 = 2;

    fn actor(user_id: i32) -> Actor {
        Actor { user_id, account_type: AccountType::Student }
    }

    fn admin() -> Actor {
        Actor { user_id: 99, account_type: AccountType::Admin }
    }

    fn item(mode: AvailabilityMode) -> Item {
        let now = Utc::now();
        Item {
            id: 10,
            owner_id: OWNER,
            title: "Lab coat".to_string(),
            description: None,
            availability_mode: mode,
            price: mode.allows_selling().then(|| Decimal::from(25)),
            lending_duration_days: mode.allows_lending().then_some(7),
            status: ItemStatus::Available,
            pickup_location: Some("Library desk".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    fn transaction(kind: TransactionType, status: TransactionStatus) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: 5,
            item_id: 10,
            borrower_id: BORROWER,
            owner_id: OWNER,
            kind,
            status,
            start_date: None,
            due_date: None,
            return_date: None,
            deposit_amount: None,
            final_price: None,
            message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Approve a pending 7-day loan at `start` and return the active transaction
    fn approved_loan(start: DateTime<Utc>) -> Transaction {
        let mut tx = transaction(TransactionType::Lend, TransactionStatus::Pending);
        let t = tx.plan(TransactionAction::Approve, &actor(OWNER), Some(7), start).unwrap();
        assert_eq!(t.status, TransactionStatus::Active);
        assert_eq!(t.item_status, Some(ItemStatus::Borrowed));
        assert_eq!(t.due_date, Some(start + Duration::days(7)));
        tx.status = t.status;
        tx.start_date = t.start_date;
        tx.due_date = t.due_date;
        tx
    }

    #[test]
    fn test_late_return_on_day_ten() {
        let start = Utc::now();
        let tx = approved_loan(start);

        let t = assert_ok!(tx.plan(
            TransactionAction::MarkReturned,
            &actor(BORROWER),
            Some(7),
            start + Duration::days(10)
        ));
        assert_eq!(t.status, TransactionStatus::Late);
        assert_eq!(t.item_status, Some(ItemStatus::Available));
        assert_eq!(t.days_late, Some(3));
        assert_eq!(penalty_amount(3, Decimal::from(50)), Decimal::from(150));
    }

    #[test]
    fn test_on_time_return_on_day_five() {
        let start = Utc::now();
        let tx = approved_loan(start);

        let t = assert_ok!(tx.plan(
            TransactionAction::MarkReturned,
            &actor(BORROWER),
            Some(7),
            start + Duration::days(5)
        ));
        assert_eq!(t.status, TransactionStatus::Completed);
        assert_eq!(t.item_status, Some(ItemStatus::Available));
        assert_eq!(t.days_late, None);
        assert!(t.return_date.is_some());
    }

    #[test]
    fn test_return_exactly_at_due_date_is_on_time() {
        let start = Utc::now();
        let tx = approved_loan(start);
        let t = assert_ok!(tx.plan(
            TransactionAction::MarkReturned,
            &actor(BORROWER),
            Some(7),
            start + Duration::days(7)
        ));
        assert_eq!(t.status, TransactionStatus::Completed);
    }

    #[test]
    fn test_owner_rejects_pending_request() {
        let tx = transaction(TransactionType::Lend, TransactionStatus::Pending);
        let t = tx.plan(TransactionAction::Reject, &actor(OWNER), Some(7), Utc::now()).unwrap();
        assert_eq!(t.status, TransactionStatus::Cancelled);
        assert_eq!(t.item_status, Some(ItemStatus::Available));
        assert!(!t.status.is_ratable());
    }

    #[test]
    fn test_borrower_cannot_approve_or_reject() {
        let tx = transaction(TransactionType::Lend, TransactionStatus::Pending);
        let err = tx.plan(TransactionAction::Approve, &actor(BORROWER), Some(7), Utc::now());
        assert!(matches!(err, Err(AppError::Authorization(_))));
        let err = tx.plan(TransactionAction::Reject, &actor(BORROWER), Some(7), Utc::now());
        assert!(matches!(err, Err(AppError::Authorization(_))));
    }

    #[test]
    fn test_outsider_is_refused() {
        let tx = transaction(TransactionType::Lend, TransactionStatus::Pending);
        let err = assert_err!(tx.plan(TransactionAction::Cancel, &actor(3), Some(7), Utc::now()));
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[test]
    fn test_approving_non_pending_is_conflict() {
        let tx = transaction(TransactionType::Lend, TransactionStatus::Active);
        let err = tx.plan(TransactionAction::Approve, &actor(OWNER), Some(7), Utc::now());
        assert!(matches!(err, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_either_party_cancels_active() {
        let tx = transaction(TransactionType::Lend, TransactionStatus::Active);
        for who in [OWNER, BORROWER] {
            let t = tx.plan(TransactionAction::Cancel, &actor(who), Some(7), Utc::now()).unwrap();
            assert_eq!(t.status, TransactionStatus::Cancelled);
            assert_eq!(t.item_status, Some(ItemStatus::Available));
        }
        let done = transaction(TransactionType::Lend, TransactionStatus::Completed);
        let err = done.plan(TransactionAction::Cancel, &actor(BORROWER), Some(7), Utc::now());
        assert!(matches!(err, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_sale_flow() {
        let now = Utc::now();
        let mut tx = transaction(TransactionType::Sell, TransactionStatus::Pending);
        let t = tx.plan(TransactionAction::Approve, &actor(OWNER), None, now).unwrap();
        assert_eq!(t.status, TransactionStatus::Active);
        assert_eq!(t.item_status, None);
        assert_eq!(t.due_date, None);
        tx.status = t.status;

        let err = tx.plan(TransactionAction::MarkReturned, &actor(BORROWER), None, now);
        assert!(matches!(err, Err(AppError::BusinessRule(_))));

        let t = tx.plan(TransactionAction::Complete, &actor(OWNER), None, now).unwrap();
        assert_eq!(t.status, TransactionStatus::Completed);
        assert_eq!(t.item_status, Some(ItemStatus::Sold));
    }

    #[test]
    fn test_admin_override_late() {
        let tx = transaction(TransactionType::Lend, TransactionStatus::Late);
        let err = tx.plan(TransactionAction::AdminComplete, &actor(OWNER), Some(7), Utc::now());
        assert!(matches!(err, Err(AppError::Authorization(_))));
        let t = tx.plan(TransactionAction::AdminComplete, &admin(), Some(7), Utc::now()).unwrap();
        assert_eq!(t.status, TransactionStatus::Completed);
        assert_eq!(t.item_status, None);
    }

    #[test]
    fn test_overdue_is_lazy() {
        let start = Utc::now() - Duration::days(9);
        let tx = approved_loan(start);
        assert!(tx.is_overdue(Utc::now()));
        assert!(!tx.is_overdue(start + Duration::days(1)));
    }

    #[test]
    fn test_request_guards() {
        let lend = item(AvailabilityMode::Lend);
        assert!(check_request(&lend, &actor(BORROWER), TransactionType::Lend, false).is_ok());
        assert!(matches!(
            check_request(&lend, &actor(BORROWER), TransactionType::Lend, true),
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            check_request(&lend, &actor(OWNER), TransactionType::Lend, false),
            Err(AppError::BusinessRule(_))
        ));
        assert!(matches!(
            check_request(&lend, &actor(BORROWER), TransactionType::Sell, false),
            Err(AppError::BusinessRule(_))
        ));

        let mut reserved = item(AvailabilityMode::Both);
        reserved.status = ItemStatus::Reserved;
        assert!(matches!(
            check_request(&reserved, &actor(BORROWER), TransactionType::Sell, false),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_deposit_only_for_lending() {
        let request = RequestItem {
            kind: TransactionType::Sell,
            deposit_amount: Some(Decimal::from(10)),
            message: None,
        };
        assert!(request.check_terms().is_err());
        let request = RequestItem {
            kind: TransactionType::Lend,
            deposit_amount: Some(Decimal::from(10)),
            message: None,
        };
        assert!(request.check_terms().is_ok());
    }
}
