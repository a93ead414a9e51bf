//! Transaction lifecycle service

use chrono::{SubsecRound, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    config::ExchangeConfig,
    error::AppResult,
    models::{
        penalty::Penalty,
        transaction::{RequestItem, TransactionAction, TransactionDetails, TransactionQuery},
        user::Actor,
    },
    repository::Repository,
    services::users::UsersService,
};

/// Result of an action, with the penalty a late return produced
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionOutcome {
    pub transaction: TransactionDetails,
    pub penalty: Option<Penalty>,
}

#[derive(Clone)]
pub struct TransactionsService {
    repository: Repository,
    users: UsersService,
    config: ExchangeConfig,
}

impl TransactionsService {
    pub fn new(repository: Repository, users: UsersService, config: ExchangeConfig) -> Self {
        Self { repository, users, config }
    }

    /// Request an item: pending transaction, item reserved
    pub async fn request(&self, actor: &Actor, item_id: i32, request: RequestItem) -> AppResult<TransactionDetails> {
        request.validate()?;
        request.check_terms()?;
        self.users.ensure_active(actor).await?;

        let created = self.repository.transactions.request(item_id, actor, &request).await?;
        tracing::info!(
            transaction_id = created.id,
            item_id,
            borrower_id = actor.user_id,
            kind = %created.kind,
            "Item requested"
        );
        self.repository.transactions.get_details(created.id).await
    }

    /// Transactions where the actor is a party
    pub async fn list_mine(
        &self,
        actor: &Actor,
        query: &TransactionQuery,
    ) -> AppResult<(Vec<TransactionDetails>, i64, i64, i64)> {
        let (page, per_page, offset) = self.config.paginate(query.page, query.per_page);
        let (rows, total) = self
            .repository
            .transactions
            .list(query, Some(actor.user_id), per_page, offset)
            .await?;
        Ok((rows, total, page, per_page))
    }

    /// All transactions (admin only), optionally for one user
    pub async fn list_all(
        &self,
        actor: &Actor,
        query: &TransactionQuery,
    ) -> AppResult<(Vec<TransactionDetails>, i64, i64, i64)> {
        actor.require_admin()?;
        let (page, per_page, offset) = self.config.paginate(query.page, query.per_page);
        let (rows, total) = self
            .repository
            .transactions
            .list(query, query.user_id, per_page, offset)
            .await?;
        Ok((rows, total, page, per_page))
    }

    pub async fn get(&self, actor: &Actor, id: i32) -> AppResult<TransactionDetails> {
        let details = self.repository.transactions.get_details(id).await?;
        details.transaction.ensure_visible_to(actor)?;
        Ok(details)
    }

    /// Apply a lifecycle action on behalf of `actor`
    pub async fn apply(&self, actor: &Actor, id: i32, action: TransactionAction) -> AppResult<ActionOutcome> {
        self.users.ensure_active(actor).await?;

        // Postgres keeps microseconds; match it so stored dates compare exactly
        let now = Utc::now().trunc_subsecs(6);
        let (updated, penalty) = self
            .repository
            .transactions
            .apply_action(id, action, actor, self.config.penalty_rate_per_day, now)
            .await?;

        tracing::info!(
            transaction_id = id,
            actor_id = actor.user_id,
            ?action,
            status = %updated.status,
            "Transaction updated"
        );
        if let Some(ref p) = penalty {
            tracing::warn!(
                transaction_id = id,
                penalty_id = p.id,
                days_late = p.days_late,
                amount = %p.amount,
                "Late return penalty created"
            );
        }

        Ok(ActionOutcome {
            transaction: self.repository.transactions.get_details(id).await?,
            penalty,
        })
    }
}
