//! Penalty service

use validator::Validate;

use crate::{
    config::ExchangeConfig,
    error::{AppError, AppResult},
    models::{
        enums::{PenaltyStatus, TransactionType},
        penalty::{penalty_amount, CreatePenalty, Penalty, PenaltyQuery},
        user::Actor,
    },
    repository::Repository,
    services::users::UsersService,
};

#[derive(Clone)]
pub struct PenaltiesService {
    repository: Repository,
    users: UsersService,
    config: ExchangeConfig,
}

impl PenaltiesService {
    pub fn new(repository: Repository, users: UsersService, config: ExchangeConfig) -> Self {
        Self { repository, users, config }
    }

    /// Penalties of a transaction (parties and admins)
    pub async fn list_for_transaction(&self, actor: &Actor, transaction_id: i32) -> AppResult<Vec<Penalty>> {
        let transaction = self.repository.transactions.get_by_id(transaction_id).await?;
        transaction.ensure_visible_to(actor)?;
        self.repository.penalties.list_for_transaction(transaction_id).await
    }

    /// Penalties the actor owes or owed as a borrower
    pub async fn list_mine(&self, actor: &Actor) -> AppResult<Vec<Penalty>> {
        self.repository.penalties.list_for_borrower(actor.user_id).await
    }

    pub async fn list_all(&self, actor: &Actor, query: &PenaltyQuery) -> AppResult<(Vec<Penalty>, i64, i64, i64)> {
        actor.require_admin()?;
        let (page, per_page, offset) = self.config.paginate(query.page, query.per_page);
        let (rows, total) = self.repository.penalties.list(query, per_page, offset).await?;
        Ok((rows, total, page, per_page))
    }

    /// Load a penalty and check it belongs to `transaction_id`
    async fn get_in_transaction(&self, transaction_id: i32, penalty_id: i32) -> AppResult<Penalty> {
        let penalty = self.repository.penalties.get_by_id(penalty_id).await?;
        if penalty.transaction_id != transaction_id {
            return Err(AppError::NotFound(format!(
                "Penalty {} not found for transaction {}",
                penalty_id, transaction_id
            )));
        }
        Ok(penalty)
    }

    /// Pay a penalty (the borrower or an admin)
    pub async fn pay(&self, actor: &Actor, transaction_id: i32, penalty_id: i32) -> AppResult<Penalty> {
        self.users.ensure_active(actor).await?;
        let penalty = self.get_in_transaction(transaction_id, penalty_id).await?;
        let transaction = self.repository.transactions.get_by_id(transaction_id).await?;

        if transaction.borrower_id != actor.user_id && !actor.is_admin() {
            return Err(AppError::Authorization(
                "Only the borrower can pay this penalty".to_string(),
            ));
        }
        penalty.ensure_pending()?;

        let paid = self
            .repository
            .penalties
            .resolve(penalty_id, PenaltyStatus::Paid, None)
            .await?;
        tracing::info!(penalty_id, transaction_id, actor_id = actor.user_id, amount = %paid.amount, "Penalty paid");
        Ok(paid)
    }

    /// Waive a penalty (admin only, reason required)
    pub async fn waive(&self, actor: &Actor, penalty_id: i32, reason: &str) -> AppResult<Penalty> {
        actor.require_admin()?;

        let reason = reason.trim();
        if reason.chars().count() < self.config.waive_reason_min_length {
            return Err(AppError::Validation(format!(
                "Reason must be at least {} characters",
                self.config.waive_reason_min_length
            )));
        }

        let waived = self
            .repository
            .penalties
            .resolve(penalty_id, PenaltyStatus::Waived, Some(reason))
            .await?;
        tracing::info!(penalty_id, admin_id = actor.user_id, "Penalty waived");
        Ok(waived)
    }

    /// Waive through the transaction-scoped route
    pub async fn waive_in_transaction(
        &self,
        actor: &Actor,
        transaction_id: i32,
        penalty_id: i32,
        reason: &str,
    ) -> AppResult<Penalty> {
        actor.require_admin()?;
        self.get_in_transaction(transaction_id, penalty_id).await?;
        self.waive(actor, penalty_id, reason).await
    }

    /// Manual penalty on a loan that went out (admin only)
    pub async fn create_manual(&self, actor: &Actor, transaction_id: i32, data: CreatePenalty) -> AppResult<Penalty> {
        actor.require_admin()?;
        data.validate()?;

        let transaction = self.repository.transactions.get_by_id(transaction_id).await?;
        if transaction.kind != TransactionType::Lend {
            return Err(AppError::BusinessRule(
                "Penalties only apply to lending transactions".to_string(),
            ));
        }
        if !transaction.status.accepts_manual_penalty() {
            return Err(AppError::BusinessRule(format!(
                "A {} loan cannot be penalized",
                transaction.status
            )));
        }

        let amount = penalty_amount(data.days_late as i64, self.config.penalty_rate_per_day);
        let penalty = self
            .repository
            .penalties
            .create_manual(transaction_id, data.days_late, amount, &data.reason)
            .await?;
        tracing::info!(penalty_id = penalty.id, transaction_id, admin_id = actor.user_id, "Manual penalty created");
        Ok(penalty)
    }
}
