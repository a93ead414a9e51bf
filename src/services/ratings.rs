//! Rating service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        rating::{check_can_rate, CreateRating, Rating, RatingSummary, UpdateRating},
        user::Actor,
    },
    repository::Repository,
    services::users::UsersService,
};

#[derive(Clone)]
pub struct RatingsService {
    repository: Repository,
    users: UsersService,
}

impl RatingsService {
    pub fn new(repository: Repository, users: UsersService) -> Self {
        Self { repository, users }
    }

    /// Rate the other party of a finished transaction, once
    pub async fn create(&self, actor: &Actor, transaction_id: i32, data: CreateRating) -> AppResult<Rating> {
        data.validate()?;
        self.users.ensure_active(actor).await?;

        let transaction = self.repository.transactions.get_by_id(transaction_id).await?;
        let already_rated = self.repository.ratings.exists(transaction_id, actor.user_id).await?;
        let (role, rated_user_id) = check_can_rate(&transaction, actor.user_id, already_rated)?;

        let rating = self
            .repository
            .ratings
            .create(transaction_id, actor.user_id, rated_user_id, role, &data)
            .await?;
        tracing::info!(rating_id = rating.id, transaction_id, rater_id = actor.user_id, %role, "Rating created");
        Ok(rating)
    }

    pub async fn list_for_transaction(&self, actor: &Actor, transaction_id: i32) -> AppResult<Vec<Rating>> {
        let transaction = self.repository.transactions.get_by_id(transaction_id).await?;
        transaction.ensure_visible_to(actor)?;
        self.repository.ratings.list_for_transaction(transaction_id).await
    }

    /// Ratings a user received, with count and average
    pub async fn received(&self, user_id: i32) -> AppResult<RatingSummary> {
        self.repository.users.get_by_id(user_id).await?;
        let (count, average) = self.repository.ratings.summary(user_id).await?;
        let ratings = self.repository.ratings.list_received(user_id).await?;
        Ok(RatingSummary {
            user_id,
            count,
            average,
            ratings,
        })
    }

    /// Edit a rating (its author only)
    pub async fn update(&self, actor: &Actor, id: i32, data: UpdateRating) -> AppResult<Rating> {
        data.validate()?;
        self.users.ensure_active(actor).await?;
        let rating = self.repository.ratings.get_by_id(id).await?;
        if rating.rater_id != actor.user_id {
            return Err(AppError::Authorization("Only the author can edit this rating".to_string()));
        }
        self.repository.ratings.update(id, &data).await
    }

    /// Delete a rating (its author or an admin)
    pub async fn delete(&self, actor: &Actor, id: i32) -> AppResult<()> {
        self.users.ensure_active(actor).await?;
        let rating = self.repository.ratings.get_by_id(id).await?;
        actor.require_self_or_admin(rating.rater_id, "delete this rating")?;
        self.repository.ratings.delete(id).await?;
        tracing::info!(rating_id = id, actor_id = actor.user_id, "Rating deleted");
        Ok(())
    }
}
