//! Item listing service

use validator::Validate;

use crate::{
    config::ExchangeConfig,
    error::{AppError, AppResult},
    models::{
        enums::ItemStatus,
        item::{check_offer_terms, CreateItem, Item, ItemQuery, UpdateItem},
        user::Actor,
    },
    repository::Repository,
    services::users::UsersService,
};

#[derive(Clone)]
pub struct ItemsService {
    repository: Repository,
    users: UsersService,
    config: ExchangeConfig,
}

/// Result of a bulk deletion
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct BulkDeleteResult {
    pub deleted: Vec<i32>,
    /// Items with transaction history or already gone
    pub skipped: Vec<i32>,
}

impl ItemsService {
    pub fn new(repository: Repository, users: UsersService, config: ExchangeConfig) -> Self {
        Self { repository, users, config }
    }

    /// Search items, returns (items, total, page, per_page)
    pub async fn search(&self, query: &ItemQuery) -> AppResult<(Vec<Item>, i64, i64, i64)> {
        let (page, per_page, offset) = self.config.paginate(query.page, query.per_page);
        let (items, total) = self.repository.items.search(query, per_page, offset).await?;
        Ok((items, total, page, per_page))
    }

    pub async fn get(&self, id: i32) -> AppResult<Item> {
        self.repository.items.get_by_id(id).await
    }

    /// List a new item; owners with a pending penalty are refused
    pub async fn create(&self, actor: &Actor, item: CreateItem) -> AppResult<Item> {
        item.validate()?;
        check_offer_terms(item.availability_mode, item.price, item.lending_duration_days)?;
        self.users.ensure_active(actor).await?;

        if self.repository.penalties.has_pending_for_borrower(actor.user_id).await? {
            return Err(AppError::Authorization(
                "Settle your pending penalties before listing items".to_string(),
            ));
        }

        let created = self.repository.items.create(actor.user_id, &item).await?;
        tracing::info!(item_id = created.id, owner_id = actor.user_id, mode = %created.availability_mode, "Item listed");
        Ok(created)
    }

    /// Edit listing fields (owner or admin)
    pub async fn update(&self, actor: &Actor, id: i32, data: UpdateItem) -> AppResult<Item> {
        data.validate()?;
        let item = self.repository.items.get_by_id(id).await?;
        actor.require_self_or_admin(item.owner_id, "edit this item")?;

        let changes_terms = data.availability_mode.is_some()
            || data.price.is_some()
            || data.lending_duration_days.is_some();
        if changes_terms && item.status != ItemStatus::Available {
            return Err(AppError::Conflict(format!(
                "Offer terms cannot change while the item is {}",
                item.status
            )));
        }

        let (mode, price, duration) = data.merged_terms(&item)?;
        self.repository.items.update(id, &data, mode, price, duration).await
    }

    /// Delete an item (owner or admin) that never entered a transaction
    pub async fn delete(&self, actor: &Actor, id: i32) -> AppResult<()> {
        let item = self.repository.items.get_by_id(id).await?;
        actor.require_self_or_admin(item.owner_id, "delete this item")?;
        self.repository.items.delete(id).await?;
        tracing::info!(item_id = id, actor_id = actor.user_id, "Item deleted");
        Ok(())
    }

    /// Delete several items at once (admin only)
    pub async fn bulk_delete(&self, actor: &Actor, ids: &[i32]) -> AppResult<BulkDeleteResult> {
        actor.require_admin()?;
        if ids.is_empty() {
            return Err(AppError::Validation("No item ids given".to_string()));
        }

        let deleted = self.repository.items.bulk_delete(ids).await?;
        let skipped = ids.iter().copied().filter(|id| !deleted.contains(id)).collect();

        tracing::info!(admin_id = actor.user_id, deleted = deleted.len(), "Bulk item deletion");
        Ok(BulkDeleteResult { deleted, skipped })
    }
}
