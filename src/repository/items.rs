//! Items repository

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::AvailabilityMode,
        item::{CreateItem, Item, ItemQuery, UpdateItem},
    },
};

const TRANSACTION_EXISTS: &str =
    "EXISTS (SELECT 1 FROM transactions t WHERE t.item_id = items.id)";

/// `ILIKE` pattern matching `q` anywhere, with `%`, `_` and `\` taken literally
fn contains_pattern(q: &str) -> String {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[derive(Clone)]
pub struct ItemsRepository {
    pool: Pool<Postgres>,
}

impl ItemsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get item by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Item> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    /// Search items with filters and pagination
    pub async fn search(&self, query: &ItemQuery, per_page: i64, offset: i64) -> AppResult<(Vec<Item>, i64)> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.q.is_some() {
            conditions.push(format!("(title ILIKE ${0} OR description ILIKE ${0})", idx));
            idx += 1;
        }
        if query.status.is_some() {
            conditions.push(format!("status = ${}", idx));
            idx += 1;
        }
        if query.availability_mode.is_some() {
            conditions.push(format!("availability_mode = ${}", idx));
            idx += 1;
        }
        if query.owner_id.is_some() {
            conditions.push(format!("owner_id = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let pattern = query.q.as_deref().map(contains_pattern);

        let count_q = format!("SELECT COUNT(*) FROM items {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(ref p) = pattern { count_builder = count_builder.bind(p); }
        if let Some(s) = query.status { count_builder = count_builder.bind(s); }
        if let Some(m) = query.availability_mode { count_builder = count_builder.bind(m); }
        if let Some(o) = query.owner_id { count_builder = count_builder.bind(o); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "SELECT * FROM items {} ORDER BY created_at DESC, id DESC LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, Item>(&select_q);
        if let Some(ref p) = pattern { builder = builder.bind(p); }
        if let Some(s) = query.status { builder = builder.bind(s); }
        if let Some(m) = query.availability_mode { builder = builder.bind(m); }
        if let Some(o) = query.owner_id { builder = builder.bind(o); }

        let items = builder.fetch_all(&self.pool).await?;
        Ok((items, total))
    }

    /// Create an item, always `available`
    pub async fn create(&self, owner_id: i32, item: &CreateItem) -> AppResult<Item> {
        let row = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (
                owner_id, title, description, availability_mode,
                price, lending_duration_days, pickup_location
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.availability_mode)
        .bind(item.price)
        .bind(item.lending_duration_days)
        .bind(&item.pickup_location)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update listing fields; the offer terms are already merged and checked
    pub async fn update(
        &self,
        id: i32,
        data: &UpdateItem,
        mode: AvailabilityMode,
        price: Option<Decimal>,
        lending_duration_days: Option<i32>,
    ) -> AppResult<Item> {
        sqlx::query_as::<_, Item>(
            r#"
            UPDATE items SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                pickup_location = COALESCE($4, pickup_location),
                availability_mode = $5,
                price = $6,
                lending_duration_days = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.pickup_location)
        .bind(mode)
        .bind(price)
        .bind(lending_duration_days)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    /// Delete an item that was never part of a transaction
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let q = format!("DELETE FROM items WHERE id = $1 AND NOT {}", TRANSACTION_EXISTS);
        let result = sqlx::query(&q)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::conflict_on_foreign_key(e, "Item has transaction history"))?;

        if result.rows_affected() == 0 {
            // Either missing or referenced by a transaction
            self.get_by_id(id).await?;
            return Err(AppError::Conflict(
                "Item has transaction history and cannot be deleted".to_string(),
            ));
        }
        Ok(())
    }

    /// Delete several items, returning the ids actually deleted
    pub async fn bulk_delete(&self, ids: &[i32]) -> AppResult<Vec<i32>> {
        let q = format!(
            "DELETE FROM items WHERE id = ANY($1) AND NOT {} RETURNING id",
            TRANSACTION_EXISTS
        );
        let deleted: Vec<i32> = sqlx::query_scalar(&q)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::conflict_on_foreign_key(e, "An item gained transaction history"))?;
        Ok(deleted)
    }

    /// All items, oldest first (CSV export)
    pub async fn list_all(&self) -> AppResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>("SELECT * FROM items ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("calc"), "%calc%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }
}
