//! Transactions repository
//!
//! Every status change is written together with the item status and the
//! automatic penalty in a single database transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{ItemStatus, TransactionType},
        item::Item,
        penalty::{penalty_amount, Penalty},
        transaction::{
            check_request, PartyFilter, RequestItem, Transaction, TransactionAction,
            TransactionDetails, TransactionQuery,
        },
        user::Actor,
    },
};

use super::penalties;

const DETAILS_SELECT: &str =
    "SELECT t.*, i.title AS item_title FROM transactions t JOIN items i ON i.id = t.item_id";

#[derive(Clone)]
pub struct TransactionsRepository {
    pool: Pool<Postgres>,
}

impl TransactionsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Transaction> {
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction with id {} not found", id)))
    }

    pub async fn get_details(&self, id: i32) -> AppResult<TransactionDetails> {
        let q = format!("{} WHERE t.id = $1", DETAILS_SELECT);
        sqlx::query_as::<_, TransactionDetails>(&q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|d| d.with_overdue(Utc::now()))
            .ok_or_else(|| AppError::NotFound(format!("Transaction with id {} not found", id)))
    }

    /// List transactions; `participant` restricts to one user's transactions
    pub async fn list(
        &self,
        query: &TransactionQuery,
        participant: Option<i32>,
        per_page: i64,
        offset: i64,
    ) -> AppResult<(Vec<TransactionDetails>, i64)> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if participant.is_some() {
            let clause = match query.role {
                Some(PartyFilter::Borrower) => format!("t.borrower_id = ${}", idx),
                Some(PartyFilter::Owner) => format!("t.owner_id = ${}", idx),
                None => format!("(t.borrower_id = ${0} OR t.owner_id = ${0})", idx),
            };
            conditions.push(clause);
            idx += 1;
        }
        if query.status.is_some() {
            conditions.push(format!("t.status = ${}", idx));
            idx += 1;
        }
        if query.kind.is_some() {
            conditions.push(format!("t.kind = ${}", idx));
            idx += 1;
        }
        if query.item_id.is_some() {
            conditions.push(format!("t.item_id = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_q = format!("SELECT COUNT(*) FROM transactions t {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(p) = participant { count_builder = count_builder.bind(p); }
        if let Some(s) = query.status { count_builder = count_builder.bind(s); }
        if let Some(k) = query.kind { count_builder = count_builder.bind(k); }
        if let Some(i) = query.item_id { count_builder = count_builder.bind(i); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "{} {} ORDER BY t.created_at DESC, t.id DESC LIMIT {} OFFSET {}",
            DETAILS_SELECT, where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, TransactionDetails>(&select_q);
        if let Some(p) = participant { builder = builder.bind(p); }
        if let Some(s) = query.status { builder = builder.bind(s); }
        if let Some(k) = query.kind { builder = builder.bind(k); }
        if let Some(i) = query.item_id { builder = builder.bind(i); }

        let now = Utc::now();
        let rows = builder
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|d| d.with_overdue(now))
            .collect();
        Ok((rows, total))
    }

    /// Open a pending transaction on an item and reserve the item
    pub async fn request(&self, item_id: i32, actor: &Actor, request: &RequestItem) -> AppResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 FOR UPDATE")
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;

        let has_pending = penalties::borrower_has_pending(&mut *tx, actor.user_id).await?;
        check_request(&item, actor, request.kind, has_pending)?;

        let final_price = match request.kind {
            TransactionType::Sell => item.price,
            TransactionType::Lend => None,
        };

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (item_id, borrower_id, owner_id, kind, deposit_amount, final_price, message)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(item.id)
        .bind(actor.user_id)
        .bind(item.owner_id)
        .bind(request.kind)
        .bind(request.deposit_amount)
        .bind(final_price)
        .bind(&request.message)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "Item already has an open transaction"))?;

        sqlx::query("UPDATE items SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(ItemStatus::Reserved)
            .bind(item.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(transaction)
    }

    /// Plan and apply `action`, returning the updated transaction and the
    /// penalty created by a late return
    pub async fn apply_action(
        &self,
        id: i32,
        action: TransactionAction,
        actor: &Actor,
        penalty_rate: Decimal,
        now: DateTime<Utc>,
    ) -> AppResult<(Transaction, Option<Penalty>)> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction with id {} not found", id)))?;

        let lending_duration_days: Option<i32> =
            sqlx::query_scalar("SELECT lending_duration_days FROM items WHERE id = $1")
                .bind(current.item_id)
                .fetch_one(&mut *tx)
                .await?;

        let transition = current.plan(action, actor, lending_duration_days, now)?;

        let updated = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions SET
                status = $2,
                start_date = COALESCE($3, start_date),
                due_date = COALESCE($4, due_date),
                return_date = COALESCE($5, return_date),
                updated_at = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(transition.status)
        .bind(transition.start_date)
        .bind(transition.due_date)
        .bind(transition.return_date)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(item_status) = transition.item_status {
            sqlx::query("UPDATE items SET status = $1, updated_at = $2 WHERE id = $3")
                .bind(item_status)
                .bind(now)
                .bind(current.item_id)
                .execute(&mut *tx)
                .await?;
        }

        let penalty = match transition.days_late {
            Some(days) => {
                let days_i32 = i32::try_from(days)
                    .map_err(|_| AppError::Internal(format!("days_late out of range: {}", days)))?;
                penalties::insert_auto(&mut *tx, id, days_i32, penalty_amount(days, penalty_rate)).await?
            }
            None => None,
        };

        tx.commit().await?;
        Ok((updated, penalty))
    }

    /// All transactions, oldest first (CSV export)
    pub async fn list_all(&self) -> AppResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
