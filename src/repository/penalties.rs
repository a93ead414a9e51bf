//! Penalties repository

use rust_decimal::Decimal;
use sqlx::{PgExecutor, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::PenaltyStatus,
        penalty::{Penalty, PenaltyQuery},
    },
};

/// Whether `user_id` owes any pending penalty as a borrower
pub(crate) async fn borrower_has_pending<'e, E>(executor: E, user_id: i32) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM penalties p
            JOIN transactions t ON t.id = p.transaction_id
            WHERE t.borrower_id = $1 AND p.status = 'pending'
        )
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}

/// Insert the automatic penalty of a late return; a second one is ignored
pub(crate) async fn insert_auto<'e, E>(
    executor: E,
    transaction_id: i32,
    days_late: i32,
    amount: Decimal,
) -> Result<Option<Penalty>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Penalty>(
        r#"
        INSERT INTO penalties (transaction_id, days_late, amount, auto_created)
        VALUES ($1, $2, $3, TRUE)
        ON CONFLICT (transaction_id) WHERE auto_created DO NOTHING
        RETURNING *
        "#,
    )
    .bind(transaction_id)
    .bind(days_late)
    .bind(amount)
    .fetch_optional(executor)
    .await
}

#[derive(Clone)]
pub struct PenaltiesRepository {
    pool: Pool<Postgres>,
}

impl PenaltiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Penalty> {
        sqlx::query_as::<_, Penalty>("SELECT * FROM penalties WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Penalty with id {} not found", id)))
    }

    pub async fn list_for_transaction(&self, transaction_id: i32) -> AppResult<Vec<Penalty>> {
        let penalties = sqlx::query_as::<_, Penalty>(
            "SELECT * FROM penalties WHERE transaction_id = $1 ORDER BY created_at",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(penalties)
    }

    /// Penalties on transactions where `user_id` is the borrower
    pub async fn list_for_borrower(&self, user_id: i32) -> AppResult<Vec<Penalty>> {
        let penalties = sqlx::query_as::<_, Penalty>(
            r#"
            SELECT p.* FROM penalties p
            JOIN transactions t ON t.id = p.transaction_id
            WHERE t.borrower_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(penalties)
    }

    /// Admin listing with filters and pagination
    pub async fn list(&self, query: &PenaltyQuery, per_page: i64, offset: i64) -> AppResult<(Vec<Penalty>, i64)> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.status.is_some() {
            conditions.push(format!("p.status = ${}", idx));
            idx += 1;
        }
        if query.borrower_id.is_some() {
            conditions.push(format!("t.borrower_id = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let from = "FROM penalties p JOIN transactions t ON t.id = p.transaction_id";

        let count_q = format!("SELECT COUNT(*) {} {}", from, where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(s) = query.status { count_builder = count_builder.bind(s); }
        if let Some(b) = query.borrower_id { count_builder = count_builder.bind(b); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "SELECT p.* {} {} ORDER BY p.created_at DESC, p.id DESC LIMIT {} OFFSET {}",
            from, where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, Penalty>(&select_q);
        if let Some(s) = query.status { builder = builder.bind(s); }
        if let Some(b) = query.borrower_id { builder = builder.bind(b); }

        Ok((builder.fetch_all(&self.pool).await?, total))
    }

    pub async fn has_pending_for_borrower(&self, user_id: i32) -> AppResult<bool> {
        Ok(borrower_has_pending(&self.pool, user_id).await?)
    }

    /// Penalty created by an administrator
    pub async fn create_manual(
        &self,
        transaction_id: i32,
        days_late: i32,
        amount: Decimal,
        reason: &str,
    ) -> AppResult<Penalty> {
        let penalty = sqlx::query_as::<_, Penalty>(
            r#"
            INSERT INTO penalties (transaction_id, days_late, amount, auto_created, reason)
            VALUES ($1, $2, $3, FALSE, $4)
            RETURNING *
            "#,
        )
        .bind(transaction_id)
        .bind(days_late)
        .bind(amount)
        .bind(reason)
        .fetch_one(&self.pool)
        .await?;
        Ok(penalty)
    }

    /// Move a pending penalty to `status`; conflicts when it is already resolved
    pub async fn resolve(&self, id: i32, status: PenaltyStatus, reason: Option<&str>) -> AppResult<Penalty> {
        let updated = sqlx::query_as::<_, Penalty>(
            r#"
            UPDATE penalties
            SET status = $2, reason = COALESCE($3, reason), resolved_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(penalty) => Ok(penalty),
            None => {
                let current = self.get_by_id(id).await?;
                current.ensure_pending()?;
                Err(AppError::Conflict(format!("Penalty {} changed concurrently", id)))
            }
        }
    }

    pub async fn list_all(&self) -> AppResult<Vec<Penalty>> {
        let penalties = sqlx::query_as::<_, Penalty>("SELECT * FROM penalties ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(penalties)
    }
}
