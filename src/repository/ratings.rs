//! Ratings repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::RaterRole,
        rating::{CreateRating, Rating, UpdateRating},
    },
};

#[derive(Clone)]
pub struct RatingsRepository {
    pool: Pool<Postgres>,
}

impl RatingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Rating> {
        sqlx::query_as::<_, Rating>("SELECT * FROM ratings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rating with id {} not found", id)))
    }

    pub async fn exists(&self, transaction_id: i32, rater_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM ratings WHERE transaction_id = $1 AND rater_id = $2)",
        )
        .bind(transaction_id)
        .bind(rater_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Store a rating; a second rating by the same rater is a conflict
    pub async fn create(
        &self,
        transaction_id: i32,
        rater_id: i32,
        rated_user_id: i32,
        role: RaterRole,
        data: &CreateRating,
    ) -> AppResult<Rating> {
        sqlx::query_as::<_, Rating>(
            r#"
            INSERT INTO ratings (transaction_id, rater_id, rated_user_id, rater_role, rating, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(transaction_id)
        .bind(rater_id)
        .bind(rated_user_id)
        .bind(role)
        .bind(data.rating)
        .bind(&data.comment)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "You have already rated this transaction"))
    }

    pub async fn list_for_transaction(&self, transaction_id: i32) -> AppResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(
            "SELECT * FROM ratings WHERE transaction_id = $1 ORDER BY created_at",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    /// Ratings received by a user, newest first
    pub async fn list_received(&self, user_id: i32) -> AppResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(
            "SELECT * FROM ratings WHERE rated_user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    /// (count, average) of ratings received by a user
    pub async fn summary(&self, user_id: i32) -> AppResult<(i64, Option<f64>)> {
        let row: (i64, Option<f64>) = sqlx::query_as(
            "SELECT COUNT(*), AVG(rating)::float8 FROM ratings WHERE rated_user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update(&self, id: i32, data: &UpdateRating) -> AppResult<Rating> {
        sqlx::query_as::<_, Rating>(
            r#"
            UPDATE ratings SET
                rating = COALESCE($2, rating),
                comment = COALESCE($3, comment),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.rating)
        .bind(&data.comment)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Rating with id {} not found", id)))
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM ratings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Rating with id {} not found", id)));
        }
        Ok(())
    }

    pub async fn list_all(&self) -> AppResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>("SELECT * FROM ratings ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ratings)
    }
}
