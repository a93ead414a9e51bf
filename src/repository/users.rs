//! Users repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{AccountStatus, AccountType},
        user::{CreateUser, User, UserProfile, UserShort},
    },
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn get_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(login) = LOWER($1)")
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn login_exists(&self, login: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(login) = LOWER($1))")
                .bind(login)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Create a user with an already hashed password
    pub async fn create(
        &self,
        user: &CreateUser,
        password_hash: &str,
        account_type: AccountType,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (login, password, firstname, lastname, email, account_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&user.login)
        .bind(password_hash)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.email)
        .bind(account_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "Login already exists"))
    }

    pub async fn update_status(&self, id: i32, status: AccountStatus) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Public profile with received rating summary
    pub async fn get_profile(&self, id: i32) -> AppResult<UserProfile> {
        let user = self.get_by_id(id).await?;

        let (ratings_count, average_rating): (i64, Option<f64>) = sqlx::query_as(
            "SELECT COUNT(*), AVG(rating)::float8 FROM ratings WHERE rated_user_id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserProfile {
            user: UserShort {
                id: user.id,
                login: user.login,
                firstname: user.firstname,
                lastname: user.lastname,
            },
            member_since: user.created_at,
            ratings_count,
            average_rating,
        })
    }

    pub async fn count_admins(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE account_type = 'admin'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
