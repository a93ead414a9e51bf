//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        enums::{AccountStatus, AccountType},
        user::{Actor, CreateUser, User, UserClaims, UserProfile},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a student account
    pub async fn register(&self, user: CreateUser) -> AppResult<User> {
        user.validate()?;

        if self.repository.users.login_exists(&user.login).await? {
            return Err(AppError::Conflict("Login already exists".to_string()));
        }

        let hash = self.hash_password(&user.password)?;
        let created = self
            .repository
            .users
            .create(&user, &hash, AccountType::Student)
            .await?;

        tracing::info!(user_id = created.id, login = %created.login, "User registered");
        Ok(created)
    }

    /// Authenticate user by login and return (JWT token, user)
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_login(login)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid login or password".to_string()))?;

        if user.status == AccountStatus::Blocked {
            return Err(AppError::Authentication("Account is blocked".to_string()));
        }

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid login or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.login.clone(),
            user_id: user.id,
            account_type: user.account_type,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        if let Some(ref hash) = user.password {
            let parsed_hash = PasswordHash::new(hash)
                .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
            return Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok());
        }

        Ok(false)
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn get_profile(&self, id: i32) -> AppResult<UserProfile> {
        self.repository.users.get_profile(id).await
    }

    /// Refuse blocked accounts whose token is still valid
    pub async fn ensure_active(&self, actor: &Actor) -> AppResult<()> {
        let user = self.repository.users.get_by_id(actor.user_id).await?;
        if user.status == AccountStatus::Blocked {
            return Err(AppError::Authorization("Account is blocked".to_string()));
        }
        Ok(())
    }

    /// Block or unblock a user (admin only)
    pub async fn set_status(&self, actor: &Actor, user_id: i32, status: AccountStatus) -> AppResult<User> {
        actor.require_admin()?;
        if actor.user_id == user_id {
            return Err(AppError::BusinessRule("You cannot change your own status".to_string()));
        }
        let user = self.repository.users.update_status(user_id, status).await?;
        tracing::info!(admin_id = actor.user_id, user_id, %status, "User status changed");
        Ok(user)
    }

    /// Create the configured administrator when no admin exists yet
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<()> {
        let (Some(login), Some(password)) = (
            self.config.bootstrap_admin_login.as_ref(),
            self.config.bootstrap_admin_password.as_ref(),
        ) else {
            return Ok(());
        };

        if self.repository.users.count_admins().await? > 0 {
            return Ok(());
        }

        let request = CreateUser {
            login: login.clone(),
            password: password.clone(),
            firstname: None,
            lastname: None,
            email: None,
        };
        let hash = self.hash_password(&request.password)?;
        let admin = self
            .repository
            .users
            .create(&request, &hash, AccountType::Admin)
            .await?;

        tracing::warn!(user_id = admin.id, login = %admin.login, "Bootstrap administrator created");
        Ok(())
    }
}
