//! User model, JWT claims and the request actor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::{AccountStatus, AccountType};
use crate::error::AppError;

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub login: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub account_type: AccountType,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Short user representation embedded in other resources
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub login: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

/// Public profile with the rating summary
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: UserShort,
    pub member_since: DateTime<Utc>,
    pub ratings_count: i64,
    pub average_rating: Option<f64>,
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 64, message = "Login must be 3 to 64 characters"))]
    pub login: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

/// Account status change (admin only)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserStatus {
    pub status: AccountStatus,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub account_type: AccountType,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            account_type: self.account_type,
        }
    }
}

/// The authenticated user on whose behalf an operation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub account_type: AccountType,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.account_type == AccountType::Admin
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Require the actor to be `user_id` or an admin
    pub fn require_self_or_admin(&self, user_id: i32, what: &str) -> Result<(), AppError> {
        if self.user_id == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization(format!("Only the owner may {}", what)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(account_type: AccountType) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "alice".to_string(),
            user_id: 7,
            account_type,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let token = claims(AccountType::Student).create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 7);
        assert_eq!(parsed.account_type, AccountType::Student);
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_actor_rights() {
        let student = claims(AccountType::Student).actor();
        assert!(student.require_admin().is_err());
        assert!(student.require_self_or_admin(7, "edit").is_ok());
        assert!(student.require_self_or_admin(8, "edit").is_err());

        let admin = claims(AccountType::Admin).actor();
        assert!(admin.require_admin().is_ok());
        assert!(admin.require_self_or_admin(8, "edit").is_ok());
    }
}
