//! Campus Exchange
//!
//! REST JSON server for lending and selling items between students:
//! listings, a transaction lifecycle with late-return penalties, ratings
//! between parties, messaging and an admin back-office.

use std::sync::Arc;

use sqlx::PgPool;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    /// Pinged by `/ready`
    pub db: PgPool,
}
