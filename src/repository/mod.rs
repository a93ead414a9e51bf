//! Repository layer for database operations

pub mod items;
pub mod messages;
pub mod penalties;
pub mod ratings;
pub mod transactions;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub items: items::ItemsRepository,
    pub transactions: transactions::TransactionsRepository,
    pub penalties: penalties::PenaltiesRepository,
    pub ratings: ratings::RatingsRepository,
    pub messages: messages::MessagesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            items: items::ItemsRepository::new(pool.clone()),
            transactions: transactions::TransactionsRepository::new(pool.clone()),
            penalties: penalties::PenaltiesRepository::new(pool.clone()),
            ratings: ratings::RatingsRepository::new(pool.clone()),
            messages: messages::MessagesRepository::new(pool.clone()),
            pool,
        }
    }
}
