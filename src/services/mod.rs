//! Business logic services

pub mod export;
pub mod items;
pub mod messages;
pub mod penalties;
pub mod ratings;
pub mod stats;
pub mod transactions;
pub mod users;

use crate::{
    config::{AuthConfig, ExchangeConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub items: items::ItemsService,
    pub transactions: transactions::TransactionsService,
    pub penalties: penalties::PenaltiesService,
    pub ratings: ratings::RatingsService,
    pub messages: messages::MessagesService,
    pub stats: stats::StatsService,
    pub export: export::ExportService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig, exchange_config: ExchangeConfig) -> Self {
        let users = users::UsersService::new(repository.clone(), auth_config);
        Self {
            items: items::ItemsService::new(repository.clone(), users.clone(), exchange_config.clone()),
            transactions: transactions::TransactionsService::new(
                repository.clone(),
                users.clone(),
                exchange_config.clone(),
            ),
            penalties: penalties::PenaltiesService::new(
                repository.clone(),
                users.clone(),
                exchange_config.clone(),
            ),
            ratings: ratings::RatingsService::new(repository.clone(), users.clone()),
            messages: messages::MessagesService::new(repository.clone(), users.clone(), exchange_config),
            stats: stats::StatsService::new(repository.clone()),
            export: export::ExportService::new(repository),
            users,
        }
    }
}
