//! Campus Exchange Server

use anyhow::Context;
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_exchange_server::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.logging);

    tracing::info!("Starting Campus Exchange Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    let repository = Repository::new(pool.clone());
    let services = Services::new(repository, config.auth.clone(), config.exchange.clone());

    services
        .users
        .ensure_bootstrap_admin()
        .await
        .context("Failed to create bootstrap administrator")?;

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
        db: pool,
    };

    let app = create_router(state);

    let addr = SocketAddr::new(
        server_host.parse().context("Invalid host address")?,
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Pretty or JSON output, RUST_LOG wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("campus_exchange_server={},tower_http=debug", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        // Users
        .route("/users/:id", get(api::users::get_user))
        .route("/users/:id/ratings", get(api::users::get_user_ratings))
        .route("/users/:id/stats", get(api::stats::get_user_stats))
        // Items
        .route("/items", get(api::items::list_items).post(api::items::create_item))
        .route(
            "/items/:id",
            get(api::items::get_item)
                .patch(api::items::update_item)
                .delete(api::items::delete_item),
        )
        .route("/items/:id/request", post(api::items::request_item))
        // Transactions
        .route("/transactions", get(api::transactions::list_transactions))
        .route(
            "/transactions/:id",
            get(api::transactions::get_transaction).patch(api::transactions::update_transaction),
        )
        .route(
            "/transactions/:id/penalties",
            get(api::penalties::list_transaction_penalties),
        )
        .route(
            "/transactions/:id/penalties/:penalty_id/pay",
            post(api::penalties::pay_penalty),
        )
        .route(
            "/transactions/:id/penalties/:penalty_id/waive",
            post(api::penalties::waive_penalty),
        )
        .route(
            "/transactions/:id/ratings",
            get(api::ratings::list_transaction_ratings).post(api::ratings::create_rating),
        )
        // Ratings
        .route(
            "/ratings/:id",
            patch(api::ratings::update_rating).delete(api::ratings::delete_rating),
        )
        // Penalties
        .route("/penalties/me", get(api::penalties::my_penalties))
        // Messages
        .route(
            "/conversations",
            get(api::messages::list_conversations).post(api::messages::start_conversation),
        )
        .route(
            "/conversations/:id/messages",
            get(api::messages::list_messages).post(api::messages::send_message),
        )
        .route("/conversations/:id/read", post(api::messages::mark_read))
        // Admin
        .route("/admin/stats", get(api::stats::get_dashboard))
        .route("/admin/stats/trends", get(api::stats::get_trends))
        .route("/admin/transactions", get(api::admin::list_transactions))
        .route(
            "/admin/transactions/:id/complete",
            post(api::admin::complete_transaction),
        )
        .route(
            "/admin/transactions/:id/penalties",
            post(api::admin::create_penalty),
        )
        .route("/admin/penalties", get(api::admin::list_penalties))
        .route("/admin/penalties/:id/waive", post(api::admin::waive_penalty))
        .route("/admin/ratings/:id", delete(api::admin::delete_rating))
        .route("/admin/items/bulk-delete", post(api::admin::bulk_delete_items))
        .route("/admin/users/:id/status", put(api::admin::update_user_status))
        .route("/admin/export/:resource", get(api::admin::export))
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
