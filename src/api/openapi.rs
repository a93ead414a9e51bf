//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, auth, health, items, messages, penalties, ratings, stats, transactions, users};

/// Registers the `bearer_auth` scheme referenced by secured paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campus Exchange API",
        version = "1.0.0",
        description = "Peer-to-peer lending and selling between students",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&BearerAuth),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Users
        users::get_user,
        users::get_user_ratings,
        stats::get_user_stats,
        // Items
        items::list_items,
        items::get_item,
        items::create_item,
        items::update_item,
        items::delete_item,
        items::request_item,
        // Transactions
        transactions::list_transactions,
        transactions::get_transaction,
        transactions::update_transaction,
        // Penalties
        penalties::list_transaction_penalties,
        penalties::pay_penalty,
        penalties::waive_penalty,
        penalties::my_penalties,
        // Ratings
        ratings::list_transaction_ratings,
        ratings::create_rating,
        ratings::update_rating,
        ratings::delete_rating,
        // Messages
        messages::list_conversations,
        messages::start_conversation,
        messages::list_messages,
        messages::send_message,
        messages::mark_read,
        // Admin
        stats::get_dashboard,
        stats::get_trends,
        admin::list_transactions,
        admin::complete_transaction,
        admin::create_penalty,
        admin::list_penalties,
        admin::waive_penalty,
        admin::delete_rating,
        admin::bulk_delete_items,
        admin::update_user_status,
        admin::export,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Users
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::UserProfile,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUserStatus,
            crate::models::enums::AccountType,
            crate::models::enums::AccountStatus,
            // Items
            crate::models::item::Item,
            crate::models::item::CreateItem,
            crate::models::item::UpdateItem,
            crate::models::enums::AvailabilityMode,
            crate::models::enums::ItemStatus,
            // Transactions
            crate::models::transaction::Transaction,
            crate::models::transaction::TransactionDetails,
            crate::models::transaction::TransactionAction,
            crate::models::transaction::RequestItem,
            crate::models::transaction::UpdateTransaction,
            crate::models::transaction::PartyFilter,
            crate::models::enums::TransactionType,
            crate::models::enums::TransactionStatus,
            crate::services::transactions::ActionOutcome,
            // Penalties
            crate::models::penalty::Penalty,
            crate::models::penalty::WaivePenalty,
            crate::models::penalty::CreatePenalty,
            crate::models::enums::PenaltyStatus,
            // Ratings
            crate::models::rating::Rating,
            crate::models::rating::RatingSummary,
            crate::models::rating::CreateRating,
            crate::models::rating::UpdateRating,
            crate::models::enums::RaterRole,
            // Messages
            crate::models::message::Conversation,
            crate::models::message::ConversationSummary,
            crate::models::message::Message,
            crate::models::message::StartConversation,
            crate::models::message::SendMessage,
            messages::MarkReadResponse,
            // Admin
            admin::BulkDeleteRequest,
            crate::services::items::BulkDeleteResult,
            crate::services::export::ExportResource,
            stats::DashboardStats,
            stats::ItemStats,
            stats::TransactionStats,
            stats::PenaltyStats,
            stats::RatingStats,
            stats::StatEntry,
            stats::AmountEntry,
            stats::Interval,
            stats::TimeSeriesEntry,
            stats::TrendsResponse,
            stats::UserStats,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and authentication"),
        (name = "users", description = "Public profiles, ratings and statistics"),
        (name = "items", description = "Item listings"),
        (name = "transactions", description = "Lending and selling lifecycle"),
        (name = "penalties", description = "Late return penalties"),
        (name = "ratings", description = "Ratings between parties"),
        (name = "messages", description = "Conversations between users"),
        (name = "admin", description = "Back-office")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
