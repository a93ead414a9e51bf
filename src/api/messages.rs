//! Conversation and message endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::message::{Conversation, ConversationSummary, Message, SendMessage, StartConversation},
};

use super::AuthenticatedUser;

#[derive(Debug, Deserialize, IntoParams)]
pub struct MessagePageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct MarkReadResponse {
    /// Messages newly marked as read
    pub marked: u64,
}

/// List the caller's conversations with unread counts
#[utoipa::path(
    get,
    path = "/conversations",
    tag = "messages",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Conversations, most recent first", body = Vec<ConversationSummary>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_conversations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ConversationSummary>>> {
    let conversations = state.services.messages.list(&claims.actor()).await?;
    Ok(Json(conversations))
}

/// Start (or reuse) a conversation
#[utoipa::path(
    post,
    path = "/conversations",
    tag = "messages",
    security(("bearer_auth" = [])),
    request_body = StartConversation,
    responses(
        (status = 201, description = "Conversation", body = Conversation),
        (status = 404, description = "Recipient or item not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Cannot message yourself", body = crate::error::ErrorResponse)
    )
)]
pub async fn start_conversation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<StartConversation>,
) -> AppResult<(StatusCode, Json<Conversation>)> {
    let conversation = state.services.messages.start(&claims.actor(), request).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// Messages of a conversation, oldest first
#[utoipa::path(
    get,
    path = "/conversations/{id}/messages",
    tag = "messages",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Conversation ID"),
        MessagePageQuery
    ),
    responses(
        (status = 200, description = "Messages", body = Vec<Message>),
        (status = 403, description = "Not a participant", body = crate::error::ErrorResponse),
        (status = 404, description = "Conversation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_messages(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<MessagePageQuery>,
) -> AppResult<Json<Vec<Message>>> {
    let messages = state
        .services
        .messages
        .messages(&claims.actor(), id, query.page, query.per_page)
        .await?;
    Ok(Json(messages))
}

/// Send a message
#[utoipa::path(
    post,
    path = "/conversations/{id}/messages",
    tag = "messages",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Conversation ID")
    ),
    request_body = SendMessage,
    responses(
        (status = 201, description = "Message sent", body = Message),
        (status = 403, description = "Not a participant", body = crate::error::ErrorResponse)
    )
)]
pub async fn send_message(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<SendMessage>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let message = state.services.messages.send(&claims.actor(), id, request).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Mark the other participant's messages as read
#[utoipa::path(
    post,
    path = "/conversations/{id}/read",
    tag = "messages",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Conversation ID")
    ),
    responses(
        (status = 200, description = "Messages marked read", body = MarkReadResponse),
        (status = 403, description = "Not a participant", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_read(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<MarkReadResponse>> {
    let marked = state.services.messages.mark_read(&claims.actor(), id).await?;
    Ok(Json(MarkReadResponse { marked }))
}
