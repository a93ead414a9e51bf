//! Conversation and message models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Conversation between two users, stored with `user_a_id < user_b_id`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Conversation {
    pub id: i32,
    pub user_a_id: i32,
    pub user_b_id: i32,
    /// Item the conversation started about, if any
    pub item_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: i32) -> bool {
        self.user_a_id == user_id || self.user_b_id == user_id
    }

    pub fn other_participant(&self, user_id: i32) -> i32 {
        if self.user_a_id == user_id {
            self.user_b_id
        } else {
            self.user_a_id
        }
    }
}

/// Order a user pair the way conversations are keyed
pub fn ordered_pair(a: i32, b: i32) -> (i32, i32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Conversation list entry for the current user
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ConversationSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub conversation: Conversation,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Message {
    pub id: i32,
    pub conversation_id: i32,
    pub sender_id: i32,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Start a conversation with another user
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartConversation {
    pub recipient_id: i32,
    pub item_id: Option<i32>,
    /// Optional first message
    #[validate(length(min = 1, max = 2000))]
    pub body: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendMessage {
    #[validate(length(min = 1, max = 2000, message = "Message must be 1 to 2000 characters"))]
    pub body: String,
}
