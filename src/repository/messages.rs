//! Conversations and messages repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::message::{ordered_pair, Conversation, ConversationSummary, Message},
};

#[derive(Clone)]
pub struct MessagesRepository {
    pool: Pool<Postgres>,
}

impl MessagesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_conversation(&self, id: i32) -> AppResult<Conversation> {
        sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Conversation with id {} not found", id)))
    }

    /// Return the conversation between two users, creating it when missing
    pub async fn find_or_create(&self, a: i32, b: i32, item_id: Option<i32>) -> AppResult<Conversation> {
        let (user_a, user_b) = ordered_pair(a, b);
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (user_a_id, user_b_id, item_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_a_id, user_b_id)
            DO UPDATE SET item_id = COALESCE(EXCLUDED.item_id, conversations.item_id)
            RETURNING *
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(conversation)
    }

    /// Conversations of a user with unread counts, most recent first
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<ConversationSummary>> {
        let rows = sqlx::query_as::<_, ConversationSummary>(
            r#"
            SELECT c.*,
                   (SELECT MAX(m.created_at) FROM messages m WHERE m.conversation_id = c.id) AS last_message_at,
                   (SELECT COUNT(*) FROM messages m
                     WHERE m.conversation_id = c.id AND m.sender_id <> $1 AND m.read_at IS NULL) AS unread_count
            FROM conversations c
            WHERE c.user_a_id = $1 OR c.user_b_id = $1
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_messages(&self, conversation_id: i32, limit: i64, offset: i64) -> AppResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE conversation_id = $1 ORDER BY created_at, id LIMIT $2 OFFSET $3",
        )
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Append a message and bump the conversation
    pub async fn create_message(&self, conversation_id: i32, sender_id: i32, body: &str) -> AppResult<Message> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            "INSERT INTO messages (conversation_id, sender_id, body) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(body)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// Mark messages sent by the other participant as read
    pub async fn mark_read(&self, conversation_id: i32, reader_id: i32) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET read_at = NOW() WHERE conversation_id = $1 AND sender_id <> $2 AND read_at IS NULL",
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
