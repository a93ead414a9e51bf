//! Messaging service

use validator::Validate;

use crate::{
    config::ExchangeConfig,
    error::{AppError, AppResult},
    models::{
        message::{Conversation, ConversationSummary, Message, SendMessage, StartConversation},
        user::Actor,
    },
    repository::Repository,
    services::users::UsersService,
};

#[derive(Clone)]
pub struct MessagesService {
    repository: Repository,
    users: UsersService,
    config: ExchangeConfig,
}

impl MessagesService {
    pub fn new(repository: Repository, users: UsersService, config: ExchangeConfig) -> Self {
        Self { repository, users, config }
    }

    /// Open (or reuse) the conversation with another user
    pub async fn start(&self, actor: &Actor, data: StartConversation) -> AppResult<Conversation> {
        data.validate()?;
        if data.recipient_id == actor.user_id {
            return Err(AppError::BusinessRule("You cannot message yourself".to_string()));
        }
        self.users.ensure_active(actor).await?;
        self.repository.users.get_by_id(data.recipient_id).await?;
        if let Some(item_id) = data.item_id {
            self.repository.items.get_by_id(item_id).await?;
        }

        let conversation = self
            .repository
            .messages
            .find_or_create(actor.user_id, data.recipient_id, data.item_id)
            .await?;

        if let Some(ref body) = data.body {
            self.repository
                .messages
                .create_message(conversation.id, actor.user_id, body)
                .await?;
        }
        Ok(conversation)
    }

    pub async fn list(&self, actor: &Actor) -> AppResult<Vec<ConversationSummary>> {
        self.repository.messages.list_for_user(actor.user_id).await
    }

    async fn get_as_participant(&self, actor: &Actor, conversation_id: i32) -> AppResult<Conversation> {
        let conversation = self.repository.messages.get_conversation(conversation_id).await?;
        if !conversation.has_participant(actor.user_id) {
            return Err(AppError::Authorization(
                "Not a participant of this conversation".to_string(),
            ));
        }
        Ok(conversation)
    }

    pub async fn messages(
        &self,
        actor: &Actor,
        conversation_id: i32,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<Vec<Message>> {
        self.get_as_participant(actor, conversation_id).await?;
        let (_, per_page, offset) = self.config.paginate(page, per_page);
        self.repository
            .messages
            .list_messages(conversation_id, per_page, offset)
            .await
    }

    pub async fn send(&self, actor: &Actor, conversation_id: i32, data: SendMessage) -> AppResult<Message> {
        data.validate()?;
        self.users.ensure_active(actor).await?;
        self.get_as_participant(actor, conversation_id).await?;
        self.repository
            .messages
            .create_message(conversation_id, actor.user_id, &data.body)
            .await
    }

    /// Returns the number of messages marked read
    pub async fn mark_read(&self, actor: &Actor, conversation_id: i32) -> AppResult<u64> {
        self.get_as_participant(actor, conversation_id).await?;
        self.repository.messages.mark_read(conversation_id, actor.user_id).await
    }
}
