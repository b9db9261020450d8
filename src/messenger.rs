use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ParseMode};

use crate::error::BotError;

/// Outbound side of a chat: what handlers need to talk back to the user.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a Markdown-formatted reply and return the new message's id.
    async fn reply(&self, chat_id: ChatId, text: &str) -> Result<MessageId, BotError>;

    async fn delete(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), BotError>;
}

#[async_trait]
impl Messenger for Bot {
    // Replies use the legacy Markdown flavour (`*bold*`, `_italic_`).
    #[allow(deprecated)]
    async fn reply(&self, chat_id: ChatId, text: &str) -> Result<MessageId, BotError> {
        let sent = self
            .send_message(chat_id, text)
            .parse_mode(ParseMode::Markdown)
            .await?;
        Ok(sent.id)
    }

    async fn delete(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), BotError> {
        self.delete_message(chat_id, message_id).await?;
        Ok(())
    }
}
