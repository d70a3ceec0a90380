use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ChatId;

use common::{Error, NotificationSink, Result};

/// Delivers notification text to a Telegram chat.
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn deliver(&self, destination: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(destination), text)
            .await
            .map_err(|e| Error::NotificationDeliveryFailed(e.to_string()))?;
        Ok(())
    }
}
