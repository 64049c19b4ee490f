use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, Recipient};
use tracing::debug;

use common::{ChatTarget, Error, Notifier, Result};

/// `Notifier` backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn recipient(channel: &ChatTarget) -> Recipient {
    match channel {
        ChatTarget::Id(id) => Recipient::Id(ChatId(*id)),
        ChatTarget::Username(name) => Recipient::ChannelUsername(name.clone()),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_sticker(&self, channel: &ChatTarget, sticker_id: &str) -> Result<()> {
        debug!(channel = %channel, "Sending sticker");
        self.bot
            .send_sticker(recipient(channel), InputFile::file_id(sticker_id))
            .await
            .map(|_| ())
            .map_err(|e| Error::Dispatch(format!("sticker to {channel}: {e}")))
    }

    async fn send_message(&self, channel: &ChatTarget, text: &str) -> Result<()> {
        debug!(channel = %channel, len = text.len(), "Sending message");
        self.bot
            .send_message(recipient(channel), text)
            .await
            .map(|_| ())
            .map_err(|e| Error::Dispatch(format!("message to {channel}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_targets_map_to_recipients() {
        assert_eq!(recipient(&ChatTarget::Id(-100_42)), Recipient::Id(ChatId(-100_42)));
        assert_eq!(
            recipient(&ChatTarget::Username("@vip".into())),
            Recipient::ChannelUsername("@vip".into())
        );
    }
}
