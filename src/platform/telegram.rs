use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::payloads::{GetUpdatesSetters, SendMessageSetters};
use teloxide::prelude::*;
use teloxide::types::UpdateKind;
use tracing::{debug, info, warn};

use crate::config::TelegramConfig;
use crate::platform::{InboundMessage, InboundTransport, OutboundMessage, OutboundTransport};

/// Bot API transport used for both reading the source chat and posting to
/// the target chat.
pub struct TelegramTransport {
    bot: Bot,
    fetch_limit: u8,
    poll_timeout_secs: u32,
}

impl TelegramTransport {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            bot: Bot::new(&config.bot_token),
            fetch_limit: config.fetch_limit,
            poll_timeout_secs: config.poll_timeout_secs,
        }
    }
}

/// Map a Bot API update onto a candidate message. Only new posts count;
/// edits and other update kinds are dropped.
fn inbound_from_update(update: Update) -> Option<InboundMessage> {
    let update_id = update.id.0;
    let msg = match update.kind {
        UpdateKind::ChannelPost(msg) | UpdateKind::Message(msg) => msg,
        UpdateKind::Error(_) => {
            warn!("Dropping update {} that could not be parsed", update_id);
            return None;
        }
        _ => return None,
    };

    Some(InboundMessage {
        id: msg.id.0.to_string(),
        chat_id: msg.chat.id.0,
        text: msg.text().map(str::to_string),
    })
}

#[async_trait]
impl InboundTransport for TelegramTransport {
    async fn fetch_recent(&self) -> Result<Vec<InboundMessage>> {
        // A negative offset asks for the last N updates without confirming them
        let updates = self
            .bot
            .get_updates()
            .offset(-i32::from(self.fetch_limit))
            .limit(self.fetch_limit)
            .timeout(self.poll_timeout_secs)
            .await
            .context("Failed to fetch updates from Telegram")?;

        debug!("Telegram returned {} updates", updates.len());

        let messages: Vec<InboundMessage> =
            updates.into_iter().filter_map(inbound_from_update).collect();

        info!("Found {} recent messages to check", messages.len());
        Ok(messages)
    }
}

#[async_trait]
impl OutboundTransport for TelegramTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        self.bot
            .send_message(ChatId(message.chat_id), message.text.clone())
            .parse_mode(message.parse_mode)
            .await
            .with_context(|| format!("Failed to send message to chat {}", message.chat_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Deserialize from text like the Bot API client does; `from_value` cannot
    // hand out borrowed keys and would yield `UpdateKind::Error`.
    fn update(value: serde_json::Value) -> Update {
        serde_json::from_str(&value.to_string()).unwrap()
    }

    #[test]
    fn test_channel_post_becomes_candidate() {
        let upd = update(json!({
            "update_id": 1001,
            "channel_post": {
                "message_id": 42,
                "date": 1_700_000_000,
                "chat": { "id": -1001234567890i64, "type": "channel", "title": "Deals" },
                "sender_chat": { "id": -1001234567890i64, "type": "channel", "title": "Deals" },
                "text": "Product: Wireless Mouse"
            }
        }));
        assert!(matches!(upd.kind, UpdateKind::ChannelPost(_)));

        let msg = inbound_from_update(upd).unwrap();
        assert_eq!(msg.id, "42");
        assert_eq!(msg.chat_id, -1001234567890);
        assert_eq!(msg.text.as_deref(), Some("Product: Wireless Mouse"));
    }

    #[test]
    fn test_group_message_becomes_candidate() {
        let upd = update(json!({
            "update_id": 1002,
            "message": {
                "message_id": 7,
                "date": 1_700_000_000,
                "chat": { "id": -4001, "type": "group", "title": "Deals group" },
                "from": { "id": 99, "is_bot": false, "first_name": "Ann" },
                "text": "hello"
            }
        }));
        assert!(matches!(upd.kind, UpdateKind::Message(_)));

        let msg = inbound_from_update(upd).unwrap();
        assert_eq!(msg.id, "7");
        assert_eq!(msg.chat_id, -4001);
    }

    #[test]
    fn test_edited_post_is_dropped() {
        let upd = update(json!({
            "update_id": 1003,
            "edited_channel_post": {
                "message_id": 42,
                "date": 1_700_000_000,
                "edit_date": 1_700_000_100,
                "chat": { "id": -1001234567890i64, "type": "channel", "title": "Deals" },
                "text": "edited"
            }
        }));
        assert!(matches!(upd.kind, UpdateKind::EditedChannelPost(_)));

        assert!(inbound_from_update(upd).is_none());
    }

    #[test]
    fn test_unparseable_update_is_dropped() {
        let upd = update(json!({
            "update_id": 1004,
            "channel_post": { "message_id": "not-a-number" }
        }));
        assert!(matches!(upd.kind, UpdateKind::Error(_)));

        assert!(inbound_from_update(upd).is_none());
    }
}
