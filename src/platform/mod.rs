pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::types::ParseMode;

/// A post fetched from the source channel
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Message id, unique within the source chat
    pub id: String,
    /// Chat the post originated from
    pub chat_id: i64,
    /// Text body; None for media-only posts
    pub text: Option<String>,
}

/// A rendered post ready to be published
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
    pub parse_mode: ParseMode,
}

/// Source of candidate messages for one pipeline run
#[async_trait]
pub trait InboundTransport: Send + Sync {
    /// Fetch a bounded batch of recent messages. An error aborts the run.
    async fn fetch_recent(&self) -> Result<Vec<InboundMessage>>;
}

/// Destination for formatted deals
#[async_trait]
pub trait OutboundTransport: Send + Sync {
    /// Returns Ok only once the platform has confirmed delivery.
    async fn send(&self, message: &OutboundMessage) -> Result<()>;
}
