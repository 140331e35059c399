use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use teloxide::types::ParseMode;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::affiliate::AffiliateResolver;
use crate::config::Config;
use crate::formatter::format_deal;
use crate::parser;
use crate::platform::{InboundMessage, InboundTransport, OutboundMessage, OutboundTransport};
use crate::store::DedupStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoText,
    Duplicate,
    NoMatch,
}

/// Terminal state of one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    /// Publish was rejected; the id stays unrecorded so the next run retries it
    Failed,
    Recorded { used_fallback: bool },
}

/// Per-run tally, logged when the run ends
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub fetched: usize,
    /// Messages from chats other than the source chat
    pub ignored: usize,
    pub skipped: usize,
    pub failed: usize,
    pub recorded: usize,
    pub fallbacks: usize,
}

impl RunReport {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            fetched: 0,
            ignored: 0,
            skipped: 0,
            failed: 0,
            recorded: 0,
            fallbacks: 0,
        }
    }

    fn tally(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Recorded { used_fallback } => {
                self.recorded += 1;
                if used_fallback {
                    self.fallbacks += 1;
                }
            }
        }
    }
}

/// Parse → dedupe → resolve → format → publish → record, for one source
/// chat and one target chat.
///
/// Runs must not overlap on the same store; see `scheduler::RunGuard`.
pub struct Pipeline {
    source_chat_id: i64,
    target_chat_id: i64,
    store: Box<dyn DedupStore>,
    resolver: AffiliateResolver,
    outbound: Arc<dyn OutboundTransport>,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        store: Box<dyn DedupStore>,
        outbound: Arc<dyn OutboundTransport>,
    ) -> Result<Self> {
        Ok(Self {
            source_chat_id: config.telegram.source_chat_id,
            target_chat_id: config.telegram.target_chat_id,
            store,
            resolver: AffiliateResolver::new(&config.affiliate)?,
            outbound,
        })
    }

    /// Fetch one batch and process every candidate from the source chat.
    ///
    /// Fails only on fetch or store errors; anything recorded before the
    /// failure stays recorded.
    pub async fn run(&self, inbound: &dyn InboundTransport) -> Result<RunReport> {
        let mut report = RunReport::new();
        info!(
            "Run {} started at {}",
            report.run_id,
            report.started_at.to_rfc3339()
        );

        let batch = inbound
            .fetch_recent()
            .await
            .context("Failed to fetch candidate messages")?;
        report.fetched = batch.len();

        for message in &batch {
            if message.chat_id != self.source_chat_id {
                debug!(
                    "Ignoring message {} from chat {}",
                    message.id, message.chat_id
                );
                report.ignored += 1;
                continue;
            }

            let outcome = self.process(message).await?;
            if let Outcome::Skipped(reason) = outcome {
                debug!("Message {} skipped: {:?}", message.id, reason);
            }
            report.tally(outcome);
        }

        info!(
            "Run {} finished: fetched={}, ignored={}, skipped={}, failed={}, recorded={} ({} with original link)",
            report.run_id,
            report.fetched,
            report.ignored,
            report.skipped,
            report.failed,
            report.recorded,
            report.fallbacks
        );
        Ok(report)
    }

    /// Take one candidate to a terminal outcome.
    ///
    /// The id is written to the store strictly after the send is confirmed.
    /// A crash between the two republishes the post on the next run.
    pub async fn process(&self, message: &InboundMessage) -> Result<Outcome> {
        let id = message.id.as_str();

        let Some(text) = message.text.as_deref().filter(|t| !t.trim().is_empty()) else {
            debug!("Message {} has no text, skipping", id);
            return Ok(Outcome::Skipped(SkipReason::NoText));
        };

        if self
            .store
            .contains(id)
            .await
            .with_context(|| format!("Failed to check dedup store for message {}", id))?
        {
            info!("Skipping already processed message {}", id);
            return Ok(Outcome::Skipped(SkipReason::Duplicate));
        }

        let Some(deal) = parser::parse(text) else {
            warn!("Message {} did not match the deal pattern", id);
            return Ok(Outcome::Skipped(SkipReason::NoMatch));
        };

        info!("Extracted from message {}: {}", id, deal.product_name);

        let resolved = self.resolver.resolve(&deal.original_link).await;

        let outbound = OutboundMessage {
            chat_id: self.target_chat_id,
            text: format_deal(&deal, &resolved),
            parse_mode: ParseMode::MarkdownV2,
        };

        if let Err(e) = self.outbound.send(&outbound).await {
            error!(
                "Failed to publish message {} to {}: {:#}",
                id, self.target_chat_id, e
            );
            return Ok(Outcome::Failed);
        }

        info!(
            "Forwarded '{}' (message {}) to {}",
            deal.product_name, id, self.target_chat_id
        );

        self.store
            .add(id)
            .await
            .with_context(|| format!("Failed to record message {} after publishing", id))?;

        Ok(Outcome::Recorded {
            used_fallback: resolved.used_fallback,
        })
    }
}
