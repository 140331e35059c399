mod affiliate;
mod config;
mod formatter;
mod parser;
mod pipeline;
mod platform;
mod scheduler;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::platform::telegram::TelegramTransport;
use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dealbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; an explicit path must exist, the default may not
    let explicit_path = std::env::args().nth(1).map(PathBuf::from);
    let config_path = explicit_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path, explicit_path.is_some())
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Source chat: {}", config.telegram.source_chat_id);
    info!("  Target chat: {}", config.telegram.target_chat_id);
    info!(
        "  Affiliate endpoint: {}",
        config.affiliate.endpoint.as_deref().unwrap_or("(none)")
    );
    info!(
        "  Dedup store: {} at {}",
        config.store.backend,
        config.store.path.display()
    );

    let transport = Arc::new(TelegramTransport::new(&config.telegram));
    let store = store::open(&config.store)?;
    let pipeline = Pipeline::new(&config, store, transport.clone())?;

    match &config.schedule {
        None => {
            // One-shot: an external scheduler invokes us and must not overlap runs
            pipeline.run(transport.as_ref()).await?;
        }
        Some(schedule) => {
            let mut scheduler = Scheduler::new().await?;
            scheduler::tasks::register_pipeline_task(
                &scheduler,
                &schedule.cron,
                Arc::new(pipeline),
                transport,
            )
            .await?;
            scheduler.start().await?;

            info!("Bot is running on schedule '{}'. Press Ctrl-C to stop.", schedule.cron);
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            scheduler.shutdown().await?;
        }
    }

    Ok(())
}
