use std::sync::Arc;

use tracing::{error, warn};

use crate::pipeline::Pipeline;
use crate::platform::InboundTransport;
use crate::scheduler::{RunGuard, Scheduler};

/// Register the forwarding pipeline as a recurring job
pub async fn register_pipeline_task(
    scheduler: &Scheduler,
    cron_expr: &str,
    pipeline: Arc<Pipeline>,
    inbound: Arc<dyn InboundTransport>,
) -> anyhow::Result<()> {
    let guard = RunGuard::new();

    scheduler
        .add_cron_job(cron_expr, "forward-deals", move || {
            let pipeline = Arc::clone(&pipeline);
            let inbound = Arc::clone(&inbound);
            let guard = guard.clone();
            Box::pin(async move {
                let Some(_running) = guard.try_acquire() else {
                    warn!("Previous run still in progress, skipping this tick");
                    return;
                };
                if let Err(e) = pipeline.run(inbound.as_ref()).await {
                    error!("Scheduled run failed: {:#}", e);
                }
            })
        })
        .await?;

    Ok(())
}
