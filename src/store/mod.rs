pub mod file;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::config::{StoreBackend, StoreConfig};
use crate::store::file::FileDedupStore;
use crate::store::sqlite::SqliteDedupStore;

/// Durable, append-only set of message ids that were already published.
///
/// Ids are only ever added, never removed. Implementations must have the id
/// on durable storage before `add` returns.
#[async_trait]
pub trait DedupStore: Send + Sync {
    async fn contains(&self, id: &str) -> Result<bool>;
    async fn add(&self, id: &str) -> Result<()>;
}

/// Open the backend selected in the config
pub fn open(config: &StoreConfig) -> Result<Box<dyn DedupStore>> {
    info!(
        "Opening {} dedup store at: {}",
        config.backend,
        config.path.display()
    );
    let store: Box<dyn DedupStore> = match config.backend {
        StoreBackend::File => Box::new(FileDedupStore::open(&config.path)?),
        StoreBackend::Sqlite => Box::new(SqliteDedupStore::open(&config.path)?),
    };
    Ok(store)
}
