use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::DedupStore;

/// SQLite-backed processed-id set
#[derive(Clone)]
pub struct SqliteDedupStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDedupStore {
    /// Open or create the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // journal_mode PRAGMA always returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA synchronous=FULL;")?;

        Self::run_migrations(&conn)?;

        info!("Dedup database initialized at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS processed_messages (
                id TEXT PRIMARY KEY,
                recorded_at TEXT NOT NULL
            );
            ",
        )
        .context("Failed to create processed_messages table")?;
        Ok(())
    }
}

#[async_trait]
impl DedupStore for SqliteDedupStore {
    async fn contains(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM processed_messages WHERE id = ?1",
                rusqlite::params![id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query processed_messages")?;
        Ok(found.is_some())
    }

    async fn add(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO processed_messages (id, recorded_at) VALUES (?1, ?2)",
            rusqlite::params![id, Utc::now().to_rfc3339()],
        )
        .context("Failed to record processed message")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_contains() {
        let store = SqliteDedupStore::open_in_memory().unwrap();

        assert!(!store.contains("42").await.unwrap());
        store.add("42").await.unwrap();
        assert!(store.contains("42").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_add_is_ignored() {
        let store = SqliteDedupStore::open_in_memory().unwrap();

        store.add("9").await.unwrap();
        store.add("9").await.unwrap();

        let conn = store.conn.lock().await;
        let count: i64 = conn
            .query_row("SELECT count(*) FROM processed_messages", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_ids_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dealbot.db");

        {
            let store = SqliteDedupStore::open(&path).unwrap();
            store.add("100").await.unwrap();
        }

        let reopened = SqliteDedupStore::open(&path).unwrap();
        assert!(reopened.contains("100").await.unwrap());
        assert!(!reopened.contains("101").await.unwrap());
    }
}
