use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::DedupStore;

struct Inner {
    ids: HashSet<String>,
    file: File,
}

/// Line-delimited id file: one id per line, newline-terminated, no header.
pub struct FileDedupStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl FileDedupStore {
    /// Open or create the id file, loading every complete line.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create store directory: {}", parent.display())
            })?;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read id file: {}", path.display()))
            }
        };

        // A crash mid-append can leave a partial id after the last newline.
        // It was never committed, so it is cut off before appending again.
        let committed_len = content.rfind('\n').map(|i| i + 1).unwrap_or(0);
        if committed_len < content.len() {
            warn!(
                "Discarding unterminated last line '{}' in {}",
                &content[committed_len..],
                path.display()
            );
        }

        let ids: HashSet<String> = content[..committed_len]
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open id file: {}", path.display()))?;

        if committed_len < content.len() {
            file.set_len(committed_len as u64)
                .with_context(|| format!("Failed to truncate id file: {}", path.display()))?;
        }

        debug!("Loaded {} processed ids from {}", ids.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(Inner { ids, file }),
        })
    }
}

#[async_trait]
impl DedupStore for FileDedupStore {
    async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.inner.lock().await.ids.contains(id))
    }

    async fn add(&self, id: &str) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let Inner { ids, file } = &mut *guard;
        if ids.contains(id) {
            return Ok(());
        }

        let line = format!("{}\n", id);
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .and_then(|_| file.sync_data())
            .with_context(|| format!("Failed to append id to {}", self.path.display()))?;

        ids.insert(id.to_string());
        Ok(())
    }
}
