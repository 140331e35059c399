use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Sqlite,
}

impl StoreBackend {
    /// Store location used when `store.path` is not set
    pub fn default_path(self) -> PathBuf {
        match self {
            StoreBackend::File => PathBuf::from("processed_message_ids.txt"),
            StoreBackend::Sqlite => PathBuf::from("dealbot.db"),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::File => write!(f, "file"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub affiliate: AffiliateConfig,
    pub store: StoreConfig,
    pub schedule: Option<ScheduleConfig>,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub source_chat_id: i64,
    pub target_chat_id: i64,
    pub fetch_limit: u8,
    pub poll_timeout_secs: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AffiliateConfig {
    /// Conversion endpoint. Unset means every link falls back to the original.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_affiliate_timeout")]
    pub timeout_secs: u64,
}

impl AffiliateConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    /// Six-field cron expression (seconds first), e.g. "0 */5 * * * *"
    pub cron: String,
}

/// On-disk shape of config.toml. Everything is optional here so that the
/// environment can fill in what the file leaves out.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    telegram: RawTelegram,
    #[serde(default = "default_affiliate_config")]
    affiliate: AffiliateConfig,
    #[serde(default)]
    store: RawStore,
    #[serde(default)]
    schedule: Option<ScheduleConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct RawTelegram {
    bot_token: Option<String>,
    source_chat_id: Option<i64>,
    target_chat_id: Option<i64>,
    fetch_limit: Option<u8>,
    poll_timeout_secs: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct RawStore {
    #[serde(default)]
    backend: StoreBackend,
    path: Option<PathBuf>,
}

fn default_affiliate_timeout() -> u64 {
    10
}

fn default_fetch_limit() -> u8 {
    50
}

fn default_poll_timeout() -> u32 {
    10
}

fn default_affiliate_config() -> AffiliateConfig {
    AffiliateConfig {
        endpoint: None,
        timeout_secs: default_affiliate_timeout(),
    }
}

impl Default for AffiliateConfig {
    fn default() -> Self {
        default_affiliate_config()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let backend = StoreBackend::default();
        StoreConfig {
            backend,
            path: backend.default_path(),
        }
    }
}

impl Config {
    /// Load config.toml (if present) and apply environment overrides.
    ///
    /// `required` controls whether a missing file is an error; the default
    /// path is optional so the bot can run from the environment alone.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        let content = if path.exists() {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?
        } else if required {
            anyhow::bail!("Config file not found: {}", path.display());
        } else {
            String::new()
        };

        Self::from_sources(&content, |key| std::env::var(key).ok())
    }

    /// Build a config from TOML text and an environment lookup.
    pub fn from_sources<F>(toml_text: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = toml::from_str(toml_text).context("Failed to parse config file")?;

        // Empty environment values count as unset.
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = env("TELEGRAM_BOT_TOKEN")
            .or(file.telegram.bot_token)
            .filter(|t| !t.trim().is_empty())
            .context(
                "Missing required configuration: telegram.bot_token (or TELEGRAM_BOT_TOKEN)",
            )?;

        let source_chat_id = match env("SOURCE_CHAT_ID") {
            Some(v) => parse_chat_id("SOURCE_CHAT_ID", &v)?,
            None => file.telegram.source_chat_id.context(
                "Missing required configuration: telegram.source_chat_id (or SOURCE_CHAT_ID)",
            )?,
        };

        let target_chat_id = match env("TARGET_CHAT_ID") {
            Some(v) => parse_chat_id("TARGET_CHAT_ID", &v)?,
            None => file.telegram.target_chat_id.context(
                "Missing required configuration: telegram.target_chat_id (or TARGET_CHAT_ID)",
            )?,
        };

        let fetch_limit = file.telegram.fetch_limit.unwrap_or_else(default_fetch_limit);
        if !(1..=100).contains(&fetch_limit) {
            anyhow::bail!(
                "Invalid telegram.fetch_limit {}: must be between 1 and 100",
                fetch_limit
            );
        }

        let mut affiliate = file.affiliate;
        if let Some(endpoint) = env("AFFILIATE_API_ENDPOINT") {
            affiliate.endpoint = Some(endpoint);
        }
        affiliate.endpoint = affiliate
            .endpoint
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        let backend = file.store.backend;
        let store = StoreConfig {
            backend,
            path: env("PROCESSED_IDS_FILE")
                .map(PathBuf::from)
                .or(file.store.path)
                .unwrap_or_else(|| backend.default_path()),
        };

        Ok(Config {
            telegram: TelegramConfig {
                bot_token,
                source_chat_id,
                target_chat_id,
                fetch_limit,
                poll_timeout_secs: file
                    .telegram
                    .poll_timeout_secs
                    .unwrap_or_else(default_poll_timeout),
            },
            affiliate,
            store,
            schedule: file.schedule,
        })
    }
}

fn parse_chat_id(key: &str, value: &str) -> Result<i64> {
    value
        .parse::<i64>()
        .with_context(|| format!("Invalid {}: '{}' is not a chat id", key, value))
}
