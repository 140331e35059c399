//! dealbot setup wizard.
//!
//! Asks for the Telegram and affiliate settings on the terminal and writes
//! `config.toml` into `DEALBOT_ROOT` (default: current directory).

use anyhow::{bail, Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

// ── Config formatting ──────────────────────────────────────────────────────────

struct ConfigParams<'a> {
    tg_token: &'a str,
    source_chat_id: i64,
    target_chat_id: i64,
    affiliate_endpoint: &'a str,
    store_backend: &'a str,
    store_path: &'a str,
    cron: &'a str,
}

/// Quote a value as a TOML string, escaping backslashes and quotes.
fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_owned()).to_string()
}

/// Produces a valid config.toml string. Extracted so it can be unit-tested.
fn format_config(p: &ConfigParams<'_>) -> String {
    let endpoint_line = if p.affiliate_endpoint.is_empty() {
        "# endpoint = \"https://your-affiliate-api.example/convert\"".to_owned()
    } else {
        format!("endpoint = {}", toml_string(p.affiliate_endpoint))
    };

    let schedule_section = if p.cron.is_empty() {
        "# Uncomment to run on a built-in schedule instead of once per invocation.\n\
         # [schedule]\n\
         # cron = \"0 */5 * * * *\""
            .to_owned()
    } else {
        format!("[schedule]\ncron = {}", toml_string(p.cron))
    };

    let tg_token = toml_string(p.tg_token);
    let source_chat_id = p.source_chat_id;
    let target_chat_id = p.target_chat_id;
    let store_backend = toml_string(p.store_backend);
    let store_path = toml_string(p.store_path);

    format!(
        r#"[telegram]
bot_token = {tg_token}
source_chat_id = {source_chat_id}
target_chat_id = {target_chat_id}
fetch_limit = 50
poll_timeout_secs = 10

[affiliate]
{endpoint_line}
timeout_secs = 10

[store]
backend = {store_backend}
path = {store_path}

{schedule_section}
"#
    )
}

fn parse_chat_id(label: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .with_context(|| format!("{label} must be a numeric chat id, got '{value}'"))
}

fn default_store_path(backend: &str) -> &'static str {
    if backend == "sqlite" {
        "dealbot.db"
    } else {
        "processed_message_ids.txt"
    }
}

// ── CLI mode ───────────────────────────────────────────────────────────────────

fn run_cli(project_root: &Path) -> Result<()> {
    println!("=== dealbot setup ===\n");

    let read_line = |prompt: &str| -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut buf = String::new();
        io::stdin().read_line(&mut buf)?;
        Ok(buf.trim().to_owned())
    };

    let or_default = |s: String, default: &str| {
        if s.is_empty() {
            default.to_owned()
        } else {
            s
        }
    };

    let tg_token = read_line("Telegram bot token: ")?;
    if tg_token.is_empty() {
        bail!("A bot token is required");
    }
    let source_chat_id = parse_chat_id(
        "Source chat id",
        &read_line("Source chat id (e.g. -1001234567890): ")?,
    )?;
    let target_chat_id = parse_chat_id(
        "Target chat id",
        &read_line("Target chat id (e.g. -1009876543210): ")?,
    )?;
    let affiliate_endpoint = read_line("Affiliate API endpoint (optional): ")?;

    let store_backend = or_default(read_line("Dedup store backend [file/sqlite] (file): ")?, "file");
    if store_backend != "file" && store_backend != "sqlite" {
        bail!("Unknown store backend '{store_backend}', expected 'file' or 'sqlite'");
    }
    let store_path = or_default(
        read_line(&format!(
            "Dedup store path [{}]: ",
            default_store_path(&store_backend)
        ))?,
        default_store_path(&store_backend),
    );
    let cron = read_line("Cron schedule, seconds first (optional, empty = run once): ")?;

    let config = format_config(&ConfigParams {
        tg_token: &tg_token,
        source_chat_id,
        target_chat_id,
        affiliate_endpoint: &affiliate_endpoint,
        store_backend: &store_backend,
        store_path: &store_path,
        cron: &cron,
    });

    let config_path = project_root.join("config.toml");
    std::fs::write(&config_path, &config)
        .with_context(|| format!("Could not write {}", config_path.display()))?;

    println!("\n✓  config.toml saved to {}", config_path.display());
    println!("   Run the bot with:  cargo run --bin dealbot");
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    // Resolve project root: prefer DEALBOT_ROOT env, fall back to cwd.
    let project_root =
        PathBuf::from(std::env::var("DEALBOT_ROOT").unwrap_or_else(|_| ".".to_string()));

    run_cli(&project_root)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(endpoint: &str, backend: &str, cron: &str) -> String {
        format_config(&ConfigParams {
            tg_token: "mytoken",
            source_chat_id: -1001,
            target_chat_id: -1002,
            affiliate_endpoint: endpoint,
            store_backend: backend,
            store_path: default_store_path(backend),
            cron,
        })
    }

    #[test]
    fn test_telegram_section_present() {
        let out = cfg("", "file", "");
        assert!(out.contains("[telegram]"));
        assert!(out.contains(r#"bot_token = "mytoken""#));
        assert!(out.contains("source_chat_id = -1001"));
        assert!(out.contains("target_chat_id = -1002"));
    }

    #[test]
    fn test_endpoint_included_when_set() {
        let out = cfg("https://aff.example/convert", "file", "");
        assert!(out.contains(r#"endpoint = "https://aff.example/convert""#));
    }

    #[test]
    fn test_endpoint_commented_when_empty() {
        let out = cfg("", "file", "");
        assert!(out.contains("# endpoint ="));
        assert!(!out.contains("\nendpoint = "));
    }

    #[test]
    fn test_store_section() {
        let out = cfg("", "sqlite", "");
        assert!(out.contains("[store]"));
        assert!(out.contains(r#"backend = "sqlite""#));
        assert!(out.contains(r#"path = "dealbot.db""#));
    }

    #[test]
    fn test_schedule_only_when_cron_set() {
        assert!(cfg("", "file", "").contains("# [schedule]"));

        let out = cfg("", "file", "0 */5 * * * *");
        assert!(out.contains("[schedule]\ncron = \"0 */5 * * * *\""));
    }

    #[test]
    fn test_output_is_valid_toml() {
        let out = cfg("https://aff.example/convert", "file", "0 0 * * * *");
        let value: toml::Value = toml::from_str(&out).unwrap();
        assert_eq!(value["telegram"]["source_chat_id"].as_integer(), Some(-1001));
        assert_eq!(value["schedule"]["cron"].as_str(), Some("0 0 * * * *"));
    }

    #[test]
    fn test_windows_store_path_survives_toml() {
        let out = format_config(&ConfigParams {
            tg_token: r#"tok"en\"#,
            source_chat_id: -1001,
            target_chat_id: -1002,
            affiliate_endpoint: "",
            store_backend: "file",
            store_path: r"C:\data\ids.txt",
            cron: "",
        });
        let value: toml::Value = toml::from_str(&out).unwrap();
        assert_eq!(value["store"]["path"].as_str(), Some(r"C:\data\ids.txt"));
        assert_eq!(value["telegram"]["bot_token"].as_str(), Some(r#"tok"en\"#));
    }

    #[test]
    fn test_chat_id_must_be_numeric() {
        assert_eq!(parse_chat_id("Source", " -100 ").unwrap(), -100);
        assert!(parse_chat_id("Source", "@deals").is_err());
    }
}
