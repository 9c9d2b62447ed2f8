use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Maximum accepted upload size. Enforced as the request body limit.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Every knob has a default so the service starts with no environment at all.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub upload_dir: PathBuf,
    pub parsed_dir: PathBuf,
    pub claude_bin: String,
    /// Model override passed as `--model`. `None` omits the flag entirely.
    pub claude_model: Option<String>,
    pub step_timeout: Duration,
    pub chat_timeout: Duration,
    pub chat_history_ttl: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let claude_model = match env_or("CLAUDE_MODEL", "sonnet") {
            s if s.is_empty() => None,
            s => Some(s),
        };

        Ok(Config {
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "uploads")),
            parsed_dir: PathBuf::from(env_or("PARSED_DIR", "parsed")),
            claude_bin: env_or("CLAUDE_BIN", "claude"),
            claude_model,
            step_timeout: parse_secs("STEP_TIMEOUT_SECS", "45")?,
            chat_timeout: parse_secs("CHAT_TIMEOUT_SECS", "30")?,
            chat_history_ttl: parse_secs("CHAT_HISTORY_TTL_SECS", "3600")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_secs(key: &str, default: &str) -> Result<Duration> {
    let secs = env_or(key, default)
        .parse::<u64>()
        .with_context(|| format!("{key} must be a whole number of seconds"))?;
    Ok(Duration::from_secs(secs))
}
