use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_COMPLETION_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_COMPLETION_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";
const DEFAULT_BACKEND_API_URL: &str = "http://localhost:8000";
const DEFAULT_FALLBACK_STORE_PATH: &str = "data/savedPlans.json";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub completion_api_key: String,
    pub completion_api_url: String,
    pub completion_model: String,
    /// `None` leaves the completion call on the transport default.
    pub completion_timeout: Option<Duration>,
    pub backend_api_url: String,
    pub persist_timeout: Duration,
    pub fallback_store_path: PathBuf,
    /// When set, the fallback list lives in Redis instead of a local file.
    pub redis_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let completion_timeout = optional_env("COMPLETION_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>()
                    .context("COMPLETION_TIMEOUT_SECS must be a whole number of seconds")
            })
            .transpose()?
            .map(Duration::from_secs);

        Ok(Config {
            completion_api_key: require_env("COMPLETION_API_KEY")?,
            completion_api_url: optional_env("COMPLETION_API_URL")
                .unwrap_or_else(|| DEFAULT_COMPLETION_API_URL.to_string()),
            completion_model: optional_env("COMPLETION_MODEL")
                .unwrap_or_else(|| DEFAULT_COMPLETION_MODEL.to_string()),
            completion_timeout,
            backend_api_url: optional_env("BACKEND_API_URL")
                .unwrap_or_else(|| DEFAULT_BACKEND_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            persist_timeout: Duration::from_secs(
                optional_env("PERSIST_TIMEOUT_SECS")
                    .unwrap_or_else(|| "8".to_string())
                    .parse::<u64>()
                    .context("PERSIST_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            fallback_store_path: optional_env("FALLBACK_STORE_PATH")
                .unwrap_or_else(|| DEFAULT_FALLBACK_STORE_PATH.to_string())
                .into(),
            redis_url: optional_env("REDIS_URL"),
            port: optional_env("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads an optional variable, treating blank values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
}
