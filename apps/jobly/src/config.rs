use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_API_URL: &str = "http://localhost:3001";
const DEFAULT_STORAGE_PATH: &str = ".jobly/local_storage.json";
const DEFAULT_TIMEOUT_SECS: &str = "30";

/// Client configuration loaded from environment variables.
/// Every variable has a default, so a bare environment is valid.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub storage_path: PathBuf,
    pub request_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let timeout_secs = env_or("JOBLY_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .parse::<u64>()
            .context("JOBLY_REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Config {
            api_base_url: normalize_base_url(&env_or("JOBLY_API_URL", DEFAULT_API_URL)),
            storage_path: PathBuf::from(env_or("JOBLY_STORAGE_PATH", DEFAULT_STORAGE_PATH)),
            request_timeout: Duration::from_secs(timeout_secs),
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Endpoints are joined with a single `/`, so the base never keeps a trailing one.
fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
