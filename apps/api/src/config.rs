use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_PRIMARY_MODEL: &str = "google/gemini-2.0-flash-exp:free";
const DEFAULT_FALLBACK_MODEL: &str = "meta-llama/llama-3.3-70b-instruct:free";
const DEFAULT_GOAL_CASCADE: &str = "meta-llama/llama-4-maverick:free,\
qwen/qwen3-235b-a22b:free,\
mistralai/mistral-small-3.1-24b-instruct:free,\
google/gemma-3-27b-it:free";

/// S3 (or MinIO) target for archived resume files.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub openrouter_api_key: String,
    /// Absent ⇒ in-memory store.
    pub database_url: Option<String>,
    /// Absent ⇒ in-process credential locks.
    pub redis_url: Option<String>,
    /// Absent ⇒ resume files are not archived.
    pub s3: Option<S3Config>,
    pub port: u16,
    pub rust_log: String,
    pub primary_model: String,
    pub fallback_model: String,
    pub goal_models: Vec<String>,
    pub resync_delay: Duration,
    pub scoring_policy_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let s3 = match optional("S3_BUCKET") {
            Some(bucket) => Some(S3Config {
                bucket,
                endpoint: optional("S3_ENDPOINT")
                    .context("S3_ENDPOINT is required when S3_BUCKET is set")?,
                access_key_id: optional("AWS_ACCESS_KEY_ID")
                    .context("AWS_ACCESS_KEY_ID is required when S3_BUCKET is set")?,
                secret_access_key: optional("AWS_SECRET_ACCESS_KEY")
                    .context("AWS_SECRET_ACCESS_KEY is required when S3_BUCKET is set")?,
            }),
            None => None,
        };

        Ok(Config {
            openrouter_api_key: optional("OPENROUTER_API_KEY")
                .context("Required environment variable 'OPENROUTER_API_KEY' is not set")?,
            database_url: optional("DATABASE_URL"),
            redis_url: optional("REDIS_URL"),
            s3,
            port: optional("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            primary_model: optional("ORACLE_PRIMARY_MODEL")
                .unwrap_or_else(|| DEFAULT_PRIMARY_MODEL.to_string()),
            fallback_model: optional("ORACLE_FALLBACK_MODEL")
                .unwrap_or_else(|| DEFAULT_FALLBACK_MODEL.to_string()),
            goal_models: split_models(
                &optional("GOAL_MODEL_CASCADE").unwrap_or_else(|| DEFAULT_GOAL_CASCADE.to_string()),
            ),
            resync_delay: Duration::from_millis(
                optional("RESYNC_DELAY_MS")
                    .unwrap_or_else(|| "2000".to_string())
                    .parse::<u64>()
                    .context("RESYNC_DELAY_MS must be a whole number of milliseconds")?,
            ),
            scoring_policy_path: optional("SCORING_POLICY_PATH").map(PathBuf::from),
        })
    }
}

fn split_models(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}
