//! Runtime configuration read from the environment (and a `.env` file if present).

use std::{env, path::PathBuf, time::Duration};

use crate::{services::summary::DEFAULT_SUMMARIZER_TIMEOUT, storage::json::DEFAULT_BACKUP_LIMIT};

/// Shortest secret accepted at registration
pub const DEFAULT_MIN_SECRET_LENGTH: usize = 6;

#[derive(Debug, Clone)]
pub struct Config {
    /// Location of the JSON store file
    pub store_path: PathBuf,
    /// How many previous store files to keep
    pub backup_limit: usize,
    pub auth: AuthConfig,
    /// External command the AI summary prompt is piped to
    pub summarizer_command: Option<String>,
    /// How long the summarizer command may run before it is killed
    pub summarizer_timeout: Duration,
    /// `tracing` filter directive
    pub log_filter: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Argon2id hash of the master password. Without it nobody can act as admin.
    pub master_secret_hash: Option<String>,
    pub min_secret_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            master_secret_hash: None,
            min_secret_length: DEFAULT_MIN_SECRET_LENGTH,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let store_path = match env::var("NDERTIMI_STORE") {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_store_path(),
        };

        Ok(Self {
            store_path,
            backup_limit: parse_var("NDERTIMI_BACKUPS")?.unwrap_or(DEFAULT_BACKUP_LIMIT),
            auth: AuthConfig {
                master_secret_hash: non_empty_var("NDERTIMI_ADMIN_HASH"),
                min_secret_length: parse_var("NDERTIMI_MIN_SECRET_LEN")?
                    .unwrap_or(DEFAULT_MIN_SECRET_LENGTH),
            },
            summarizer_command: non_empty_var("NDERTIMI_SUMMARIZER_CMD"),
            summarizer_timeout: parse_var("NDERTIMI_SUMMARIZER_TIMEOUT")?
                .map(|secs| Duration::from_secs(secs as u64))
                .unwrap_or(DEFAULT_SUMMARIZER_TIMEOUT),
            log_filter: non_empty_var("NDERTIMI_LOG").unwrap_or_else(|| String::from("warn")),
        })
    }
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ndertimi")
        .join("store.json")
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var(name: &'static str) -> Result<Option<usize>, ConfigError> {
    non_empty_var(name)
        .map(|v| v.parse().map_err(|_| ConfigError::Invalid { name, value: v }))
        .transpose()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for environment variable {name}")]
    Invalid { name: &'static str, value: String },
}
