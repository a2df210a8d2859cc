//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keyring service name used for credential lookups.
const KEYRING_SERVICE: &str = "questlog";

/// Nested extraction-model configuration.
///
/// The API key is loaded at runtime via OS keychain or environment
/// variables, not from the TOML config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible chat-completions endpoint.
    pub api_base: String,
    /// Model identifier sent with every completion request.
    pub model: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_model_timeout_seconds")]
    pub timeout_seconds: u64,
    /// API key (populated at runtime).
    #[serde(skip)]
    pub api_key: String,
}

fn default_model_timeout_seconds() -> u64 {
    30
}

/// Nested Slack configuration for the chat-mention connector.
///
/// Tokens are per-integration credentials on the integration record,
/// not service-level configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SlackConfig {
    /// Bot user id whose mentions are captured (e.g. `U0123456`).
    /// The chat-mention connector is not registered when unset.
    #[serde(default)]
    pub bot_user_id: String,
}

/// Scheduler tick and batch sizing configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Poller tick interval in seconds. Each tick re-checks every enabled
    /// integration against its own scan cadence, so this can be much finer
    /// than any integration's effective frequency.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
    /// Maximum inbound items processed per integration per scan.
    #[serde(default = "default_batch_max")]
    pub batch_max: usize,
}

fn default_tick_seconds() -> u64 {
    60
}

fn default_batch_max() -> usize {
    25
}

fn default_http_port() -> u16 {
    3000
}

/// Connector endpoint configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SourcesConfig {
    /// Base URL of the mailbox gateway. The email connector is not
    /// registered when unset.
    #[serde(default)]
    pub email_api_base: Option<String>,
    /// Base URL of the bot update API.
    #[serde(default = "default_bot_api_base")]
    pub bot_api_base: String,
}

fn default_bot_api_base() -> String {
    "https://api.telegram.org".to_owned()
}

fn default_sources() -> SourcesConfig {
    SourcesConfig {
        email_api_base: None,
        bot_api_base: default_bot_api_base(),
    }
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Directory where the `SQLite` database file lives.
    pub data_dir: PathBuf,
    /// Extraction model settings.
    pub model: ModelConfig,
    /// Slack connectivity settings for the chat-mention connector.
    #[serde(default)]
    pub slack: SlackConfig,
    /// HTTP port for the review surface.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Poller tick and batch limits.
    #[serde(default = "default_scheduler")]
    pub scheduler: SchedulerConfig,
    /// Connector endpoints.
    #[serde(default = "default_sources")]
    pub sources: SourcesConfig,
}

fn default_scheduler() -> SchedulerConfig {
    SchedulerConfig {
        tick_seconds: default_tick_seconds(),
        batch_max: default_batch_max(),
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load secrets from OS keychain with env-var fallback.
    ///
    /// Tries the `questlog` keyring service first, then falls back to
    /// the `QUESTLOG_MODEL_API_KEY` environment variable. Source tokens
    /// are per-integration credentials, loaded from the integration
    /// record at scan time, never from here.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the model API key is unavailable from
    /// both sources.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.model.api_key = load_credential("model_api_key", "QUESTLOG_MODEL_API_KEY").await?;
        Ok(())
    }

    /// Derived path for the `SQLite` database file.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("questlog.db")
    }

    fn validate(&self) -> Result<()> {
        if self.model.api_base.is_empty() {
            return Err(AppError::Config("model.api_base must not be empty".into()));
        }
        if self.model.model.is_empty() {
            return Err(AppError::Config("model.model must not be empty".into()));
        }
        if self.scheduler.tick_seconds == 0 {
            return Err(AppError::Config(
                "scheduler.tick_seconds must be greater than zero".into(),
            ));
        }
        if self.scheduler.batch_max == 0 {
            return Err(AppError::Config(
                "scheduler.batch_max must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // Try OS keychain first via spawn_blocking (keyring is synchronous I/O).
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    // Fallback to environment variable.
    env::var(env_key).map_err(|_| {
        AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))
    })
}
