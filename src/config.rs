//! Configuration for the Second Brain service
//!
//! Settings are layered, later sources winning:
//! 1. Built-in defaults
//! 2. Optional `second-brain.toml` in the working directory (or `--config <path>`)
//! 3. `BRAIN_*` environment variables, `__` separating sections
//!    (e.g. `BRAIN_AI__MODEL`, `BRAIN_DATABASE__URL`)
//!
//! Provider keys also fall back to the well-known `GEMINI_API_KEY` /
//! `ANTHROPIC_API_KEY` variables, and the remote database token to
//! `TURSO_AUTH_TOKEN`.

use crate::error::{BrainError, Result};
use crate::services::llm::{LlmHttpConfig, ProviderConfig, ProviderKind, RetryPolicy};
use crate::storage::ConnectionMode;
use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Base name of the optional config file
const CONFIG_FILE_NAME: &str = "second-brain";

/// Prefix for environment overrides
const ENV_PREFIX: &str = "BRAIN";

/// Default on-disk database location
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("second-brain")
        .join("brain.db")
}

/// Raw layered configuration, before validation
#[derive(Debug, Deserialize)]
struct SettingsFile {
    server: ServerSection,
    database: DatabaseSection,
    public_base_url: String,
    ai: AiSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    addr: String,
}

#[derive(Debug, Deserialize)]
struct DatabaseSection {
    url: String,
    auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AiSection {
    provider: String,
    api_key: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    temperature: f64,
    max_output_tokens: u32,
    max_retries: u32,
    initial_backoff_ms: u64,
    timeout_ms: u64,
    connect_timeout_ms: u64,
}

/// Fully resolved service settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    /// Base URL used to build public item links
    pub public_base_url: String,
    pub ai: AiSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// Local path, `file:` URL, or `libsql://` remote URL
    pub url: String,
    pub auth_token: Option<SecretString>,
}

impl DatabaseSettings {
    pub fn connection_mode(&self) -> Result<ConnectionMode> {
        let token = self
            .auth_token
            .as_ref()
            .map(|t| t.expose_secret().to_string());
        ConnectionMode::from_url(&self.url, token)
    }
}

#[derive(Debug, Clone)]
pub struct AiSettings {
    pub provider: ProviderKind,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl AiSettings {
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            endpoint: self.endpoint.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }

    pub fn http_config(&self) -> LlmHttpConfig {
        LlmHttpConfig {
            timeout_ms: self.timeout_ms,
            connect_timeout_ms: self.connect_timeout_ms,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.initial_backoff_ms),
        )
    }
}

impl Settings {
    /// Load settings from defaults, the config file and the environment
    ///
    /// With `path` set the file must exist; otherwise `second-brain.toml`
    /// is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_source = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(CONFIG_FILE_NAME).required(false),
        };

        let raw: SettingsFile = Self::defaults()?
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Self::from_file(raw)
    }

    /// Built-in defaults only, ignoring files and the environment
    pub fn builtin() -> Result<Self> {
        let raw: SettingsFile = Self::defaults()?.build()?.try_deserialize()?;
        Self::from_file(raw)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let db_path = default_db_path().to_string_lossy().into_owned();

        Ok(Config::builder()
            .set_default("server.addr", "127.0.0.1:3000")?
            .set_default("database.url", db_path)?
            .set_default("public_base_url", "http://localhost:3000")?
            .set_default("ai.provider", ProviderKind::default().as_str())?
            .set_default("ai.temperature", 0.7)?
            .set_default("ai.max_output_tokens", 500)?
            .set_default("ai.max_retries", 5)?
            .set_default("ai.initial_backoff_ms", 2000)?
            .set_default("ai.timeout_ms", 30_000)?
            .set_default("ai.connect_timeout_ms", 3_000)?)
    }

    /// Validate the raw layers and apply provider-specific fallbacks
    fn from_file(raw: SettingsFile) -> Result<Self> {
        let addr: SocketAddr = raw.server.addr.parse().map_err(|e| {
            BrainError::Config(config::ConfigError::Message(format!(
                "Invalid server.addr '{}': {}",
                raw.server.addr, e
            )))
        })?;

        let provider = ProviderKind::parse(&raw.ai.provider)
            .map_err(|e| BrainError::Config(config::ConfigError::Message(e.to_string())))?;

        let api_key = non_empty(raw.ai.api_key).or_else(|| {
            let var = provider.api_key_env();
            let key = non_empty(env::var(var).ok());
            if key.is_some() {
                debug!("Using API key from {} environment variable", var);
            }
            key
        });

        let auth_token = non_empty(raw.database.auth_token)
            .or_else(|| non_empty(env::var("TURSO_AUTH_TOKEN").ok()));

        Ok(Self {
            server: ServerSettings { addr },
            database: DatabaseSettings {
                url: raw.database.url,
                auth_token: auth_token.map(|t| SecretString::new(t.into())),
            },
            public_base_url: raw.public_base_url.trim_end_matches('/').to_string(),
            ai: AiSettings {
                provider,
                api_key: api_key.map(|k| SecretString::new(k.into())),
                model: non_empty(raw.ai.model)
                    .unwrap_or_else(|| provider.default_model().to_string()),
                endpoint: non_empty(raw.ai.endpoint)
                    .unwrap_or_else(|| provider.default_endpoint().to_string()),
                temperature: raw.ai.temperature as f32,
                max_output_tokens: raw.ai.max_output_tokens,
                max_retries: raw.ai.max_retries,
                initial_backoff_ms: raw.ai.initial_backoff_ms,
                timeout_ms: raw.ai.timeout_ms,
                connect_timeout_ms: raw.ai.connect_timeout_ms,
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
