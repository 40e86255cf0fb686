//! Configuration loading, validation, and management for UniPath.
//!
//! Loads configuration from `~/.unipath/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.unipath/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// LLM provider driving the counsellor
    #[serde(default = "default_provider")]
    pub default_provider: String,

    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature. 0 keeps tool selection deterministic.
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_max_tokens() -> u32 {
    2048
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("database", &self.database)
            .field("gateway", &self.gateway)
            .field("agent", &self.agent)
            .field("logging", &self.logging)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection string, e.g. `sqlite://unipath.db` or `sqlite::memory:`
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    format!("sqlite://{}", AppConfig::config_dir().join("unipath.db").display())
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origins: vec![],
        }
    }
}

/// Agent loop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model rounds per chat turn before the loop gives up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Most recent chat turns sent to the model
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Rows returned by `searchUniversities`
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

fn default_max_iterations() -> usize {
    8
}
fn default_history_limit() -> usize {
    15
}
fn default_search_limit() -> usize {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            history_limit: default_history_limit(),
            search_limit: default_search_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human format
    #[serde(default)]
    pub json: bool,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.unipath/config.toml).
    ///
    /// Environment overrides:
    /// - `UNIPATH_API_KEY`, then `GOOGLE_API_KEY`, then `OPENAI_API_KEY`
    ///   (only when the file sets no key)
    /// - `UNIPATH_PROVIDER`, `UNIPATH_MODEL`, `UNIPATH_DATABASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("UNIPATH_API_KEY")
                .or_else(|| lookup("GOOGLE_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("UNIPATH_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("UNIPATH_MODEL") {
            self.default_model = model;
        }

        if let Some(url) = lookup("UNIPATH_DATABASE_URL") {
            self.database.url = url;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn config_dir() -> PathBuf {
        dirs_home().join(".unipath")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.history_limit == 0 {
            return Err(ConfigError::ValidationError(
                "agent.history_limit must be at least 1".into(),
            ));
        }

        if !(1..=20).contains(&self.agent.search_limit) {
            return Err(ConfigError::ValidationError(
                "agent.search_limit must be between 1 and 20".into(),
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(ConfigError::ValidationError("database.url must not be empty".into()));
        }

        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Whether `provider` can authenticate: a global key, its own table's
    /// key, or a local Ollama server that needs none.
    pub fn has_credentials_for(&self, provider: &str) -> bool {
        provider == "ollama"
            || self.has_api_key()
            || self
                .providers
                .get(provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `init-config`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            database: DatabaseConfig::default(),
            gateway: GatewayConfig::default(),
            agent: AgentConfig::default(),
            logging: LoggingConfig::default(),
            providers: HashMap::new(),
        }
    }
}

fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
