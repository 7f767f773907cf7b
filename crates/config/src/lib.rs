//! Configuration loading, validation, and management for Folio.
//!
//! Loads configuration from `~/.folio/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Backend names accepted by the store sections.
const STORE_BACKENDS: &[&str] = &["sqlite", "memory"];
const CONVERSATION_BACKENDS: &[&str] = &["sqlite", "file", "memory"];

/// The root configuration structure.
///
/// Maps directly to `~/.folio/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider ("gemini", "openai", "openrouter", "ollama")
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default chat model
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// SQLite database shared by the durable stores.
    /// Defaults to `~/.folio/folio.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub records: RecordsConfig,

    /// Provider-specific overrides, keyed by provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_temperature() -> f32 {
    0.3
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
            .field("database_path", &self.database_path)
            .field("search", &self.search)
            .field("agent", &self.agent)
            .field("memory", &self.memory)
            .field("records", &self.records)
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

/// FAQ similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Vector store backend: "sqlite" or "memory"
    #[serde(default = "default_sqlite")]
    pub store: String,

    /// Partition tag shared by every FAQ passage
    #[serde(default = "default_partition")]
    pub partition: String,

    /// Nearest neighbours fetched before thresholding
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Honesty threshold: matches below this similarity are discarded
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Provider used for embeddings; the default provider when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_provider: Option<String>,
}

fn default_sqlite() -> String {
    "sqlite".into()
}
fn default_partition() -> String {
    "company_faq".into()
}
fn default_top_k() -> usize {
    15
}
fn default_min_similarity() -> f32 {
    0.7
}
fn default_embedding_model() -> String {
    "text-embedding-004".into()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            store: default_sqlite(),
            partition: default_partition(),
            top_k: default_top_k(),
            min_similarity: default_min_similarity(),
            embedding_model: default_embedding_model(),
            embedding_provider: None,
        }
    }
}

/// Reasoning loop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Tool-call ceiling with the full toolset
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Tool-call ceiling with the reduced (FAQ only) toolset
    #[serde(default = "default_reduced_max_iterations")]
    pub reduced_max_iterations: usize,

    /// Corrective retries granted for malformed tool arguments
    #[serde(default = "default_max_argument_retries")]
    pub max_argument_retries: usize,

    /// Most recent turns replayed to the model
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Characters of tool output kept per verbose trace entry
    #[serde(default = "default_trace_output_limit")]
    pub trace_output_limit: usize,
}

fn default_max_iterations() -> usize {
    5
}
fn default_reduced_max_iterations() -> usize {
    2
}
fn default_max_argument_retries() -> usize {
    1
}
fn default_history_limit() -> usize {
    20
}
fn default_trace_output_limit() -> usize {
    500
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            reduced_max_iterations: default_reduced_max_iterations(),
            max_argument_retries: default_max_argument_retries(),
            history_limit: default_history_limit(),
            trace_output_limit: default_trace_output_limit(),
        }
    }
}

/// Conversation memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Durable backend: "sqlite", "file" or "memory"
    #[serde(default = "default_sqlite")]
    pub backend: String,

    /// Session log directory for the "file" backend.
    /// Defaults to `~/.folio/sessions`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions_dir: Option<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_sqlite(),
            sessions_dir: None,
        }
    }
}

/// Structured book and award records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsConfig {
    /// "sqlite" or "memory"
    #[serde(default = "default_sqlite")]
    pub backend: String,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            backend: default_sqlite(),
        }
    }
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
    /// Load configuration from the default path (~/.folio/config.toml).
    ///
    /// Environment overrides:
    /// - `FOLIO_API_KEY` (global key, highest priority)
    /// - `FOLIO_PROVIDER`
    /// - `FOLIO_MODEL`
    ///
    /// Provider-specific keys (`GEMINI_API_KEY`, `OPENAI_API_KEY`,
    /// `OPENROUTER_API_KEY`) are consulted by [`AppConfig::api_key_for`].
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(key) = std::env::var("FOLIO_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(provider) = std::env::var("FOLIO_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("FOLIO_MODEL") {
            config.default_model = model;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file found, using defaults");
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

    /// `~/.folio`
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".folio")
    }

    /// Resolved SQLite database path.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("folio.db"))
    }

    /// Resolved session log directory for the file conversation backend.
    pub fn sessions_dir(&self) -> PathBuf {
        self.memory
            .sessions_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("sessions"))
    }

    /// API key for a provider: provider section, then the global key, then
    /// the provider's conventional environment variable.
    pub fn api_key_for(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
            .or_else(|| {
                provider_env_var(provider).and_then(|var| std::env::var(var).ok())
            })
    }

    /// Base URL override for a provider, if any.
    pub fn api_url_for(&self, provider: &str) -> Option<&str> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_url.as_deref())
    }

    /// Chat model for a provider: its section override or the default model.
    pub fn model_for(&self, provider: &str) -> &str {
        self.providers
            .get(provider)
            .and_then(|p| p.default_model.as_deref())
            .unwrap_or(&self.default_model)
    }

    /// Provider used to embed FAQ passages and queries.
    pub fn embedding_provider(&self) -> &str {
        self.search
            .embedding_provider
            .as_deref()
            .unwrap_or(&self.default_provider)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.search.min_similarity) {
            return Err(ConfigError::ValidationError(
                "search.min_similarity must be between 0.0 and 1.0".into(),
            ));
        }

        if self.search.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "search.top_k must be > 0".into(),
            ));
        }

        if self.search.partition.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "search.partition must not be empty".into(),
            ));
        }

        if self.agent.max_iterations == 0 || self.agent.reduced_max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent iteration ceilings must be > 0".into(),
            ));
        }

        check_backend("search.store", &self.search.store, STORE_BACKENDS)?;
        check_backend("records.backend", &self.records.backend, STORE_BACKENDS)?;
        check_backend("memory.backend", &self.memory.backend, CONVERSATION_BACKENDS)?;

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
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
            database_path: None,
            search: SearchConfig::default(),
            agent: AgentConfig::default(),
            memory: MemoryConfig::default(),
            records: RecordsConfig::default(),
            providers: HashMap::new(),
        }
    }
}

fn check_backend(field: &str, value: &str, allowed: &[&str]) -> Result<(), ConfigError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{field} must be one of {}, got '{value}'",
            allowed.join(", ")
        )))
    }
}

fn provider_env_var(provider: &str) -> Option<&'static str> {
    match provider {
        "gemini" => Some("GEMINI_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "openrouter" => Some("OPENROUTER_API_KEY"),
        _ => None,
    }
}

/// Get the user's home directory.
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
