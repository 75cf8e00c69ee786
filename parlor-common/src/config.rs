//! Configuration management for Parlor services.
//!
//! The service reads a single configuration file at `~/.parlor/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (PARLOR_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `PARLOR_BIND_ADDRESS` → network.bind
//! - `PARLOR_PORT` → network.port
//! - `PARLOR_LOG_LEVEL` → observability.log_level
//! - `PARLOR_MODEL` → inference.model
//! - `PARLOR_INFERENCE_ENDPOINT` → inference.endpoint
//! - `PARLOR_INFERENCE_API_KEY` → inference.api_key
//! - `PARLOR_DB_PATH` → memory.path

use crate::error::Error;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".parlor"),
        |dirs| dirs.home_dir().join(".parlor"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Supported inference providers.
pub const INFERENCE_PROVIDERS: &[&str] = &["workers-ai", "openai"];

/// Supported conversation store backends.
pub const MEMORY_BACKENDS: &[&str] = &["sqlite", "memory"];

// ============================================================================
// Network Configuration
// ============================================================================

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address. Default "127.0.0.1" (local only).
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Listening port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_port(),
        }
    }
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Conversation behaviour shared by every session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Fixed system preamble placed at the head of every prompt window.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Number of most recent messages submitted to the generator.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Maximum number of messages returned by a history query.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Session id the HTTP router falls back to when a request names none.
    #[serde(default = "default_session_id")]
    pub default_session: String,

    /// Seconds between sweeps releasing idle per-session slots (0 = never).
    #[serde(default = "default_idle_sweep_secs")]
    pub idle_sweep_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            window_size: default_window_size(),
            history_limit: default_history_limit(),
            default_session: default_session_id(),
            idle_sweep_secs: default_idle_sweep_secs(),
        }
    }
}

// ============================================================================
// Inference Configuration
// ============================================================================

/// Remote text-generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Provider flavour: "workers-ai" or "openai".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Endpoint URL. For "workers-ai" this is the full run URL, for
    /// "openai" the API base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Bearer token, if the endpoint requires one.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum output length.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Upper bound on a single generation call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ============================================================================
// Memory Configuration
// ============================================================================

/// Conversation store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Backend: "sqlite" (durable) or "memory" (process lifetime only).
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Directory holding the database. Defaults to the config directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: None,
        }
    }
}

impl MemoryConfig {
    /// Resolve the directory the store should live in.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(config_dir)
    }
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets clamped to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for the Parlor service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("PARLOR_BIND_ADDRESS") {
            self.network.bind = bind;
        }
        if let Some(port) = lookup("PARLOR_PORT") {
            match port.parse() {
                Ok(p) => self.network.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PARLOR_PORT"),
            }
        }
        if let Some(level) = lookup("PARLOR_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(model) = lookup("PARLOR_MODEL") {
            self.inference.model = model;
        }
        if let Some(endpoint) = lookup("PARLOR_INFERENCE_ENDPOINT") {
            self.inference.endpoint = endpoint;
        }
        if let Some(key) = lookup("PARLOR_INFERENCE_API_KEY") {
            self.inference.api_key = Some(key);
        }
        if let Some(path) = lookup("PARLOR_DB_PATH") {
            self.memory.path = Some(PathBuf::from(path));
        }
    }

    /// Check the configuration for values the service cannot run with.
    pub fn validate(&self) -> std::result::Result<(), Error> {
        if self.session.window_size == 0 {
            return Err(Error::Config("session.window_size must be at least 1".into()));
        }
        if self.session.history_limit == 0 {
            return Err(Error::Config("session.history_limit must be at least 1".into()));
        }
        if !(0.0..=2.0).contains(&self.inference.temperature) {
            return Err(Error::Config(format!(
                "inference.temperature must be within 0.0..=2.0, got {}",
                self.inference.temperature
            )));
        }
        if self.inference.max_tokens == 0 {
            return Err(Error::Config("inference.max_tokens must be at least 1".into()));
        }
        if self.inference.timeout_secs == 0 {
            return Err(Error::Config("inference.timeout_secs must be at least 1".into()));
        }
        if self.inference.endpoint.trim().is_empty() {
            return Err(Error::Config("inference.endpoint is empty".into()));
        }
        if !INFERENCE_PROVIDERS.contains(&self.inference.provider.as_str()) {
            return Err(Error::Config(format!(
                "unknown inference.provider '{}' (expected one of {:?})",
                self.inference.provider, INFERENCE_PROVIDERS
            )));
        }
        if !MEMORY_BACKENDS.contains(&self.memory.backend.as_str()) {
            return Err(Error::Config(format!(
                "unknown memory.backend '{}' (expected one of {:?})",
                self.memory.backend, MEMORY_BACKENDS
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Defaults
// ============================================================================

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    4480
}

fn default_system_prompt() -> String {
    "You are a helpful AI assistant. Be concise, friendly, and accurate. \
     If you are unsure about something, say so."
        .into()
}

fn default_window_size() -> usize {
    8
}

fn default_history_limit() -> usize {
    10
}

fn default_session_id() -> String {
    "default".into()
}

fn default_idle_sweep_secs() -> u64 {
    300
}

fn default_provider() -> String {
    "workers-ai".into()
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8787/ai/run".into()
}

fn default_model() -> String {
    "@cf/meta/llama-3.1-8b-instruct".into()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f64 {
    0.7
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_memory_backend() -> String {
    "sqlite".into()
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}
