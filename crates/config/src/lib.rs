//! Configuration loading, validation, and management for conductor.
//!
//! Loads configuration from `~/.conductor/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use conductor_core::{AgentConfig, Error as CoreError};
use conductor_telemetry::{ModelPricing, PricingTable};

/// The root configuration structure.
///
/// Maps directly to `~/.conductor/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-invocation orchestration settings
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tool executor and built-in tool settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Per-call timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Tool used for the retrieval pre-fetch
    #[serde(default = "default_retrieval_tool")]
    pub retrieval_tool: String,

    /// Token for the GitHub code search backend (falls back to `GITHUB_TOKEN`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_retrieval_tool() -> String {
    "document_search".into()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retrieval_tool: default_retrieval_tool(),
            github_token: None,
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("timeout_ms", &self.timeout_ms)
            .field("retrieval_tool", &self.retrieval_tool)
            .field("github_token", &redact(&self.github_token))
            .finish()
    }
}

/// Cost tracking configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Model charged when a chat reply does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Custom model pricing overrides (model name → pricing)
    #[serde(default)]
    pub custom_pricing: HashMap<String, PricingOverrideConfig>,
}

/// Custom per-million-token pricing for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingOverrideConfig {
    /// Price per 1M input tokens in USD
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD
    pub output_per_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.conductor/config.toml).
    ///
    /// Environment variables override the file:
    /// - `CONDUCTOR_MAX_TOOL_CALLS`
    /// - `CONDUCTOR_PARALLEL_TOOLS`
    /// - `CONDUCTOR_TOOL_TIMEOUT_MS`
    /// - `CONDUCTOR_LOG_LEVEL`
    /// - `GITHUB_TOKEN` (only when the file sets no token)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_path())
    }

    /// Load `path`, then apply environment overrides and validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without environment
    /// overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("CONDUCTOR_MAX_TOOL_CALLS") {
            self.agent.max_tool_calls = parse_env("CONDUCTOR_MAX_TOOL_CALLS", &v)?;
        }
        if let Some(v) = lookup("CONDUCTOR_PARALLEL_TOOLS") {
            self.agent.allow_parallel_tool_calls = parse_bool("CONDUCTOR_PARALLEL_TOOLS", &v)?;
        }
        if let Some(v) = lookup("CONDUCTOR_TOOL_TIMEOUT_MS") {
            self.tools.timeout_ms = parse_env("CONDUCTOR_TOOL_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("CONDUCTOR_LOG_LEVEL") {
            self.logging.level = v;
        }
        if self.tools.github_token.is_none() {
            self.tools.github_token = lookup("GITHUB_TOKEN").filter(|t| !t.is_empty());
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".conductor")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.agent.validate().map_err(|e| match e {
            CoreError::Config { message } => ConfigError::ValidationError(message),
            other => ConfigError::ValidationError(other.to_string()),
        })?;

        if self.tools.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "tools.timeout_ms must be greater than 0".into(),
            ));
        }

        if self.tools.retrieval_tool.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "tools.retrieval_tool must not be empty".into(),
            ));
        }

        for (model, price) in &self.telemetry.custom_pricing {
            if !(price.input_per_m >= 0.0 && price.output_per_m >= 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "telemetry.custom_pricing.{model}: prices must be non-negative"
                )));
            }
        }

        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tools.timeout_ms)
    }

    /// Default pricing table with the configured overrides applied.
    pub fn pricing_table(&self) -> Result<PricingTable, ConfigError> {
        let mut table = PricingTable::with_defaults();
        for (model, price) in &self.telemetry.custom_pricing {
            table
                .set(model.clone(), ModelPricing::new(price.input_per_m, price.output_per_m))
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }
        Ok(table)
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} has invalid value '{value}'")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::ValidationError(format!(
            "{key} has invalid value '{value}'"
        ))),
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
