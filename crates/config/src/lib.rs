//! Configuration management for SmartAgent
//!
//! Loads settings from a JSON file, fills in defaults for anything missing
//! and applies `SMART_AGENT_*` environment overrides on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, expand_tilde};

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "SMART_AGENT_";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Chat model endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub name: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            base_url: default_base_url(),
            temperature: None,
            max_tokens: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

/// What to do when the model asks for a tool that is not registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownToolPolicy {
    /// Answer the call with a synthetic error result and keep going
    #[default]
    Report,
    /// Fail the whole query
    Abort,
}

/// Agent behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_fallback_response")]
    pub fallback_response: String,
    #[serde(default)]
    pub unknown_tool: UnknownToolPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            fallback_response: default_fallback_response(),
            unknown_tool: UnknownToolPolicy::default(),
        }
    }
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are SmartAgent, a concise assistant running on the user's machine. \
When the user mentions a CSV or Markdown file, call the matching tool with the file path exactly as \
the user wrote it, then answer using the tool output. If a tool reports an error, explain it plainly. \
For anything else, answer directly without calling tools.";

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

pub const DEFAULT_FALLBACK_RESPONSE: &str = "No response from model.";

fn default_fallback_response() -> String {
    DEFAULT_FALLBACK_RESPONSE.to_string()
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// One-shot query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_query_timeout")]
    pub timeout_secs: f64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_query_timeout(),
        }
    }
}

fn default_query_timeout() -> f64 {
    30.0
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_with_env(&path).await
    }

    /// Load from `path`, then apply environment overrides
    pub async fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load_from(path).await?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a specific location; a missing file yields defaults
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("Reading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot be used at runtime
    pub fn validate(&self) -> Result<()> {
        let timeout = self.query.timeout_secs;
        let usable = timeout.is_finite()
            && timeout > 0.0
            && Duration::try_from_secs_f64(timeout).is_ok();
        if !usable {
            return Err(ConfigError::InvalidValue {
                key: "query.timeout_secs".to_string(),
                value: timeout.to_string(),
            });
        }
        Ok(())
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("Writing config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Apply `SMART_AGENT_*` overrides using `lookup` to read variables
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty())
        };

        if let Some(model) = get("MODEL") {
            self.model.name = model;
        }
        if let Some(base_url) = get("BASE_URL") {
            self.model.base_url = base_url;
        }
        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: format!("{}PORT", ENV_PREFIX),
                value: port.clone(),
            })?;
        }
        Ok(())
    }

    /// System prompt, or `None` when configured empty
    pub fn system_prompt(&self) -> Option<&str> {
        let prompt = self.agent.system_prompt.trim();
        if prompt.is_empty() {
            None
        } else {
            Some(prompt)
        }
    }

    /// Configured model name, or the default when blank
    pub fn model_name(&self) -> String {
        let name = self.model.name.trim();
        if name.is_empty() {
            default_model()
        } else {
            name.to_string()
        }
    }

    /// Chat endpoint base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.model.base_url.trim_end_matches('/')
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Write a default config to `path` unless one already exists
pub async fn init(path: &Path) -> Result<Config> {
    if path.exists() {
        warn!("Config already exists at {:?}", path);
    } else {
        Config::default().save_to(path).await?;
        info!("Created config at {:?}", path);
    }

    Config::load_from(path).await
}

/// Resolve the config location from an optional CLI override
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(|p| expand_tilde(&p.to_string_lossy()))
        .unwrap_or_else(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_system_prompt_empty_disables() {
        let mut config = Config::default();
        assert!(config.system_prompt().is_some());

        config.agent.system_prompt = "   ".to_string();
        assert!(config.system_prompt().is_none());
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let mut config = Config::default();
        config.model.base_url = "http://ollama:11434/".to_string();
        assert_eq!(config.base_url(), "http://ollama:11434");
    }

    #[test]
    fn test_overrides_ignore_blank_values() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[("SMART_AGENT_MODEL", "  ")]))
            .unwrap();
        assert_eq!(config.model.name, "llama3.1:8b");
    }

    #[test]
    fn test_bind_addr() {
        let config = Config::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_validate_query_timeout() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e300] {
            config.query.timeout_secs = bad;
            match config.validate() {
                Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "query.timeout_secs"),
                other => panic!("Expected InvalidValue for {}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_model_name_falls_back_when_blank() {
        let mut config = Config::default();
        config.model.name = "  ".to_string();
        assert_eq!(config.model_name(), "llama3.1:8b");

        config.model.name = "mistral:7b".to_string();
        assert_eq!(config.model_name(), "mistral:7b");
    }
}
