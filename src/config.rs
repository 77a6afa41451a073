//! Configuration module for the wrapper pipeline.
//!
//! Loads configuration from YAML files and environment variables.

use std::path::PathBuf;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    pub safety: SafetyConfig,
    pub storage: StorageConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Generator (model) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Adapter to use: `openrouter` or `echo`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier passed to the provider and written to the audit log.
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Safety wrapper configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SafetyConfig {
    /// Policy name, e.g. `keyword_filter` or `query_budget`.
    pub policy: String,
    /// Keywords that mark a model output as unsafe.
    #[serde(default)]
    pub banned_keywords: Vec<String>,
    /// Exact text returned whenever a run resolves to BLOCK.
    pub safe_refusal: String,
    /// Window size for the history-aware policy.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Requery budget per prompt for the query-budget policy.
    #[serde(default = "default_max_requeries")]
    pub max_requeries: u32,
    /// Optional hard cap on generation calls per run.
    #[serde(default)]
    pub max_rounds: Option<u32>,
}

/// Append-only log locations.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Audit log, one JSON record per run.
    pub log_file: PathBuf,
    /// Persisted conversation history, one JSON entry per run.
    pub history_file: PathBuf,
}

fn default_provider() -> String {
    "echo".to_string()
}

fn default_model_name() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    256
}

fn default_history_limit() -> usize {
    5
}

fn default_max_requeries() -> u32 {
    2
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (WRAPPER_*)
    /// 2. config/local.yaml (if exists)
    /// 3. config/default.yaml
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            // Start with default config
            .add_source(File::with_name("config/default").required(false))
            // Layer on local overrides
            .add_source(File::with_name("config/local").required(false))
            // Layer on environment variables with WRAPPER_ prefix
            .add_source(
                Environment::with_prefix("WRAPPER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            name: default_model_name(),
            api_key: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            policy: "keyword_filter".to_string(),
            banned_keywords: vec![
                "bomb".to_string(),
                "kill".to_string(),
                "weapon".to_string(),
            ],
            safe_refusal: "I'm sorry, but I can't help with that request.".to_string(),
            history_limit: default_history_limit(),
            max_requeries: default_max_requeries(),
            max_rounds: None,
        }
    }
}
