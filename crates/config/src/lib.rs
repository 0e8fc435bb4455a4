//! Configuration loading, validation, and management for Quarry.
//!
//! Loads configuration from `~/.quarry/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup:
//! a bad config is a setup error and nothing runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder for the tool list in the system template.
pub const TOOL_DESCRIPTIONS_PLACEHOLDER: &str = "{tool_descriptions}";
/// Placeholder for the discovered schema in the system template.
pub const DB_INFO_PLACEHOLDER: &str = "{initial_db_info}";

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the reasoning service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// HTTP timeout for one reasoning-service call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Tasks run by `quarry run` when none are given on the command line
    #[serde(default = "default_tasks")]
    pub tasks: Vec<String>,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub prompts: PromptConfig,
}

fn default_api_base() -> String {
    "https://api.siliconflow.cn/v1".into()
}
fn default_model() -> String {
    "mistralai/mixtral-8x7b-instruct-v0.1".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_request_timeout_secs() -> u64 {
    60
}
fn default_tasks() -> Vec<String> {
    vec![
        "Analyse the complaint calls: what are the main issues and trends, and where are the potential risks?".into(),
        "Find sales enquiry calls longer than 300 seconds. Which of these callers look like high-value prospects?".into(),
        "Based on call content and sentiment, which product or service features are customers least satisfied with?".into(),
        "Over the last week of data, which call type is most common and what is its average duration?".into(),
    ]
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
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("tasks", &self.tasks)
            .field("agent", &self.agent)
            .field("dataset", &self.dataset)
            .field("prompts", &self.prompts)
            .finish()
    }
}

/// Agent loop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Reasoning-service round trips per task
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Characters an observation may take before it is truncated
    #[serde(default = "default_observation_limit")]
    pub observation_limit: usize,

    /// Rows kept when a tabular observation is truncated
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

fn default_max_steps() -> u32 {
    10
}
fn default_observation_limit() -> usize {
    2000
}
fn default_preview_rows() -> usize {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            observation_limit: default_observation_limit(),
            preview_rows: default_preview_rows(),
        }
    }
}

/// Where the data comes from and where it is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,

    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// SQLite file (or `:memory:`)
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Columns normalized to `YYYY-MM-DD HH:MM:SS` on load
    #[serde(default = "default_datetime_columns")]
    pub datetime_columns: Vec<String>,
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("data/sample_call_records.csv")
}
fn default_table_name() -> String {
    "call_records".into()
}
fn default_database_path() -> String {
    "quarry.db".into()
}
fn default_datetime_columns() -> Vec<String> {
    vec!["call_time".into()]
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            table_name: default_table_name(),
            database_path: default_database_path(),
            datetime_columns: default_datetime_columns(),
        }
    }
}

/// Prompt templates and tool descriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// System turn; must contain `{tool_descriptions}` and `{initial_db_info}`
    #[serde(default = "default_system_template")]
    pub system_template: String,

    /// Logged with the schema-discovery step
    #[serde(default = "default_schema_discovery_query")]
    pub schema_discovery_query: String,

    #[serde(default = "default_sql_query_description")]
    pub sql_query_description: String,

    #[serde(default = "default_describe_table_description")]
    pub describe_table_description: String,
}

fn default_system_template() -> String {
    r#"You are a careful data analyst. You answer questions about a SQLite database by calling tools and reasoning over their results.

Available tools:
{tool_descriptions}

Database information:
{initial_db_info}

Guidelines:
- Use the tools to look at the data before drawing conclusions. Prefer aggregate queries over selecting many raw rows.
- Only use SQLite syntax.
- If you cannot call tools natively, write a single line of the form: Action: tool_name(arg="value")
- Prefix intermediate reasoning with "Thought:".
- When you are done, reply with "Final Answer:" followed by your answer."#
        .into()
}
fn default_schema_discovery_query() -> String {
    "What columns and types does the primary table have?".into()
}
fn default_sql_query_description() -> String {
    "Executes a SQL query on the 'call_records' database and returns the result rows. Use valid SQLite syntax.".into()
}
fn default_describe_table_description() -> String {
    "Returns the schema of a specified table: column names, data types, nullability and primary-key flags.".into()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_template: default_system_template(),
            schema_discovery_query: default_schema_discovery_query(),
            sql_query_description: default_sql_query_description(),
            describe_table_description: default_describe_table_description(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.quarry/config.toml).
    ///
    /// Also checks environment variables:
    /// - `QUARRY_API_KEY` (highest priority), `SILICONFLOW_API_KEY`, `OPENAI_API_KEY`
    /// - `QUARRY_API_BASE` or `LLM_API_BASE`
    /// - `QUARRY_MODEL` or `LLM_MODEL_NAME`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
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

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let first = |keys: &[&str]| keys.iter().find_map(|k| var(*k));

        if let Some(key) = var("QUARRY_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            self.api_key = first(&["SILICONFLOW_API_KEY", "OPENAI_API_KEY"]);
        }
        if let Some(base) = first(&["QUARRY_API_BASE", "LLM_API_BASE"]) {
            self.api_base = base;
        }
        if let Some(model) = first(&["QUARRY_MODEL", "LLM_MODEL_NAME"]) {
            self.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".quarry")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }
        if self.agent.observation_limit == 0 {
            return Err(ConfigError::ValidationError(
                "agent.observation_limit must be > 0".into(),
            ));
        }
        if self.dataset.table_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "dataset.table_name must not be empty".into(),
            ));
        }
        for placeholder in [TOOL_DESCRIPTIONS_PLACEHOLDER, DB_INFO_PLACEHOLDER] {
            if !self.prompts.system_template.contains(placeholder) {
                return Err(ConfigError::ValidationError(format!(
                    "prompts.system_template is missing the {placeholder} placeholder"
                )));
            }
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Generate a default config TOML string (for `init`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            tasks: default_tasks(),
            agent: AgentConfig::default(),
            dataset: DatasetConfig::default(),
            prompts: PromptConfig::default(),
        }
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
