//! Configuration types for the Mentora server.
//!
//! Configuration is layered: `mentora.json` (or defaults when absent), then
//! environment overrides, then command-line flags applied by the binary.
//! The result is validated after every layer.

use std::path::Path;
use std::time::Duration;

use mentora_llm::{ClientOptions, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::error::{MentoraError, Result};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "mentora.json";

/// Upper bound on `llm.maxRetries`.
pub const MAX_LLM_RETRIES: u32 = 5;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8001
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_store_path() -> String {
    ".mentora/data.json".to_string()
}

fn default_llm_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_llm_model() -> String {
    "gpt-5.1".to_string()
}

const fn default_llm_timeout() -> u64 {
    120
}

const fn default_retry_backoff_ms() -> u64 {
    500
}

/// Main configuration for the Mentora server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind. Zero picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS. `"*"` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Document store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// How quiz submissions are graded.
    #[serde(default)]
    pub quiz_scoring: QuizScoring,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            store: StoreConfig::default(),
            llm: LlmConfig::default(),
            quiz_scoring: QuizScoring::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `mentora.json` in the current directory. If not found,
    /// returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            MentoraError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `mentora.json` in a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `MentoraError::ConfigParseError` if the file exists but contains
    /// invalid JSON or invalid enum values.
    ///
    /// Returns `MentoraError::ConfigValidationError` if the configuration values
    /// are invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(MentoraError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| MentoraError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides from the process environment.
    pub fn apply_process_env(&mut self) {
        self.apply_env_overrides(|key| std::env::var(key).ok());
    }

    /// Applies environment overrides using `lookup` to read variables.
    ///
    /// Recognized variables: `CORS_ORIGINS` (comma separated), `LLM_API_KEY`,
    /// `LLM_ENDPOINT`, `LLM_MODEL`. Empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(origins) = read("CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(api_key) = read("LLM_API_KEY") {
            self.llm.api_key = Some(api_key);
        }
        if let Some(endpoint) = read("LLM_ENDPOINT") {
            self.llm.endpoint = endpoint;
        }
        if let Some(model) = read("LLM_MODEL") {
            self.llm.model = model;
        }
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `MentoraError::ConfigValidationError` if any validation check fails.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(MentoraError::config_validation(
                "host must not be empty",
                "Set host to an interface address such as 0.0.0.0 or 127.0.0.1",
            ));
        }

        if self.cors_origins.is_empty() {
            return Err(MentoraError::config_validation(
                "corsOrigins must list at least one origin",
                "Use [\"*\"] to allow any origin, or list your frontend URLs",
            ));
        }

        if self.store.kind == StoreKind::File && self.store.path.trim().is_empty() {
            return Err(MentoraError::config_validation(
                "store.path must not be empty for the file store",
                "Set store.path in your mentora.json, or use store.kind \"memory\"",
            ));
        }

        if self.llm.endpoint.trim().is_empty() {
            return Err(MentoraError::config_validation(
                "llm.endpoint must not be empty",
                "Set llm.endpoint to your provider's base URL",
            ));
        }

        if self.llm.model.trim().is_empty() {
            return Err(MentoraError::config_validation(
                "llm.model must not be empty",
                "Set llm.model to the model name your provider expects",
            ));
        }

        if self.llm.timeout_secs == 0 {
            return Err(MentoraError::config_validation(
                "llm.timeoutSecs must be greater than 0",
                "Set llm.timeoutSecs to at least 1 second in your mentora.json",
            ));
        }

        if self.llm.max_retries > MAX_LLM_RETRIES {
            return Err(MentoraError::config_validation(
                format!("llm.maxRetries must be at most {MAX_LLM_RETRIES}"),
                "Lower llm.maxRetries; generation requests block until every retry is spent",
            ));
        }

        Ok(())
    }

    /// The `host:port` string to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns `true` if CORS should allow any origin.
    #[must_use]
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o.trim() == "*")
    }
}

/// Which document store backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreKind {
    /// JSON file on disk (default).
    #[default]
    File,
    /// Process memory; lost on exit.
    Memory,
}

impl StoreKind {
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "file" => Some(Self::File),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for StoreKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid store kind '{s}': expected one of 'file', 'memory'"
            ))
        })
    }
}

impl Serialize for StoreKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(match self {
            Self::File => "file",
            Self::Memory => "memory",
        })
    }
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Backend to use.
    #[serde(default)]
    pub kind: StoreKind,

    /// Data file for the file backend.
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            path: default_store_path(),
        }
    }
}

/// LLM provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Model name.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key. Usually supplied through `LLM_API_KEY` instead.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Retries for transient failures (0 disables retrying).
    #[serde(default)]
    pub max_retries: u32,

    /// Base backoff between retries in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key: None,
            timeout_secs: default_llm_timeout(),
            max_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl LlmConfig {
    /// Converts these settings into HTTP client options.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                backoff: Duration::from_millis(self.retry_backoff_ms),
            },
        }
    }
}

/// How quiz submissions are graded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuizScoring {
    /// Legacy behavior: every non-negative answer counts as correct and
    /// quizzes are never stored. Scores carry no information.
    #[default]
    Placeholder,
    /// Generated quizzes are stored and submissions are graded against
    /// the stored answer key.
    Stored,
}

impl QuizScoring {
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "placeholder" => Some(Self::Placeholder),
            "stored" => Some(Self::Stored),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuizScoring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placeholder => write!(f, "placeholder"),
            Self::Stored => write!(f, "stored"),
        }
    }
}

impl<'de> Deserialize<'de> for QuizScoring {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid quiz scoring '{s}': expected one of 'placeholder', 'stored'"
            ))
        })
    }
}

impl Serialize for QuizScoring {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
