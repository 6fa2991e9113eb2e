// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Validates required fields and provides sensible defaults for optional ones

use crate::addressing::AddressingStrategy;
use crate::conversation::ModelVersion;
use crate::welcome::{DEFAULT_WELCOME_DIRECT, DEFAULT_WELCOME_GROUP};
use aibot_agent::AgentRegistry;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub matrix: MatrixConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub models: ModelsConfig,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct MatrixConfig {
    #[serde(default)]
    pub home_server: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// Where the Matrix client keeps its sqlite state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<String>,
}

// Custom Debug impl to redact sensitive fields
impl std::fmt::Debug for MatrixConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixConfig")
            .field("home_server", &self.home_server)
            .field("user_id", &self.user_id)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("device_name", &self.device_name)
            .field("store_path", &self.store_path)
            .finish()
    }
}

impl MatrixConfig {
    /// Configured store path, or `<data dir>/matrix_store`
    pub fn store_path(&self) -> PathBuf {
        match &self.store_path {
            Some(path) => PathBuf::from(expand_tilde(path)),
            None => data_dir().join("matrix_store"),
        }
    }
}

fn default_device_name() -> String {
    "aibot".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend type: "agent", "chat", "mock"
    #[serde(rename = "type", default = "default_backend_type")]
    pub backend_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// OpenAI-compatible endpoint base, e.g. "https://api.openai.com/v1"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Enables the agent's web search tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serpapi_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_memory_token_limit")]
    pub memory_token_limit: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("backend_type", &self.backend_type)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field(
                "serpapi_api_key",
                &self.serpapi_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("memory_token_limit", &self.memory_token_limit)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backend_type: default_backend_type(),
            api_key: None,
            base_url: None,
            serpapi_api_key: None,
            temperature: None,
            max_tokens: None,
            memory_token_limit: default_memory_token_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_backend_type() -> String {
    "agent".to_string()
}

fn default_memory_token_limit() -> usize {
    200
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub addressing: AddressingStrategy,
    /// Member ids ending with this are bridge/automation accounts
    pub automation_suffix: String,
    /// Longest accepted input, in characters
    pub max_input_length: usize,
    /// Newest stored turns sent with each prompt; unset sends the whole conversation
    pub max_history_turns: Option<usize>,
    /// Seeded as the first turn of every room conversation
    pub system_prompt: Option<String>,
    pub typing_indicator: bool,
    pub typing_timeout_ms: u64,
    /// Room account-data type marking that the welcome was sent
    pub join_marker_key: String,
    /// Accept room invites automatically
    pub auto_join: bool,
    /// Welcome HTML for one-on-one rooms
    pub welcome_direct: String,
    /// Welcome HTML for group rooms
    pub welcome_group: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            addressing: AddressingStrategy::Prefix,
            automation_suffix: "bot:beeper.local".to_string(),
            max_input_length: 1000,
            max_history_turns: None,
            system_prompt: None,
            typing_indicator: true,
            typing_timeout_ms: 60_000,
            join_marker_key: "aibot.join_message_sent".to_string(),
            auto_join: true,
            welcome_direct: DEFAULT_WELCOME_DIRECT.to_string(),
            welcome_group: DEFAULT_WELCOME_GROUP.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider model name
    pub name: String,
    /// Shown to users in switch confirmations
    pub label: String,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub fast: ModelConfig,
    pub advanced: ModelConfig,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            fast: ModelConfig::new("gpt-3.5-turbo", "GPT-3.5"),
            advanced: ModelConfig::new("gpt-4", "GPT-4"),
        }
    }
}

impl ModelsConfig {
    pub fn get(&self, version: ModelVersion) -> &ModelConfig {
        match version {
            ModelVersion::Fast => &self.fast,
            ModelVersion::Advanced => &self.advanced,
        }
    }
}

/// Expand tilde (~) to home directory in paths
fn expand_tilde(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(base_dirs) = directories::BaseDirs::new() {
            return base_dirs
                .home_dir()
                .join(stripped)
                .to_string_lossy()
                .to_string();
        }
        tracing::warn!(
            path = %path,
            "Failed to expand tilde in path: could not determine home directory"
        );
    }
    path.to_string()
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "aibot")
}

/// ~/.config/aibot on Linux
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".aibot"))
}

/// ~/.local/share/aibot on Linux
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".aibot"))
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Find the config file, checking multiple locations in order:
    /// 1. AIBOT_CONFIG_PATH env var (if set)
    /// 2. ./config.toml (current directory - for development)
    /// 3. ~/.config/aibot/config.toml (XDG config dir)
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var("AIBOT_CONFIG_PATH") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
            tracing::warn!(path = %env_path, "AIBOT_CONFIG_PATH does not exist, ignoring");
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        let xdg_config = config_dir().join("config.toml");
        if xdg_config.exists() {
            return Some(xdg_config);
        }

        None
    }

    /// Load configuration with environment variable overrides.
    /// Searches: AIBOT_CONFIG_PATH env var, ./config.toml, then the XDG config dir.
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Like `load`, but an explicit path wins over the search order
    pub fn load_with(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(),
        };

        let mut config = match path {
            Some(config_path) => {
                tracing::info!(
                    path = %config_path.display(),
                    "Loading configuration from file"
                );
                let content = std::fs::read_to_string(&config_path)
                    .with_context(|| format!("Failed to read {}", config_path.display()))?;
                Self::from_toml(&content)
                    .with_context(|| format!("Failed to parse {}", config_path.display()))?
            }
            None => {
                tracing::info!("No config file found, using environment variables and defaults");
                Config::default()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str::<Config>(content)?)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(val) = env_string("MATRIX_HOME_SERVER") {
            self.matrix.home_server = val;
        }
        if let Some(val) = env_string("MATRIX_USER_ID") {
            self.matrix.user_id = val;
        }
        if let Some(val) = env_string("MATRIX_PASSWORD") {
            self.matrix.password = Some(val);
        }
        if let Some(val) = env_string("MATRIX_ACCESS_TOKEN") {
            self.matrix.access_token = Some(val);
        }
        if let Some(val) = env_string("MATRIX_DEVICE_NAME") {
            self.matrix.device_name = val;
        }
        if let Some(val) = env_string("BACKEND_TYPE") {
            self.backend.backend_type = val;
        }
        if let Some(val) = env_string("OPENAI_API_KEY") {
            self.backend.api_key = Some(val);
        }
        if let Some(val) = env_string("OPENAI_BASE_URL") {
            self.backend.base_url = Some(val);
        }
        if let Some(val) = env_string("SERPAPI_API_KEY") {
            self.backend.serpapi_api_key = Some(val);
        }
        if let Some(val) = env_string("AIBOT_ADDRESSING") {
            self.bot.addressing = val
                .parse()
                .with_context(|| format!("AIBOT_ADDRESSING is invalid, got: {}", val))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.matrix.home_server.trim().is_empty() {
            anyhow::bail!(
                "matrix.home_server is required (set in config.toml or MATRIX_HOME_SERVER env var)"
            );
        }
        if self.matrix.user_id.trim().is_empty() {
            anyhow::bail!(
                "matrix.user_id is required (set in config.toml or MATRIX_USER_ID env var)"
            );
        }
        if !self.matrix.user_id.starts_with('@') || !self.matrix.user_id.contains(':') {
            anyhow::bail!("Invalid Matrix user ID: {}", self.matrix.user_id);
        }
        if self.matrix.password.is_none() && self.matrix.access_token.is_none() {
            anyhow::bail!("Either matrix.password or matrix.access_token is required");
        }

        let backend_type = self.backend.backend_type.as_str();
        let registry = AgentRegistry::default();
        if !registry.contains(backend_type) {
            anyhow::bail!(
                "Unknown backend.type '{}' (expected one of: {})",
                backend_type,
                registry.available().join(", ")
            );
        }
        if backend_type != "mock" && self.backend.api_key.is_none() {
            anyhow::bail!(
                "backend.api_key is required for the {} backend (set in config.toml or OPENAI_API_KEY env var)",
                backend_type
            );
        }

        if self.bot.max_input_length == 0 {
            anyhow::bail!("bot.max_input_length must be greater than zero");
        }
        if self.bot.max_history_turns == Some(0) {
            anyhow::bail!("bot.max_history_turns must be greater than zero when set");
        }
        Ok(())
    }

    /// Settings handed to the backend factory
    pub fn backend_settings(&self) -> Value {
        let mut settings = Map::new();
        let backend = &self.backend;
        if let Some(key) = &backend.api_key {
            settings.insert("api_key".into(), json!(key));
        }
        if let Some(url) = &backend.base_url {
            settings.insert("base_url".into(), json!(url));
        }
        if let Some(key) = &backend.serpapi_api_key {
            settings.insert("serpapi_api_key".into(), json!(key));
        }
        if let Some(temperature) = backend.temperature {
            settings.insert("temperature".into(), json!(temperature));
        }
        if let Some(max_tokens) = backend.max_tokens {
            settings.insert("max_tokens".into(), json!(max_tokens));
        }
        settings.insert(
            "memory_token_limit".into(),
            json!(backend.memory_token_limit),
        );
        settings.insert("timeout_secs".into(), json!(backend.timeout_secs));
        if let Some(prompt) = &self.bot.system_prompt {
            settings.insert("system_prompt".into(), json!(prompt));
        }
        Value::Object(settings)
    }
}
