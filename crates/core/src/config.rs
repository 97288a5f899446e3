use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

/// Effective application configuration. Defaults are overlaid by an optional
/// TOML file, then `SIERRA_*` environment variables, then programmatic
/// overrides, and the result is validated before use.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data: DataConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DataConfig {
    pub catalog_path: PathBuf,
    pub orders_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Policy constants of the dialogue core. These are deliberately
/// configuration rather than code: thresholds and windows are tuning knobs,
/// not invariants.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub similarity_threshold: f32,
    pub history_window: usize,
    pub rule_confidence: f32,
    pub fallback_confidence: f32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub catalog_path: Option<PathBuf>,
    pub orders_path: Option<PathBuf>,
    pub llm_enabled: Option<bool>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub similarity_threshold: Option<f32>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig {
                catalog_path: PathBuf::from("data/ProductCatalog.json"),
                orders_path: PathBuf::from("data/CustomerOrders.json"),
            },
            llm: LlmConfig {
                enabled: false,
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434/v1".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 10,
                max_retries: 2,
            },
            agent: AgentConfig {
                similarity_threshold: 0.72,
                history_window: 10,
                rule_confidence: 0.85,
                fallback_confidence: 0.4,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    data: Option<DataPatch>,
    llm: Option<LlmPatch>,
    agent: Option<AgentPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    catalog_path: Option<PathBuf>,
    orders_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    enabled: Option<bool>,
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    similarity_threshold: Option<f32>,
    history_window: Option<usize>,
    rule_confidence: Option<f32>,
    fallback_confidence: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let maybe_path = resolve_config_path(options.config_path.as_deref());
        match maybe_path {
            Some(path) if path.exists() => {
                config.apply_patch(read_patch(&path)?);
            }
            Some(path) if options.require_file => {
                return Err(ConfigError::MissingConfigFile(path));
            }
            _ => {}
        }

        config.apply_env(|key| env::var(key).ok())?;
        config.apply_overrides(&options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(data) = patch.data {
            apply_some(&mut self.data.catalog_path, data.catalog_path);
            apply_some(&mut self.data.orders_path, data.orders_path);
        }
        if let Some(llm) = patch.llm {
            apply_some(&mut self.llm.enabled, llm.enabled);
            apply_some(&mut self.llm.provider, llm.provider);
            if let Some(key) = llm.api_key {
                self.llm.api_key = Some(key.into());
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            apply_some(&mut self.llm.model, llm.model);
            apply_some(&mut self.llm.timeout_secs, llm.timeout_secs);
            apply_some(&mut self.llm.max_retries, llm.max_retries);
        }
        if let Some(agent) = patch.agent {
            apply_some(&mut self.agent.similarity_threshold, agent.similarity_threshold);
            apply_some(&mut self.agent.history_window, agent.history_window);
            apply_some(&mut self.agent.rule_confidence, agent.rule_confidence);
            apply_some(&mut self.agent.fallback_confidence, agent.fallback_confidence);
        }
        if let Some(server) = patch.server {
            apply_some(&mut self.server.bind_address, server.bind_address);
            apply_some(&mut self.server.port, server.port);
        }
        if let Some(logging) = patch.logging {
            apply_some(&mut self.logging.level, logging.level);
            apply_some(&mut self.logging.format, logging.format);
        }
    }

    /// Applies `SIERRA_*` overrides sourced from the given lookup. Taking the
    /// lookup as a closure keeps this testable without mutating process env.
    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SIERRA_CATALOG_PATH") {
            self.data.catalog_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("SIERRA_ORDERS_PATH") {
            self.data.orders_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("SIERRA_LLM_ENABLED") {
            self.llm.enabled = parse_env("SIERRA_LLM_ENABLED", &value)?;
        }
        if let Some(value) = lookup("SIERRA_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = lookup("SIERRA_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = lookup("SIERRA_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = lookup("SIERRA_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = lookup("SIERRA_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_env("SIERRA_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("SIERRA_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_env("SIERRA_LLM_MAX_RETRIES", &value)?;
        }
        if let Some(value) = lookup("SIERRA_AGENT_SIMILARITY_THRESHOLD") {
            self.agent.similarity_threshold =
                parse_env("SIERRA_AGENT_SIMILARITY_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("SIERRA_AGENT_HISTORY_WINDOW") {
            self.agent.history_window = parse_env("SIERRA_AGENT_HISTORY_WINDOW", &value)?;
        }
        if let Some(value) = lookup("SIERRA_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = lookup("SIERRA_SERVER_PORT") {
            self.server.port = parse_env("SIERRA_SERVER_PORT", &value)?;
        }
        if let Some(value) = lookup("SIERRA_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = lookup("SIERRA_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(path) = &overrides.catalog_path {
            self.data.catalog_path = path.clone();
        }
        if let Some(path) = &overrides.orders_path {
            self.data.orders_path = path.clone();
        }
        apply_some(&mut self.llm.enabled, overrides.llm_enabled);
        apply_some(&mut self.llm.provider, overrides.llm_provider);
        if let Some(key) = &overrides.llm_api_key {
            self.llm.api_key = Some(key.clone().into());
        }
        if let Some(model) = &overrides.llm_model {
            self.llm.model = model.clone();
        }
        apply_some(&mut self.agent.similarity_threshold, overrides.similarity_threshold);
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.agent.similarity_threshold)
            || self.agent.similarity_threshold == 0.0
        {
            return Err(ConfigError::Validation(format!(
                "agent.similarity_threshold must be in (0.0, 1.0], got {}",
                self.agent.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.agent.rule_confidence) {
            return Err(ConfigError::Validation(
                "agent.rule_confidence must be in [0.0, 1.0]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.agent.fallback_confidence) {
            return Err(ConfigError::Validation(
                "agent.fallback_confidence must be in [0.0, 1.0]".to_string(),
            ));
        }
        if self.agent.history_window < 2 {
            return Err(ConfigError::Validation(
                "agent.history_window must hold at least one exchange (>= 2)".to_string(),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Validation("llm.timeout_secs must be > 0".to_string()));
        }
        if self.llm.enabled
            && self.llm.provider != LlmProvider::Ollama
            && self.llm.api_key.is_none()
        {
            return Err(ConfigError::Validation(
                "llm.api_key is required when the llm fallback is enabled for a hosted provider"
                    .to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port must be non-zero".to_string()));
        }
        Ok(())
    }
}

fn apply_some<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = env::var("SIERRA_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let default = PathBuf::from("sierra.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}
