use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub crm: CrmConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct CrmConfig {
    pub backend: CrmBackend,
    pub base_url: String,
    pub api_token: SecretString,
    pub timeout_secs: u64,
    pub search_limit: u32,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub open_tag: String,
    pub close_tag: String,
    pub match_policy: MatchPolicy,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrmBackend {
    Http,
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
}

/// How a partial name is narrowed to a single contact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// A single candidate whose full name contains the query wins.
    #[default]
    Substring,
    /// Only a case-insensitive full-name equality wins.
    Exact,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub crm_backend: Option<CrmBackend>,
    pub crm_base_url: Option<String>,
    pub crm_api_token: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub match_policy: Option<MatchPolicy>,
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
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const DEFAULT_OPEN_TAG: &str = "<commit_task>";
pub const DEFAULT_CLOSE_TAG: &str = "</commit_task>";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            crm: CrmConfig {
                backend: CrmBackend::Http,
                base_url: "http://localhost:8080/api".to_string(),
                api_token: String::new().into(),
                timeout_secs: 30,
                search_limit: 10,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 60,
                temperature: 0.0,
            },
            agent: AgentConfig {
                open_tag: DEFAULT_OPEN_TAG.to_string(),
                close_tag: DEFAULT_CLOSE_TAG.to_string(),
                match_policy: MatchPolicy::Substring,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for CrmBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Validation(format!(
                "unsupported crm backend `{other}` (expected http|memory)"
            ))),
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

impl std::str::FromStr for MatchPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "substring" => Ok(Self::Substring),
            "exact" => Ok(Self::Exact),
            other => Err(ConfigError::Validation(format!(
                "unsupported match policy `{other}` (expected substring|exact)"
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("confidant.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(crm) = patch.crm {
            if let Some(backend) = crm.backend {
                self.crm.backend = backend;
            }
            if let Some(base_url) = crm.base_url {
                self.crm.base_url = base_url;
            }
            if let Some(api_token) = crm.api_token {
                self.crm.api_token = secret_value(api_token);
            }
            if let Some(timeout_secs) = crm.timeout_secs {
                self.crm.timeout_secs = timeout_secs;
            }
            if let Some(search_limit) = crm.search_limit {
                self.crm.search_limit = search_limit;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(open_tag) = agent.open_tag {
                self.agent.open_tag = open_tag;
            }
            if let Some(close_tag) = agent.close_tag {
                self.agent.close_tag = close_tag;
            }
            if let Some(match_policy) = agent.match_policy {
                self.agent.match_policy = match_policy;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CONFIDANT_CRM_BACKEND") {
            self.crm.backend = value.parse()?;
        }
        if let Some(value) = read_env("CONFIDANT_CRM_BASE_URL") {
            self.crm.base_url = value;
        }
        if let Some(value) = read_env("CONFIDANT_CRM_API_TOKEN") {
            self.crm.api_token = secret_value(value);
        }
        if let Some(value) = read_env("CONFIDANT_CRM_TIMEOUT_SECS") {
            self.crm.timeout_secs = parse_u64("CONFIDANT_CRM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CONFIDANT_CRM_SEARCH_LIMIT") {
            self.crm.search_limit = parse_u32("CONFIDANT_CRM_SEARCH_LIMIT", &value)?;
        }

        if let Some(value) = read_env("CONFIDANT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("CONFIDANT_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CONFIDANT_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("CONFIDANT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("CONFIDANT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("CONFIDANT_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CONFIDANT_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("CONFIDANT_LLM_TEMPERATURE", &value)?;
        }

        if let Some(value) = read_env("CONFIDANT_AGENT_OPEN_TAG") {
            self.agent.open_tag = value;
        }
        if let Some(value) = read_env("CONFIDANT_AGENT_CLOSE_TAG") {
            self.agent.close_tag = value;
        }
        if let Some(value) = read_env("CONFIDANT_AGENT_MATCH_POLICY") {
            self.agent.match_policy = value.parse()?;
        }

        let log_level =
            read_env("CONFIDANT_LOGGING_LEVEL").or_else(|| read_env("CONFIDANT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CONFIDANT_LOGGING_FORMAT").or_else(|| read_env("CONFIDANT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(backend) = overrides.crm_backend {
            self.crm.backend = backend;
        }
        if let Some(base_url) = overrides.crm_base_url {
            self.crm.base_url = base_url;
        }
        if let Some(api_token) = overrides.crm_api_token {
            self.crm.api_token = secret_value(api_token);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(match_policy) = overrides.match_policy {
            self.agent.match_policy = match_policy;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_crm(&self.crm)?;
        validate_llm(&self.llm)?;
        validate_agent(&self.agent)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("confidant.toml"), PathBuf::from("config/confidant.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_crm(crm: &CrmConfig) -> Result<(), ConfigError> {
    if crm.timeout_secs == 0 || crm.timeout_secs > 300 {
        return Err(ConfigError::Validation("crm.timeout_secs must be in range 1..=300".to_string()));
    }

    if crm.search_limit == 0 || crm.search_limit > 100 {
        return Err(ConfigError::Validation("crm.search_limit must be in range 1..=100".to_string()));
    }

    if crm.backend == CrmBackend::Memory {
        return Ok(());
    }

    let base_url = crm.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "crm.base_url must start with http:// or https:// (e.g. https://monica.example.com/api)"
                .to_string(),
        ));
    }

    if crm.api_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "crm.api_token is required for the http backend. Create a personal access token under Settings > API in your CRM, or set crm.backend = \"memory\"".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    if agent.open_tag.trim().is_empty() || agent.close_tag.trim().is_empty() {
        return Err(ConfigError::Validation(
            "agent.open_tag and agent.close_tag must not be empty".to_string(),
        ));
    }

    if agent.open_tag == agent.close_tag {
        return Err(ConfigError::Validation(
            "agent.open_tag and agent.close_tag must differ".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    crm: Option<CrmPatch>,
    llm: Option<LlmPatch>,
    agent: Option<AgentPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CrmPatch {
    backend: Option<CrmBackend>,
    base_url: Option<String>,
    api_token: Option<String>,
    timeout_secs: Option<u64>,
    search_limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    open_tag: Option<String>,
    close_tag: Option<String>,
    match_policy: Option<MatchPolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
