use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use confidant_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use super::{CommandResult, EXIT_CONFIG, EXIT_OK};

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

impl Field {
    fn new(key: &'static str, env_keys: &'static [&'static str], value: impl Into<String>) -> Self {
        Self { key, env_keys, value: value.into() }
    }
}

pub fn run(options: LoadOptions) -> CommandResult {
    let explicit_path = options.config_path.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::new(EXIT_CONFIG, format!("config validation failed: {error}"))
        }
    };

    let config_file_path = detect_config_path(explicit_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let fields = [
        Field::new("crm.backend", &["CONFIDANT_CRM_BACKEND"], format!("{:?}", config.crm.backend)),
        Field::new("crm.base_url", &["CONFIDANT_CRM_BASE_URL"], config.crm.base_url.clone()),
        Field::new(
            "crm.api_token",
            &["CONFIDANT_CRM_API_TOKEN"],
            redact_token(config.crm.api_token.expose_secret()),
        ),
        Field::new(
            "crm.timeout_secs",
            &["CONFIDANT_CRM_TIMEOUT_SECS"],
            config.crm.timeout_secs.to_string(),
        ),
        Field::new(
            "crm.search_limit",
            &["CONFIDANT_CRM_SEARCH_LIMIT"],
            config.crm.search_limit.to_string(),
        ),
        Field::new("llm.provider", &["CONFIDANT_LLM_PROVIDER"], format!("{:?}", config.llm.provider)),
        Field::new("llm.model", &["CONFIDANT_LLM_MODEL"], config.llm.model.clone()),
        Field::new(
            "llm.base_url",
            &["CONFIDANT_LLM_BASE_URL"],
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        Field::new("llm.api_key", &["CONFIDANT_LLM_API_KEY"], api_key),
        Field::new(
            "llm.timeout_secs",
            &["CONFIDANT_LLM_TIMEOUT_SECS"],
            config.llm.timeout_secs.to_string(),
        ),
        Field::new(
            "llm.temperature",
            &["CONFIDANT_LLM_TEMPERATURE"],
            config.llm.temperature.to_string(),
        ),
        Field::new("agent.open_tag", &["CONFIDANT_AGENT_OPEN_TAG"], config.agent.open_tag.clone()),
        Field::new("agent.close_tag", &["CONFIDANT_AGENT_CLOSE_TAG"], config.agent.close_tag.clone()),
        Field::new(
            "agent.match_policy",
            &["CONFIDANT_AGENT_MATCH_POLICY"],
            format!("{:?}", config.agent.match_policy),
        ),
        Field::new(
            "logging.level",
            &["CONFIDANT_LOGGING_LEVEL", "CONFIDANT_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        Field::new(
            "logging.format",
            &["CONFIDANT_LOGGING_FORMAT", "CONFIDANT_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|field| {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        render_line(field.key, &field.value, source)
    }));

    CommandResult::new(EXIT_OK, lines.join("\n"))
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("confidant.toml"), PathBuf::from("config/confidant.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the first four characters of long tokens so operators can tell
/// tokens apart.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let prefix: String = trimmed.chars().take(4).collect();
    if trimmed.chars().count() > 12 {
        return format!("{prefix}***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_token};

    #[test]
    fn redacts_tokens() {
        assert_eq!(redact_token(""), "<empty>");
        assert_eq!(redact_token("short"), "<redacted>");
        assert_eq!(redact_token("eyJ0eXAiOiJKV1QiLCJhbGciOi"), "eyJ0***");
    }

    #[test]
    fn finds_nested_keys() {
        let doc: toml::Value = "[crm]\nbase_url = \"https://crm.test/api\"".parse().expect("toml");

        assert!(contains_path(&doc, "crm.base_url"));
        assert!(!contains_path(&doc, "crm.api_token"));
        assert!(!contains_path(&doc, "llm.model"));
    }
}
