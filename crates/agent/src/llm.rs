use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use confidant_core::config::{LlmConfig, LlmProvider};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: Option<String>, messages: Vec<ChatMessage>, temperature: f32) -> Self {
        Self { system, messages, temperature, max_tokens: DEFAULT_MAX_TOKENS }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm client misconfigured: {0}")]
    Configuration(String),
    #[error("llm request timed out: {0}")]
    Timeout(String),
    #[error("llm transport failure: {0}")]
    Transport(String),
    #[error("llm provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm response could not be read: {0}")]
    MalformedResponse(String),
    #[error("scripted llm has no reply left")]
    Exhausted,
}

/// Text completion over a chat transcript.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// One client for the OpenAI-compatible, Anthropic and Ollama chat APIs.
pub struct HttpLlmClient {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = match (&config.base_url, config.provider) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, LlmProvider::OpenAi) => OPENAI_BASE_URL.to_string(),
            (None, LlmProvider::Anthropic) => ANTHROPIC_BASE_URL.to_string(),
            (None, LlmProvider::Ollama) => {
                return Err(LlmError::Configuration("ollama requires llm.base_url".to_string()))
            }
        };
        if config.api_key.is_none() && config.provider != LlmProvider::Ollama {
            return Err(LlmError::Configuration(format!(
                "provider {:?} requires llm.api_key",
                config.provider
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|error| LlmError::Configuration(error.to_string()))?;

        Ok(Self {
            client,
            provider: config.provider,
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn api_key(&self) -> &str {
        self.api_key.as_ref().map(|key| key.expose_secret()).unwrap_or_default()
    }

    async fn post(
        &self,
        path: &str,
        headers: &[(&str, String)],
        body: Value,
    ) -> Result<Value, LlmError> {
        let mut request = self.client.post(format!("{}/{}", self.base_url, path)).json(&body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.send().await.map_err(|error| {
            if error.is_timeout() {
                LlmError::Timeout(error.to_string())
            } else {
                LlmError::Transport(error.to_string())
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }
        response.json().await.map_err(|error| LlmError::MalformedResponse(error.to_string()))
    }

    fn chat_messages(request: &CompletionRequest) -> Vec<Value> {
        let system = request
            .system
            .iter()
            .map(|system| json!({ "role": "system", "content": system }));
        let turns = request
            .messages
            .iter()
            .map(|message| json!({ "role": message.role, "content": message.content }));
        system.chain(turns).collect()
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!(
            event_name = "agent.llm.request",
            provider = ?self.provider,
            model = %self.model,
            messages = request.messages.len(),
            "sending completion request"
        );

        let (payload, pointer) = match self.provider {
            LlmProvider::OpenAi => {
                let body = json!({
                    "model": self.model,
                    "messages": Self::chat_messages(request),
                    "temperature": request.temperature,
                    "max_tokens": request.max_tokens,
                });
                let headers = [("authorization", format!("Bearer {}", self.api_key()))];
                (self.post("chat/completions", &headers, body).await?, "/choices/0/message/content")
            }
            LlmProvider::Anthropic => {
                let mut body = json!({
                    "model": self.model,
                    "messages": request.messages,
                    "temperature": request.temperature,
                    "max_tokens": request.max_tokens,
                });
                if let Some(system) = &request.system {
                    body["system"] = Value::String(system.clone());
                }
                let headers = [
                    ("x-api-key", self.api_key().to_string()),
                    ("anthropic-version", ANTHROPIC_VERSION.to_string()),
                ];
                (self.post("messages", &headers, body).await?, "/content/0/text")
            }
            LlmProvider::Ollama => {
                let body = json!({
                    "model": self.model,
                    "messages": Self::chat_messages(request),
                    "stream": false,
                    "options": { "temperature": request.temperature },
                });
                (self.post("api/chat", &[], body).await?, "/message/content")
            }
        };

        payload.pointer(pointer).and_then(Value::as_str).map(str::to_string).ok_or_else(|| {
            LlmError::MalformedResponse(format!("no completion text at `{pointer}`"))
        })
    }
}

/// Replays canned replies in order and records every request it was sent.
#[derive(Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|reply| Ok(reply.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock_replies().push_back(Ok(reply.into()));
    }

    /// Queues a transport failure as the next reply.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock_replies().push_back(Err(message.into()));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, String>>> {
        match self.replies.lock() {
            Ok(replies) => replies,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
        match self.lock_replies().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(LlmError::Transport(message)),
            None => Err(LlmError::Exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use confidant_core::config::{LlmConfig, LlmProvider};

    use super::{ChatMessage, CompletionRequest, HttpLlmClient, LlmClient, LlmError, ScriptedLlmClient};

    fn config(provider: LlmProvider) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: None,
            base_url: None,
            model: "test-model".to_string(),
            timeout_secs: 5,
            temperature: 0.0,
        }
    }

    #[test]
    fn hosted_providers_need_a_key() {
        let error = HttpLlmClient::from_config(&config(LlmProvider::Anthropic))
            .err()
            .expect("missing key");
        assert!(matches!(error, LlmError::Configuration(_)));
    }

    #[test]
    fn ollama_needs_a_base_url() {
        let mut ollama = config(LlmProvider::Ollama);
        assert!(HttpLlmClient::from_config(&ollama).is_err());

        ollama.base_url = Some("http://localhost:11434/".to_string());
        assert!(HttpLlmClient::from_config(&ollama).is_ok());
    }

    #[test]
    fn chat_messages_put_the_system_prompt_first() {
        let request = CompletionRequest::new(
            Some("be brief".to_string()),
            vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")],
            0.2,
        );

        let messages = HttpLlmClient::chat_messages(&request);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["role"], "assistant");
    }

    #[tokio::test]
    async fn scripted_client_replays_then_runs_dry() {
        let llm = ScriptedLlmClient::new(["first"]);
        llm.push_failure("connection reset");
        let request = CompletionRequest::new(None, vec![ChatMessage::user("hi")], 0.0);

        assert_eq!(llm.complete(&request).await.expect("first"), "first");
        assert!(matches!(llm.complete(&request).await, Err(LlmError::Transport(_))));
        assert!(matches!(llm.complete(&request).await, Err(LlmError::Exhausted)));
        assert_eq!(llm.requests().len(), 3);
    }
}
