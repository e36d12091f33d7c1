//! Maps a delegated instruction onto one catalog operation.
//!
//! The model only proposes; the dispatcher still validates everything it
//! receives.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use confidant_core::operations::OperationRegistry;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::llm::{ChatMessage, CompletionRequest, LlmClient, LlmError};
use crate::prompts::{PromptError, PromptLibrary};

#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    Invoke { operation: String, arguments: Value },
    NoSuitableOperation,
}

#[derive(Debug, Error)]
pub enum IntentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("intent reply is not a valid proposal: {0}")]
    Unparseable(String),
}

#[async_trait]
pub trait IntentModel: Send + Sync {
    async fn propose(&self, task_text: &str) -> Result<Intent, IntentError>;
}

pub struct LlmIntentModel {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    catalog: String,
}

impl LlmIntentModel {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptLibrary>,
        registry: &OperationRegistry,
    ) -> Self {
        Self { llm, prompts, catalog: registry.describe() }
    }
}

#[async_trait]
impl IntentModel for LlmIntentModel {
    async fn propose(&self, task_text: &str) -> Result<Intent, IntentError> {
        let today = Utc::now().date_naive().to_string();
        let prompt = self.prompts.intent(&self.catalog, task_text, &today)?;
        // Deterministic mapping; conversational temperature does not apply here.
        let request = CompletionRequest::new(None, vec![ChatMessage::user(prompt)], 0.0);

        let reply = self.llm.complete(&request).await?;
        let intent = parse_intent(&reply)?;
        debug!(event_name = "agent.intent.proposed", intent = ?intent, "intent model replied");
        Ok(intent)
    }
}

/// Accepts a bare JSON object, a fenced ```json block, or an object embedded
/// in surrounding prose.
pub fn parse_intent(reply: &str) -> Result<Intent, IntentError> {
    let candidate = fenced_block(reply).unwrap_or(reply).trim();
    let json = match (candidate.find('{'), candidate.rfind('}')) {
        (Some(start), Some(end)) if start < end => &candidate[start..=end],
        _ => return Err(IntentError::Unparseable("no JSON object found".to_string())),
    };

    let value: Value =
        serde_json::from_str(json).map_err(|error| IntentError::Unparseable(error.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(IntentError::Unparseable("expected a JSON object".to_string()));
    };

    let operation = match object.remove("operation") {
        None | Some(Value::Null) => return Ok(Intent::NoSuitableOperation),
        Some(Value::String(name)) if name.trim().is_empty() => {
            return Ok(Intent::NoSuitableOperation)
        }
        Some(Value::String(name)) => name.trim().to_string(),
        Some(other) => {
            return Err(IntentError::Unparseable(format!("operation must be a string, got {other}")))
        }
    };

    let arguments = match object.remove("arguments") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(Value::Object(arguments)) => Value::Object(arguments),
        Some(other) => {
            return Err(IntentError::Unparseable(format!("arguments must be an object, got {other}")))
        }
    };

    Ok(Intent::Invoke { operation, arguments })
}

fn fenced_block(reply: &str) -> Option<&str> {
    let start = reply.find("```")?;
    let after_fence = &reply[start + 3..];
    let body_start = after_fence.find('\n').map(|index| index + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use confidant_core::operations::OperationRegistry;
    use serde_json::json;

    use super::{parse_intent, Intent, IntentError, IntentModel, LlmIntentModel};
    use crate::llm::ScriptedLlmClient;
    use crate::prompts::PromptLibrary;

    #[test]
    fn parses_a_plain_object() {
        let intent = parse_intent(
            r#"{"operation": "create_task_for", "arguments": {"person_name": "Jane", "title": "Call"}}"#,
        )
        .expect("intent");

        assert_eq!(
            intent,
            Intent::Invoke {
                operation: "create_task_for".to_string(),
                arguments: json!({ "person_name": "Jane", "title": "Call" }),
            }
        );
    }

    #[test]
    fn parses_a_fenced_block() {
        let reply = "Here you go:\n```json\n{\"operation\": \"find_people\", \"arguments\": {\"query\": \"Al\"}}\n```";

        let intent = parse_intent(reply).expect("intent");

        assert!(matches!(intent, Intent::Invoke { ref operation, .. } if operation == "find_people"));
    }

    #[test]
    fn null_operation_means_no_suitable_operation() {
        assert_eq!(
            parse_intent(r#"{"operation": null, "arguments": {}}"#).expect("intent"),
            Intent::NoSuitableOperation
        );
    }

    #[test]
    fn rejects_replies_without_an_object() {
        assert!(matches!(parse_intent("I am not sure."), Err(IntentError::Unparseable(_))));
        assert!(matches!(
            parse_intent(r#"{"operation": "find_people", "arguments": ["Al"]}"#),
            Err(IntentError::Unparseable(_))
        ));
    }

    #[tokio::test]
    async fn prompt_includes_the_catalog_and_the_task() {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"operation": null}"#]));
        let registry = OperationRegistry::standard().expect("registry");
        let model = LlmIntentModel::new(
            llm.clone(),
            Arc::new(PromptLibrary::new().expect("prompts")),
            &registry,
        );

        let intent = model.propose("Remember Jane likes tea").await.expect("intent");

        assert_eq!(intent, Intent::NoSuitableOperation);
        let prompt = &llm.requests()[0].messages[0].content;
        assert!(prompt.contains("remember_something_about"));
        assert!(prompt.contains("Instruction: Remember Jane likes tea"));
    }
}
