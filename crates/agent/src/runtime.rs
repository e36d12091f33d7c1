use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use confidant_core::dispatch::Dispatcher;
use confidant_core::envelope::Envelope;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::delegation::InstructionExtractor;
use crate::intent::{Intent, IntentModel};
use crate::llm::{ChatMessage, CompletionRequest, LlmClient};
use crate::prompts::PromptLibrary;

pub const NO_SUITABLE_OPERATION: &str = "no suitable operation";

/// Everything produced while handling one user turn.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub display_text: Option<String>,
    pub task_text: Option<String>,
    pub envelope: Option<Envelope>,
    /// The text to show the user.
    pub reply: String,
}

pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    intent: Arc<dyn IntentModel>,
    dispatcher: Dispatcher,
    extractor: InstructionExtractor,
    prompts: Arc<PromptLibrary>,
    temperature: f32,
    history: Mutex<Vec<ChatMessage>>,
}

impl AgentRuntime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        intent: Arc<dyn IntentModel>,
        dispatcher: Dispatcher,
        extractor: InstructionExtractor,
        prompts: Arc<PromptLibrary>,
        temperature: f32,
    ) -> Self {
        Self {
            llm,
            intent,
            dispatcher,
            extractor,
            prompts,
            temperature,
            history: Mutex::new(Vec::new()),
        }
    }

    pub async fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().await.clone()
    }

    pub async fn reset(&self) {
        self.history.lock().await.clear();
    }

    /// Runs one dialogue turn. Dispatch failures are reported in the reply;
    /// only a failing conversational completion fails the turn.
    pub async fn handle_turn(&self, user_text: &str) -> Result<TurnOutcome> {
        let today = Utc::now().date_naive().to_string();
        let system = self.prompts.orchestrator(self.extractor.delimiters(), &today)?;

        let mut history = self.history.lock().await;
        history.push(ChatMessage::user(user_text));
        let request = CompletionRequest::new(Some(system.clone()), history.clone(), self.temperature);
        let assistant_turn = match self.llm.complete(&request).await {
            Ok(turn) => turn,
            Err(error) => {
                history.pop();
                return Err(error).context("conversational completion failed");
            }
        };
        history.push(ChatMessage::assistant(assistant_turn.clone()));

        let extraction = self.extractor.extract(&assistant_turn);
        let Some(task_text) = extraction.task_text.clone() else {
            return Ok(TurnOutcome {
                reply: extraction.display_text.clone().unwrap_or_default(),
                display_text: extraction.display_text,
                task_text: None,
                envelope: None,
            });
        };

        info!(event_name = "agent.turn.delegated", task = %task_text, "assistant delegated a task");
        let envelope = self.run_task(&task_text).await;

        let feedback = self.prompts.feedback(&serde_json::to_value(&envelope)?)?;
        history.push(ChatMessage::user(feedback));
        let request = CompletionRequest::new(Some(system), history.clone(), self.temperature);
        let reply = match self.llm.complete(&request).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    event_name = "agent.turn.feedback_failed",
                    error = %error,
                    "falling back to a plain result message"
                );
                plain_feedback(&envelope)
            }
        };
        history.push(ChatMessage::assistant(reply.clone()));

        Ok(TurnOutcome {
            display_text: extraction.display_text,
            task_text: Some(task_text),
            envelope: Some(envelope),
            reply,
        })
    }

    async fn run_task(&self, task_text: &str) -> Envelope {
        match self.intent.propose(task_text).await {
            Ok(Intent::Invoke { operation, arguments }) => {
                self.dispatcher.execute(&operation, arguments).await
            }
            Ok(Intent::NoSuitableOperation) => Envelope::success(NO_SUITABLE_OPERATION),
            Err(error) => {
                warn!(event_name = "agent.intent.failed", error = %error, "intent model failed");
                Envelope::Error { message: format!("Could not map the request: {error}"), kind: None }
            }
        }
    }
}

fn plain_feedback(envelope: &Envelope) -> String {
    match envelope {
        Envelope::Success { .. } => "Done.".to_string(),
        Envelope::Error { message, .. } => format!("Sorry, that did not work: {message}"),
    }
}
