use serde_json::Value;
use tera::{Context, Tera};
use thiserror::Error;

use crate::delegation::DelimiterPair;

pub const ORCHESTRATOR_TEMPLATE: &str = "orchestrator.txt";
pub const INTENT_TEMPLATE: &str = "intent.txt";
pub const FEEDBACK_TEMPLATE: &str = "feedback.txt";

const ORCHESTRATOR: &str = r#"You are a warm, attentive friend who helps the user keep track of the people in their life.

Gather complete information before acting. If the user mentions someone new, ask a natural follow-up (their last name, how they met). If a name is common or ambiguous, ask which person they mean.

When you have a complete batch of information, or the user asks a direct question about someone, summarize it as ONE precise instruction for your data assistant and wrap it exactly like this:
{{ open_tag }}Instruction goes here{{ close_tag }}

Use the tags at most once per reply and never when you still need more information.
Today is {{ today }}."#;

const INTENT: &str = r#"You map one instruction onto exactly one operation from the catalog below.

Catalog:
{{ catalog }}

Rules:
- Reply with a single JSON object and nothing else: {"operation": "<name>", "arguments": {...}}
- Refer to people, relationship types, mediums, genders and activity types by name; never invent ids.
- Dates are ISO YYYY-MM-DD. Today is {{ today }}.
- If no operation fits, reply {"operation": null, "arguments": {}}.

Instruction: {{ task }}"#;

const FEEDBACK: &str = r#"Background step, do not mention an assistant, tools or JSON.
The action you asked for has finished with this result:
{{ envelope }}
{% if success %}Give the user a short, natural confirmation of what was done.{% else %}Apologize briefly and explain the problem in plain words: {{ message }}
If it is about several people sharing a name, ask which one they meant.{% endif %}
Reply with the user-facing message only."#;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt template error: {0}")]
    Template(#[from] tera::Error),
}

/// Prompt templates rendered with tera. Built-in templates can be replaced
/// with [`PromptLibrary::override_template`].
#[derive(Clone, Debug)]
pub struct PromptLibrary {
    tera: Tera,
}

impl PromptLibrary {
    pub fn new() -> Result<Self, PromptError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (ORCHESTRATOR_TEMPLATE, ORCHESTRATOR),
            (INTENT_TEMPLATE, INTENT),
            (FEEDBACK_TEMPLATE, FEEDBACK),
        ])?;
        Ok(Self { tera })
    }

    pub fn override_template(&mut self, name: &str, body: &str) -> Result<(), PromptError> {
        self.tera.add_raw_template(name, body)?;
        Ok(())
    }

    pub fn orchestrator(&self, delimiters: &DelimiterPair, today: &str) -> Result<String, PromptError> {
        let mut context = Context::new();
        context.insert("open_tag", delimiters.open());
        context.insert("close_tag", delimiters.close());
        context.insert("today", today);
        Ok(self.tera.render(ORCHESTRATOR_TEMPLATE, &context)?)
    }

    pub fn intent(&self, catalog: &str, task: &str, today: &str) -> Result<String, PromptError> {
        let mut context = Context::new();
        context.insert("catalog", catalog);
        context.insert("task", task);
        context.insert("today", today);
        Ok(self.tera.render(INTENT_TEMPLATE, &context)?)
    }

    pub fn feedback(&self, envelope: &Value) -> Result<String, PromptError> {
        let success = envelope.get("status").and_then(Value::as_str) == Some("success");
        let message = envelope.get("message").and_then(Value::as_str).unwrap_or_default();

        let mut context = Context::new();
        context.insert("envelope", &envelope.to_string());
        context.insert("success", &success);
        context.insert("message", message);
        Ok(self.tera.render(FEEDBACK_TEMPLATE, &context)?)
    }
}
