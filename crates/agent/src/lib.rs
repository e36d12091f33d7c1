//! Agent runtime: the conversational side of confidant.
//!
//! One turn flows through a constrained loop:
//! 1. **Conversation** (`runtime`) - the LLM talks to the user and may wrap one
//!    instruction in a tag pair.
//! 2. **Delegation** (`delegation`) - the tagged instruction is split from the
//!    text shown to the user.
//! 3. **Intent** (`intent`) - the instruction is mapped onto one catalog
//!    operation with arguments.
//! 4. **Dispatch** - `confidant_core::Dispatcher` validates, resolves names and
//!    executes, always answering with an `Envelope`.
//! 5. **Feedback** (`prompts`) - the envelope is turned into the final reply.
//!
//! # Safety Principle
//!
//! The LLM is strictly a translator. It never writes to the CRM directly;
//! every change goes through the dispatcher's validation and name resolution.

pub mod delegation;
pub mod intent;
pub mod llm;
pub mod prompts;
pub mod runtime;

pub use delegation::{DelimiterPair, Extraction, InstructionExtractor, ProtocolError};
pub use intent::{parse_intent, Intent, IntentError, IntentModel, LlmIntentModel};
pub use llm::{
    ChatMessage, CompletionRequest, HttpLlmClient, LlmClient, LlmError, Role, ScriptedLlmClient,
};
pub use prompts::{PromptError, PromptLibrary};
pub use runtime::{AgentRuntime, TurnOutcome, NO_SUITABLE_OPERATION};
