use std::sync::Arc;

use confidant_agent::delegation::{DelimiterPair, InstructionExtractor, ProtocolError};
use confidant_agent::intent::LlmIntentModel;
use confidant_agent::llm::{HttpLlmClient, LlmClient, LlmError};
use confidant_agent::prompts::{PromptError, PromptLibrary};
use confidant_agent::runtime::AgentRuntime;
use confidant_core::audit::{AuditSink, CallCounter, FanoutAuditSink, TracingAuditSink};
use confidant_core::config::{AppConfig, ConfigError, LoadOptions};
use confidant_core::dispatch::Dispatcher;
use confidant_core::errors::StoreError;
use confidant_core::operations::{OperationRegistry, RegistryError};
use confidant_core::store::CrmStore;
use thiserror::Error;
use tracing::info;

/// Everything a command needs to talk to the CRM.
pub struct Application {
    pub config: AppConfig,
    pub store: Arc<dyn CrmStore>,
    pub registry: Arc<OperationRegistry>,
    pub dispatcher: Dispatcher,
    pub calls: CallCounter,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("crm store setup failed: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("invalid agent delimiters: {0}")]
    Delimiters(#[from] ProtocolError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let store = confidant_store::connect(&config.crm)?;
    let registry = Arc::new(OperationRegistry::standard()?);

    let calls = CallCounter::default();
    let sinks: Vec<Arc<dyn AuditSink>> = vec![Arc::new(TracingAuditSink), Arc::new(calls.clone())];
    let sink: Arc<dyn AuditSink> = Arc::new(FanoutAuditSink::new(sinks));
    let dispatcher =
        Dispatcher::new(store.clone(), registry.clone(), sink, config.agent.match_policy);

    info!(
        event_name = "system.bootstrap.ready",
        backend = ?config.crm.backend,
        match_policy = ?config.agent.match_policy,
        operations = registry.names().len(),
        "dispatcher ready"
    );

    Ok(Application { config, store, registry, dispatcher, calls })
}

impl Application {
    /// Wires the conversational runtime on top of the dispatcher.
    pub fn agent_runtime(&self) -> Result<AgentRuntime, BootstrapError> {
        let llm: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::from_config(&self.config.llm)?);
        self.agent_runtime_with(llm)
    }

    pub fn agent_runtime_with(&self, llm: Arc<dyn LlmClient>) -> Result<AgentRuntime, BootstrapError> {
        let prompts = Arc::new(PromptLibrary::new()?);
        let intent = Arc::new(LlmIntentModel::new(llm.clone(), prompts.clone(), &self.registry));
        let extractor = InstructionExtractor::new(DelimiterPair::new(
            self.config.agent.open_tag.clone(),
            self.config.agent.close_tag.clone(),
        )?);

        Ok(AgentRuntime::new(
            llm,
            intent,
            self.dispatcher.clone(),
            extractor,
            prompts,
            self.config.llm.temperature,
        ))
    }
}
