pub mod chat;
pub mod config;
pub mod doctor;
pub mod exec;
pub mod extract;
pub mod operations;
pub mod reference;

use serde::Serialize;

use confidant_core::config::LoadOptions;

use crate::bootstrap::{bootstrap, Application, BootstrapError};
use crate::logging::init_logging;

pub const EXIT_OK: u8 = 0;
pub const EXIT_ERROR_ENVELOPE: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn new(exit_code: u8, output: impl Into<String>) -> Self {
        Self { exit_code, output: output.into() }
    }

    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: EXIT_OK, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Loads config, wires the dispatcher and installs logging.
pub(crate) fn start(command: &str, options: LoadOptions) -> Result<Application, CommandResult> {
    let app = bootstrap(options).map_err(|error| {
        let error_class = match error {
            BootstrapError::Config(_) => "config_validation",
            _ => "bootstrap",
        };
        CommandResult::failure(command, error_class, error.to_string(), EXIT_CONFIG)
    })?;
    init_logging(&app.config.logging);
    Ok(app)
}

pub(crate) fn async_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}

pub(crate) fn to_pretty_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        format!(
            "{{\"status\":\"error\",\"message\":\"serialization failed: {}\"}}",
            escape_json(&error.to_string())
        )
    })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            escape_json(&error.to_string())
        )
    })
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
