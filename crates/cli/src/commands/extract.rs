use confidant_agent::delegation::{DelimiterPair, InstructionExtractor};
use confidant_core::config::{AppConfig, LoadOptions};
use serde_json::json;

use super::{to_pretty_json, CommandResult, EXIT_CONFIG, EXIT_OK};

/// Splits an assistant turn with the configured tag pair. Malformed markup is
/// reported alongside the recovered split.
pub fn run(options: LoadOptions, text: &str) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("extract", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };
    let pair = match DelimiterPair::new(config.agent.open_tag, config.agent.close_tag) {
        Ok(pair) => pair,
        Err(error) => {
            return CommandResult::failure("extract", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };

    let extractor = InstructionExtractor::new(pair);
    let malformed = extractor.parse(text).err().map(|error| error.to_string());
    let extraction = extractor.extract(text);

    CommandResult::new(
        EXIT_OK,
        to_pretty_json(&json!({
            "display_text": extraction.display_text,
            "task_text": extraction.task_text,
            "malformed": malformed,
        })),
    )
}
