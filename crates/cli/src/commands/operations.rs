use confidant_core::operations::OperationRegistry;

use super::{to_pretty_json, CommandResult, EXIT_OK, EXIT_RUNTIME};

pub fn run(json_output: bool) -> CommandResult {
    let registry = match OperationRegistry::standard() {
        Ok(registry) => registry,
        Err(error) => {
            return CommandResult::failure("operations", "registry", error.to_string(), EXIT_RUNTIME)
        }
    };

    if json_output {
        CommandResult::new(EXIT_OK, to_pretty_json(&registry.to_json_schema()))
    } else {
        CommandResult::new(EXIT_OK, registry.describe())
    }
}
