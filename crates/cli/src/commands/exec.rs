use confidant_core::config::LoadOptions;
use serde_json::Value;

use super::{
    async_runtime, start, CommandResult, EXIT_CONFIG, EXIT_ERROR_ENVELOPE, EXIT_OK,
};

/// Calls the dispatcher directly and prints the envelope.
pub fn run(options: LoadOptions, operation: &str, args: Option<&str>) -> CommandResult {
    let args = match parse_args(args) {
        Ok(args) => args,
        Err(message) => return CommandResult::failure("exec", "invalid_arguments", message, EXIT_CONFIG),
    };
    let app = match start("exec", options) {
        Ok(app) => app,
        Err(result) => return result,
    };
    let runtime = match async_runtime("exec") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let envelope = runtime.block_on(app.dispatcher.execute(operation, args));
    let exit_code = if envelope.is_success() { EXIT_OK } else { EXIT_ERROR_ENVELOPE };
    CommandResult::new(exit_code, envelope.to_json_string())
}

fn parse_args(raw: Option<&str>) -> Result<Value, String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(Value::Object(Default::default()));
    };
    serde_json::from_str(raw).map_err(|error| format!("--args is not valid JSON: {error}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_args;

    #[test]
    fn missing_args_become_an_empty_object() {
        assert_eq!(parse_args(None), Ok(json!({})));
        assert_eq!(parse_args(Some("  ")), Ok(json!({})));
    }

    #[test]
    fn malformed_args_are_reported() {
        let error = parse_args(Some("{first_name: Alex}")).expect_err("invalid json");
        assert!(error.starts_with("--args is not valid JSON"));
    }
}
