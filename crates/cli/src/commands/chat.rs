use std::io::{self, BufRead, Write};

use confidant_agent::runtime::AgentRuntime;
use confidant_core::audit::CallCounter;
use confidant_core::config::LoadOptions;
use tokio::runtime::Runtime;
use tracing::warn;

use super::{async_runtime, start, CommandResult, EXIT_CONFIG, EXIT_OK, EXIT_RUNTIME};

const EXIT_WORDS: [&str; 2] = ["quit", "exit"];

pub fn run(options: LoadOptions) -> CommandResult {
    let app = match start("chat", options) {
        Ok(app) => app,
        Err(result) => return result,
    };
    let agent = match app.agent_runtime() {
        Ok(agent) => agent,
        Err(error) => return CommandResult::failure("chat", "bootstrap", error.to_string(), EXIT_CONFIG),
    };
    let runtime = match async_runtime("chat") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    match session(&agent, &runtime, stdin.lock(), stdout.lock()) {
        Ok(_) => CommandResult::new(EXIT_OK, call_summary(&app.calls)),
        Err(error) => CommandResult::failure("chat", "io", error.to_string(), EXIT_RUNTIME),
    }
}

/// Reads one user turn per line until EOF or an exit word. Returns the number
/// of turns handled.
pub fn session(
    agent: &AgentRuntime,
    runtime: &Runtime,
    input: impl BufRead,
    mut output: impl Write,
) -> io::Result<usize> {
    writeln!(output, "confidant is listening. Type `quit` to leave.")?;
    let mut turns = 0;

    for line in input.lines() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if EXIT_WORDS.iter().any(|word| text.eq_ignore_ascii_case(word)) {
            break;
        }

        turns += 1;
        match runtime.block_on(agent.handle_turn(text)) {
            Ok(outcome) => writeln!(output, "{}", outcome.reply)?,
            Err(error) => {
                warn!(event_name = "cli.chat.turn_failed", error = %error, "turn failed");
                writeln!(output, "(the assistant is unavailable: {error})")?;
            }
        }
    }

    writeln!(output, "Goodbye.")?;
    Ok(turns)
}

/// One line per operation dispatched during the session, or nothing when the
/// session never reached the CRM.
pub fn call_summary(calls: &CallCounter) -> String {
    let counts = calls.snapshot();
    if counts.is_empty() {
        return String::new();
    }

    let mut lines = vec![format!("operations this session: {}", calls.total_invocations())];
    lines.extend(counts.iter().map(|(operation, count)| {
        format!("- {operation}: {} call(s), {} failed", count.invocations, count.failures)
    }));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use confidant_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, CallCounter};

    use super::call_summary;

    fn event(operation: &str, event_type: &str, outcome: AuditOutcome) -> AuditEvent {
        AuditEvent::new("turn-1", operation, event_type, AuditCategory::Ingress, outcome)
    }

    #[test]
    fn empty_session_prints_no_summary() {
        assert_eq!(call_summary(&CallCounter::default()), "");
    }

    #[test]
    fn summary_lists_each_operation_with_failures() {
        let counter = CallCounter::default();
        counter.emit(event("find_people", "dispatch.received", AuditOutcome::Success));
        counter.emit(event("find_people", "dispatch.received", AuditOutcome::Success));
        counter.emit(event("track_debt", "dispatch.received", AuditOutcome::Success));
        counter.emit(event("track_debt", "dispatch.failed", AuditOutcome::Failed));

        assert_eq!(
            call_summary(&counter),
            "operations this session: 3\n- find_people: 2 call(s), 0 failed\n- track_debt: 1 call(s), 1 failed"
        );
    }
}
