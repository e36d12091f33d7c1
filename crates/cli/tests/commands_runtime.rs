use std::env;
use std::io::Cursor;
use std::sync::{Arc, Mutex, OnceLock};

use confidant_agent::llm::ScriptedLlmClient;
use confidant_cli::bootstrap::bootstrap;
use confidant_cli::commands::{chat, config, doctor, exec, extract, operations};
use confidant_core::config::LoadOptions;
use serde_json::Value;

const MEMORY_BACKEND: (&str, &str) = ("CONFIDANT_CRM_BACKEND", "memory");

#[test]
fn exec_returns_success_envelope() {
    with_env(&[MEMORY_BACKEND], || {
        let result = exec::run(
            LoadOptions::default(),
            "remember_person",
            Some(r#"{"first_name": "Alex", "last_name": "Johnson"}"#),
        );
        assert_eq!(result.exit_code, 0, "expected success envelope");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "success");
        assert_eq!(payload["data"]["first_name"], "Alex");
    });
}

#[test]
fn exec_exits_nonzero_on_error_envelope() {
    with_env(&[MEMORY_BACKEND], || {
        let result =
            exec::run(LoadOptions::default(), "forget_person", Some(r#"{"person_name": "Zed"}"#));
        assert_eq!(result.exit_code, 1, "expected error envelope exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["message"], "No contact found matching 'Zed'");
    });
}

#[test]
fn exec_rejects_unknown_operations() {
    with_env(&[MEMORY_BACKEND], || {
        let result = exec::run(LoadOptions::default(), "launch_rocket", None);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert!(payload["message"].as_str().unwrap_or_default().contains("launch_rocket"));
    });
}

#[test]
fn exec_reports_malformed_args_before_bootstrap() {
    with_env(&[MEMORY_BACKEND], || {
        let result = exec::run(LoadOptions::default(), "find_people", Some("{query: Al}"));
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "exec");
        assert_eq!(payload["error_class"], "invalid_arguments");
    });
}

#[test]
fn exec_returns_config_failure_without_crm_token() {
    with_env(&[], || {
        let result = exec::run(LoadOptions::default(), "find_people", Some(r#"{"query": "Al"}"#));
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn operations_json_lists_the_catalog() {
    let result = operations::run(true);
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    let tools = payload.as_array().expect("tool list");
    assert_eq!(tools.len(), 19);
    assert!(result.output.contains("log_job_for_person"));
}

#[test]
fn extract_splits_the_default_tags() {
    with_env(&[MEMORY_BACKEND], || {
        let result = extract::run(
            LoadOptions::default(),
            "Lovely!\n<commit_task>Remember that Jane likes tea</commit_task>",
        );
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["display_text"], "Lovely!");
        assert_eq!(payload["task_text"], "Remember that Jane likes tea");
        assert!(payload["malformed"].is_null());
    });
}

#[test]
fn config_redacts_the_crm_token_and_attributes_env() {
    with_env(
        &[
            ("CONFIDANT_CRM_API_TOKEN", "eyJ0eXAiOiJKV1QiLCJhbGciOiJSUzI1NiJ9"),
            ("CONFIDANT_AGENT_MATCH_POLICY", "exact"),
        ],
        || {
            let result = config::run(LoadOptions::default());
            assert_eq!(result.exit_code, 0);

            assert!(result.output.contains("- crm.api_token = eyJ0*** (source: env (CONFIDANT_CRM_API_TOKEN))"));
            assert!(result.output.contains("- agent.match_policy = Exact (source: env (CONFIDANT_AGENT_MATCH_POLICY))"));
            assert!(result.output.contains("- crm.search_limit = 10 (source: default)"));
            assert!(!result.output.contains("JKV1QiLCJhbGciOiJSUzI1NiJ9"));
        },
    );
}

#[test]
fn config_reads_an_explicit_file() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("confidant.toml");
        std::fs::write(&path, "[crm]\nbackend = \"memory\"\nsearch_limit = 25\n").expect("write");

        let result = config::run(LoadOptions {
            config_path: Some(path.clone()),
            require_file: true,
            ..LoadOptions::default()
        });
        assert_eq!(result.exit_code, 0);

        let expected = format!("- crm.search_limit = 25 (source: file ({}))", path.display());
        assert!(result.output.contains(&expected), "{}", result.output);
    });
}

#[test]
fn doctor_passes_with_memory_backend() {
    with_env(&[MEMORY_BACKEND], || {
        let result = doctor::run(LoadOptions::default(), true);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
        let names: Vec<&str> = payload["checks"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|check| check["name"].as_str())
            .collect();
        assert_eq!(
            names,
            vec!["config_validation", "agent_delimiters", "llm_readiness", "crm_connectivity"]
        );
    });
}

#[test]
fn doctor_skips_checks_when_config_is_invalid() {
    with_env(&[], || {
        let result = doctor::run(LoadOptions::default(), false);
        assert_eq!(result.exit_code, 3);
        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [skip] crm_connectivity"));
    });
}

#[test]
fn chat_session_runs_turns_until_quit() {
    with_env(&[MEMORY_BACKEND], || {
        let app = bootstrap(LoadOptions::default()).expect("bootstrap");
        let llm = Arc::new(ScriptedLlmClient::new([
            "Great!\n<commit_task>Remember a person named Alex Johnson</commit_task>",
            r#"{"operation": "remember_person", "arguments": {"first_name": "Alex", "last_name": "Johnson"}}"#,
            "Got it, I'll remember Alex Johnson.",
        ]));
        let agent = app.agent_runtime_with(llm).expect("agent");
        let runtime = tokio::runtime::Runtime::new().expect("runtime");

        let input = Cursor::new("I met Alex Johnson\n\nquit\nignored after quit\n");
        let mut output = Vec::new();
        let turns = chat::session(&agent, &runtime, input, &mut output).expect("session");

        let transcript = String::from_utf8(output).expect("utf8");
        assert_eq!(turns, 1);
        assert!(transcript.contains("Got it, I'll remember Alex Johnson."));
        assert!(transcript.ends_with("Goodbye.\n"));
        assert_eq!(app.calls.snapshot()["remember_person"].invocations, 1);
        assert_eq!(
            chat::call_summary(&app.calls),
            "operations this session: 1\n- remember_person: 1 call(s), 0 failed"
        );
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "CONFIDANT_CRM_BACKEND",
        "CONFIDANT_CRM_BASE_URL",
        "CONFIDANT_CRM_API_TOKEN",
        "CONFIDANT_CRM_TIMEOUT_SECS",
        "CONFIDANT_CRM_SEARCH_LIMIT",
        "CONFIDANT_LLM_PROVIDER",
        "CONFIDANT_LLM_API_KEY",
        "CONFIDANT_LLM_BASE_URL",
        "CONFIDANT_LLM_MODEL",
        "CONFIDANT_LLM_TIMEOUT_SECS",
        "CONFIDANT_LLM_TEMPERATURE",
        "CONFIDANT_AGENT_OPEN_TAG",
        "CONFIDANT_AGENT_CLOSE_TAG",
        "CONFIDANT_AGENT_MATCH_POLICY",
        "CONFIDANT_LOGGING_LEVEL",
        "CONFIDANT_LOGGING_FORMAT",
        "CONFIDANT_LOG_LEVEL",
        "CONFIDANT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
