use confidant_agent::delegation::DelimiterPair;
use confidant_agent::llm::HttpLlmClient;
use confidant_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use super::{to_pretty_json, CommandResult, EXIT_OK, EXIT_RUNTIME};
use crate::bootstrap::bootstrap_with_config;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because configuration did not load".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { EXIT_OK } else { EXIT_RUNTIME };

    let output = if json_output { to_pretty_json(&report) } else { render_human(&report) };
    CommandResult::new(exit_code, output)
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.push(check_delimiters(&config));
            checks.push(check_llm_readiness(&config));
            checks.push(check_crm_connectivity(config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            checks.push(DoctorCheck::skipped("agent_delimiters"));
            checks.push(DoctorCheck::skipped("llm_readiness"));
            checks.push(DoctorCheck::skipped("crm_connectivity"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_delimiters(config: &AppConfig) -> DoctorCheck {
    match DelimiterPair::new(config.agent.open_tag.clone(), config.agent.close_tag.clone()) {
        Ok(pair) => DoctorCheck::pass(
            "agent_delimiters",
            format!("delegation wrapped in `{}` ... `{}`", pair.open(), pair.close()),
        ),
        Err(error) => DoctorCheck::fail("agent_delimiters", error.to_string()),
    }
}

fn check_llm_readiness(config: &AppConfig) -> DoctorCheck {
    match HttpLlmClient::from_config(&config.llm) {
        Ok(_) => DoctorCheck::pass(
            "llm_readiness",
            format!("{:?} client configured for model `{}`", config.llm.provider, config.llm.model),
        ),
        Err(error) => DoctorCheck::fail("llm_readiness", error.to_string()),
    }
}

fn check_crm_connectivity(config: AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck::fail(
                "crm_connectivity",
                format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    let app = match bootstrap_with_config(config) {
        Ok(app) => app,
        Err(error) => return DoctorCheck::fail("crm_connectivity", error.to_string()),
    };

    match runtime.block_on(app.store.list_genders()) {
        Ok(genders) => DoctorCheck::pass(
            "crm_connectivity",
            format!(
                "{:?} store reachable at `{}` ({} genders)",
                app.config.crm.backend,
                app.config.crm.base_url,
                genders.len()
            ),
        ),
        Err(error) => {
            DoctorCheck::fail("crm_connectivity", format!("failed to reach the CRM: {error}"))
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
