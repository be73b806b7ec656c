use rigquote_agent::HttpLlmClient;
use rigquote_core::config::{AppConfig, ExtractionMode, LoadOptions};
use rigquote_core::QuoteEngine;
use serde::Serialize;

use crate::commands::CommandResult;

const EXIT_DOCTOR_FAILED: u8 = 1;

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

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_DOCTOR_FAILED };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_quote_template(&config));
            checks.push(check_extraction_readiness(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("quote_template"));
            checks.push(skipped("extraction_readiness"));
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

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

fn check_quote_template(config: &AppConfig) -> DoctorCheck {
    match QuoteEngine::from_settings(config.quote.clone()) {
        Ok(engine) => {
            let details = match &config.quote.template_path {
                Some(path) if engine.uses_custom_template() => {
                    format!("custom template `{}` rendered an empty form", path.display())
                }
                _ => "builtin template loaded".to_string(),
            };
            DoctorCheck { name: "quote_template", status: CheckStatus::Pass, details }
        }
        Err(error) => DoctorCheck {
            name: "quote_template",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

/// Offline readiness: resolves the extraction mode and builds the HTTP client, but
/// never calls the provider.
fn check_extraction_readiness(config: &AppConfig) -> DoctorCheck {
    match config.effective_extraction_mode() {
        ExtractionMode::Llm => match HttpLlmClient::from_config(&config.llm) {
            Ok(client) => DoctorCheck {
                name: "extraction_readiness",
                status: CheckStatus::Pass,
                details: format!(
                    "llm extraction via {} model `{}` at {}",
                    client.provider().as_str(),
                    client.model(),
                    config.llm.endpoint_base()
                ),
            },
            Err(error) => DoctorCheck {
                name: "extraction_readiness",
                status: CheckStatus::Fail,
                details: error.to_string(),
            },
        },
        _ => DoctorCheck {
            name: "extraction_readiness",
            status: CheckStatus::Pass,
            details: if config.extraction.mode == ExtractionMode::Auto {
                "rule-based extraction (no usable llm provider configured)".to_string()
            } else {
                "rule-based extraction".to_string()
            },
        },
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

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
