use std::fs;
use std::path::Path;

use rigquote_agent::{ExtractionError, ExtractionOutcome, ExtractionService};
use rigquote_core::config::{AppConfig, ExtractionMode, LoadOptions};
use rigquote_core::QuoteRequest;
use serde::Serialize;

use crate::commands::{read_input, CommandResult, EXIT_CONFIG, EXIT_INPUT, EXIT_RUNTIME};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractReport {
    #[serde(flatten)]
    outcome: ExtractionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    request: Option<QuoteRequest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<String>,
}

pub fn run(
    options: &LoadOptions,
    input: Option<&Path>,
    request_path: Option<&Path>,
    mode: Option<ExtractionMode>,
) -> CommandResult {
    let text = match read_input(input) {
        Ok(text) => text,
        Err(error) => {
            return CommandResult::failure("extract", "input", format!("{error:#}"), EXIT_INPUT)
        }
    };

    let request = match request_path.map(read_request).transpose() {
        Ok(request) => request,
        Err(message) => return CommandResult::failure("extract", "input", message, EXIT_INPUT),
    };

    extract(options, &text, request.as_ref(), mode)
}

/// Extracts fields from `text`; with a base request the merged request is included.
pub fn extract(
    options: &LoadOptions,
    text: &str,
    request: Option<&QuoteRequest>,
    mode: Option<ExtractionMode>,
) -> CommandResult {
    let mut options = options.clone();
    if mode.is_some() {
        options.overrides.extraction_mode = mode;
    }

    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "extract",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    let service = match ExtractionService::from_config(&config) {
        Ok(service) => service,
        Err(error) => return extraction_failure(error),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "extract",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            )
        }
    };

    let report = match request {
        Some(request) => runtime.block_on(service.extract_and_merge(text, request)).map(
            |(outcome, merged)| ExtractReport {
                outcome,
                request: Some(merged.request),
                skipped: merged.skipped,
            },
        ),
        None => runtime
            .block_on(service.extract(text))
            .map(|outcome| ExtractReport { outcome, request: None, skipped: Vec::new() }),
    };

    match report {
        Ok(report) => CommandResult::json("extract", &report),
        Err(error) => extraction_failure(error),
    }
}

fn read_request(path: &Path) -> Result<QuoteRequest, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("could not read request file `{}`: {error}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|error| format!("invalid quote request JSON in `{}`: {error}", path.display()))
}

fn extraction_failure(error: ExtractionError) -> CommandResult {
    match error {
        ExtractionError::EmptyInput | ExtractionError::InputTooLong { .. } => {
            CommandResult::failure("extract", "input", error.to_string(), EXIT_INPUT)
        }
        ExtractionError::MissingApiKey { .. } => {
            CommandResult::failure("extract", "config_validation", error.to_string(), EXIT_CONFIG)
        }
        _ => CommandResult::failure("extract", "extraction", error.to_string(), EXIT_RUNTIME),
    }
}
