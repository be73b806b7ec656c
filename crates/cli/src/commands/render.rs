use std::path::Path;

use chrono::Utc;
use rigquote_core::config::{AppConfig, LoadOptions};
use rigquote_core::{QuoteEngine, QuoteRequest, QuoteResult};
use serde::Serialize;
use tracing::info;

use crate::commands::{read_input, CommandResult, EXIT_CONFIG, EXIT_INPUT, EXIT_RUNTIME};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderReport {
    generated_at: String,
    #[serde(flatten)]
    result: QuoteResult,
}

pub fn run(options: &LoadOptions, input: Option<&Path>, json_output: bool) -> CommandResult {
    match read_input(input) {
        Ok(raw) => render(options, &raw, json_output),
        Err(error) => CommandResult::failure("render", "input", format!("{error:#}"), EXIT_INPUT),
    }
}

/// Renders one request given as JSON text. Blank input renders an empty form.
/// Only the `[quote]` settings are validated.
pub fn render(options: &LoadOptions, raw: &str, json_output: bool) -> CommandResult {
    let settings = match AppConfig::load_quote_settings(options.clone()) {
        Ok(settings) => settings,
        Err(error) => {
            return CommandResult::failure(
                "render",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    let engine = match QuoteEngine::from_settings(settings) {
        Ok(engine) => engine,
        Err(error) => {
            return CommandResult::failure("render", "template", error.to_string(), EXIT_RUNTIME)
        }
    };

    let request = if raw.trim().is_empty() {
        engine.new_request()
    } else {
        match serde_json::from_str::<QuoteRequest>(raw) {
            Ok(request) => request,
            Err(error) => {
                return CommandResult::failure(
                    "render",
                    "input",
                    format!("invalid quote request JSON: {error}"),
                    EXIT_INPUT,
                )
            }
        }
    };

    let result = engine.normalize_and_render(&request);
    info!(
        event_name = "cli.render.completed",
        equipment_items = result.equipment_list.len(),
        custom_template = engine.uses_custom_template(),
        "quote rendered"
    );

    if json_output {
        let report = RenderReport { generated_at: Utc::now().to_rfc3339(), result };
        CommandResult::json("render", &report)
    } else {
        CommandResult::output(result.rendered_text)
    }
}
