use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rigquote_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            )
        }
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let sources = SourceLookup {
        doc: load_config_file_doc(config_file_path.as_deref()),
        path: config_file_path,
    };

    let quote = &config.quote;
    let llm = &config.llm;
    let template_path = quote
        .template_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<builtin>".to_string());
    let api_key = llm
        .api_key
        .as_ref()
        .map(|key| redact_key(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let lines = vec![
        "effective config (source precedence: env > file > default):".to_string(),
        sources.line("quote.business_name", &quote.business_name, &["RIGQUOTE_QUOTE_BUSINESS_NAME"]),
        sources.line(
            "quote.default_signer",
            &quote.default_signer,
            &["RIGQUOTE_QUOTE_DEFAULT_SIGNER"],
        ),
        sources.line("quote.gear_line", quote.gear_line.label(), &["RIGQUOTE_QUOTE_GEAR_LINE"]),
        sources.line(
            "quote.normalization",
            &format!("{:?}", quote.normalization),
            &["RIGQUOTE_QUOTE_NORMALIZATION"],
        ),
        sources.line(
            "quote.rolldeck_phrase",
            &quote.rolldeck_phrase.to_string(),
            &["RIGQUOTE_QUOTE_ROLLDECK_PHRASE"],
        ),
        sources.line("quote.template_path", &template_path, &["RIGQUOTE_QUOTE_TEMPLATE_PATH"]),
        sources.line(
            "extraction.mode",
            config.extraction.mode.as_str(),
            &["RIGQUOTE_EXTRACTION_MODE"],
        ),
        sources.line(
            "extraction.max_input_chars",
            &config.extraction.max_input_chars.to_string(),
            &["RIGQUOTE_EXTRACTION_MAX_INPUT_CHARS"],
        ),
        sources.line("llm.provider", llm.provider.as_str(), &["RIGQUOTE_LLM_PROVIDER"]),
        sources.line("llm.model", &llm.model, &["RIGQUOTE_LLM_MODEL"]),
        sources.line("llm.base_url", &llm.endpoint_base(), &["RIGQUOTE_LLM_BASE_URL"]),
        sources.line("llm.api_key", &api_key, &["RIGQUOTE_LLM_API_KEY", "OPENAI_API_KEY"]),
        sources.line(
            "llm.timeout_secs",
            &llm.timeout_secs.to_string(),
            &["RIGQUOTE_LLM_TIMEOUT_SECS"],
        ),
        sources.line("llm.max_retries", &llm.max_retries.to_string(), &["RIGQUOTE_LLM_MAX_RETRIES"]),
        sources.line("llm.temperature", &llm.temperature.to_string(), &["RIGQUOTE_LLM_TEMPERATURE"]),
        sources.line("llm.max_tokens", &llm.max_tokens.to_string(), &["RIGQUOTE_LLM_MAX_TOKENS"]),
        sources.line(
            "server.bind_address",
            &config.server.bind_address,
            &["RIGQUOTE_SERVER_BIND_ADDRESS"],
        ),
        sources.line("server.port", &config.server.port.to_string(), &["RIGQUOTE_SERVER_PORT"]),
        sources.line(
            "logging.level",
            &config.logging.level,
            &["RIGQUOTE_LOGGING_LEVEL", "RIGQUOTE_LOG_LEVEL"],
        ),
        sources.line(
            "logging.format",
            &format!("{:?}", config.logging.format),
            &["RIGQUOTE_LOGGING_FORMAT", "RIGQUOTE_LOG_FORMAT"],
        ),
        format!(
            "- extraction.effective_mode = {} (source: derived)",
            config.effective_extraction_mode().as_str()
        ),
    ];

    CommandResult::output(lines.join("\n"))
}

struct SourceLookup {
    doc: Option<Value>,
    path: Option<PathBuf>,
}

impl SourceLookup {
    fn line(&self, key_path: &str, value: &str, env_keys: &[&str]) -> String {
        let source = field_source(key_path, env_keys, self.doc.as_ref(), self.path.as_deref());
        render_line(key_path, value, source)
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a provider prefix such as `sk-` so operators can tell keys apart.
fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
