use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::equipment_list::GearLine;
use crate::engine::normalizer::NormalizationPolicy;
use crate::engine::QuoteSettings;

pub const DEFAULT_CONFIG_FILE: &str = "rigquote.toml";
pub const NESTED_CONFIG_FILE: &str = "config/rigquote.toml";

/// Every environment variable `AppConfig::load` reads, in the order it reads them.
pub const ENV_KEYS: &[&str] = &[
    "RIGQUOTE_QUOTE_BUSINESS_NAME",
    "RIGQUOTE_QUOTE_DEFAULT_SIGNER",
    "RIGQUOTE_QUOTE_GEAR_LINE",
    "RIGQUOTE_QUOTE_NORMALIZATION",
    "RIGQUOTE_QUOTE_ROLLDECK_PHRASE",
    "RIGQUOTE_QUOTE_TEMPLATE_PATH",
    "RIGQUOTE_EXTRACTION_MODE",
    "RIGQUOTE_EXTRACTION_MAX_INPUT_CHARS",
    "RIGQUOTE_LLM_PROVIDER",
    "RIGQUOTE_LLM_API_KEY",
    "OPENAI_API_KEY",
    "RIGQUOTE_LLM_BASE_URL",
    "RIGQUOTE_LLM_MODEL",
    "RIGQUOTE_LLM_TIMEOUT_SECS",
    "RIGQUOTE_LLM_MAX_RETRIES",
    "RIGQUOTE_LLM_TEMPERATURE",
    "RIGQUOTE_LLM_MAX_TOKENS",
    "RIGQUOTE_SERVER_BIND_ADDRESS",
    "RIGQUOTE_SERVER_PORT",
    "RIGQUOTE_LOGGING_LEVEL",
    "RIGQUOTE_LOG_LEVEL",
    "RIGQUOTE_LOGGING_FORMAT",
    "RIGQUOTE_LOG_FORMAT",
];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub quote: QuoteSettings,
    pub extraction: ExtractionConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ExtractionConfig {
    pub mode: ExtractionMode,
    pub max_input_chars: usize,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    Rules,
    Llm,
    /// LLM when the provider is usable, rules otherwise.
    Auto,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(alias = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub extraction_mode: Option<ExtractionMode>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub server_port: Option<u16>,
    pub normalization: Option<NormalizationPolicy>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            quote: QuoteSettings::default(),
            extraction: ExtractionConfig { mode: ExtractionMode::Auto, max_input_chars: 20_000 },
            llm: LlmConfig {
                provider: LlmProvider::OpenAi,
                api_key: None,
                base_url: None,
                model: "gpt-3.5-turbo".to_string(),
                timeout_secs: 30,
                max_retries: 2,
                temperature: 0.1,
                max_tokens: 500,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl ExtractionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::Llm => "llm",
            Self::Auto => "auto",
        }
    }
}

impl std::str::FromStr for ExtractionMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rules" | "rule" => Ok(Self::Rules),
            "llm" | "ai" => Ok(Self::Llm),
            "auto" => Ok(Self::Auto),
            other => Err(ConfigError::Validation(format!(
                "unsupported extraction mode `{other}` (expected rules|llm|auto)"
            ))),
        }
    }
}

impl LlmProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Ollama => "http://localhost:11434",
        }
    }

    pub fn requires_api_key(self) -> bool {
        matches!(self, Self::OpenAi | Self::Anthropic)
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmConfig {
    /// True when a request could be attempted: keyed providers need a non-blank
    /// key, Ollama needs nothing beyond its base URL.
    pub fn is_usable(&self) -> bool {
        if self.provider.requires_api_key() {
            self.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty())
        } else {
            true
        }
    }

    pub fn endpoint_base(&self) -> String {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let config = Self::resolve(options)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads with the same precedence as [`AppConfig::load`] but validates only
    /// `[quote]`, so rendering works while extraction is misconfigured.
    pub fn load_quote_settings(options: LoadOptions) -> Result<QuoteSettings, ConfigError> {
        let config = Self::resolve(options)?;
        validate_quote(&config.quote)?;
        Ok(config.quote)
    }

    fn resolve(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);

        Ok(config)
    }

    /// Extraction mode after resolving `auto` against the LLM settings.
    pub fn effective_extraction_mode(&self) -> ExtractionMode {
        match self.extraction.mode {
            ExtractionMode::Auto if self.llm.is_usable() => ExtractionMode::Llm,
            ExtractionMode::Auto => ExtractionMode::Rules,
            explicit => explicit,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(quote) = patch.quote {
            if let Some(business_name) = quote.business_name {
                self.quote.business_name = business_name;
            }
            if let Some(default_signer) = quote.default_signer {
                self.quote.default_signer = default_signer;
            }
            if let Some(gear_line) = quote.gear_line {
                self.quote.gear_line = gear_line;
            }
            if let Some(normalization) = quote.normalization {
                self.quote.normalization = normalization;
            }
            if let Some(rolldeck_phrase) = quote.rolldeck_phrase {
                self.quote.rolldeck_phrase = rolldeck_phrase;
            }
            if let Some(template_path) = quote.template_path {
                self.quote.template_path = Some(template_path);
            }
        }

        if let Some(extraction) = patch.extraction {
            if let Some(mode) = extraction.mode {
                self.extraction.mode = mode;
            }
            if let Some(max_input_chars) = extraction.max_input_chars {
                self.extraction.max_input_chars = max_input_chars;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider.parse()?;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RIGQUOTE_QUOTE_BUSINESS_NAME") {
            self.quote.business_name = value;
        }
        if let Some(value) = read_env("RIGQUOTE_QUOTE_DEFAULT_SIGNER") {
            self.quote.default_signer = value;
        }
        if let Some(value) = read_env("RIGQUOTE_QUOTE_GEAR_LINE") {
            self.quote.gear_line = parse_with::<GearLine>("RIGQUOTE_QUOTE_GEAR_LINE", &value)?;
        }
        if let Some(value) = read_env("RIGQUOTE_QUOTE_NORMALIZATION") {
            self.quote.normalization =
                parse_with::<NormalizationPolicy>("RIGQUOTE_QUOTE_NORMALIZATION", &value)?;
        }
        if let Some(value) = read_env("RIGQUOTE_QUOTE_ROLLDECK_PHRASE") {
            self.quote.rolldeck_phrase = parse_bool("RIGQUOTE_QUOTE_ROLLDECK_PHRASE", &value)?;
        }
        if let Some(value) = read_env("RIGQUOTE_QUOTE_TEMPLATE_PATH") {
            self.quote.template_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("RIGQUOTE_EXTRACTION_MODE") {
            self.extraction.mode = value.parse()?;
        }
        if let Some(value) = read_env("RIGQUOTE_EXTRACTION_MAX_INPUT_CHARS") {
            self.extraction.max_input_chars =
                parse_with::<usize>("RIGQUOTE_EXTRACTION_MAX_INPUT_CHARS", &value)?;
        }

        if let Some(value) = read_env("RIGQUOTE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        let api_key = read_env("RIGQUOTE_LLM_API_KEY").or_else(|| read_env("OPENAI_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("RIGQUOTE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("RIGQUOTE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("RIGQUOTE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_with::<u64>("RIGQUOTE_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("RIGQUOTE_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_with::<u32>("RIGQUOTE_LLM_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("RIGQUOTE_LLM_TEMPERATURE") {
            self.llm.temperature = parse_with::<f32>("RIGQUOTE_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("RIGQUOTE_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_with::<u32>("RIGQUOTE_LLM_MAX_TOKENS", &value)?;
        }

        if let Some(value) = read_env("RIGQUOTE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("RIGQUOTE_SERVER_PORT") {
            self.server.port = parse_with::<u16>("RIGQUOTE_SERVER_PORT", &value)?;
        }

        let log_level =
            read_env("RIGQUOTE_LOGGING_LEVEL").or_else(|| read_env("RIGQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RIGQUOTE_LOGGING_FORMAT").or_else(|| read_env("RIGQUOTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(extraction_mode) = overrides.extraction_mode {
            self.extraction.mode = extraction_mode;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(normalization) = overrides.normalization {
            self.quote.normalization = normalization;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_quote(&self.quote)?;
        validate_extraction(&self.extraction, &self.llm)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_quote(quote: &QuoteSettings) -> Result<(), ConfigError> {
    if quote.business_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "quote.business_name must not be empty; it signs every rendered quote".to_string(),
        ));
    }

    if let Some(path) = &quote.template_path {
        if !path.is_file() {
            return Err(ConfigError::Validation(format!(
                "quote.template_path `{}` does not exist; remove the setting to use the built-in template",
                path.display()
            )));
        }
    }

    Ok(())
}

fn validate_extraction(extraction: &ExtractionConfig, llm: &LlmConfig) -> Result<(), ConfigError> {
    if extraction.max_input_chars == 0 {
        return Err(ConfigError::Validation(
            "extraction.max_input_chars must be greater than zero".to_string(),
        ));
    }

    if extraction.mode == ExtractionMode::Llm && !llm.is_usable() {
        return Err(ConfigError::Validation(format!(
            "extraction.mode is `llm` but llm.api_key is missing for provider `{}`. \
             Set RIGQUOTE_LLM_API_KEY (or OPENAI_API_KEY) or switch extraction.mode to `rules`",
            llm.provider.as_str()
        )));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.max_retries > 10 {
        return Err(ConfigError::Validation("llm.max_retries must be at most 10".to_string()));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_with<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    quote: Option<QuotePatch>,
    extraction: Option<ExtractionPatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotePatch {
    business_name: Option<String>,
    default_signer: Option<String>,
    gear_line: Option<GearLine>,
    normalization: Option<NormalizationPolicy>,
    rolldeck_phrase: Option<bool>,
    template_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractionPatch {
    mode: Option<ExtractionMode>,
    max_input_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
