use std::time::Duration;

use async_trait::async_trait;
use rigquote_core::config::{LlmConfig, LlmProvider};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::extractor::ExtractionError;

const RETRY_BASE_DELAY_MS: u64 = 250;
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Clone, Debug, PartialEq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String, ExtractionError>;
}

/// Chat-completion client for OpenAI-compatible endpoints (OpenAI, Ollama) and
/// the Anthropic messages API.
pub struct HttpLlmClient {
    client: reqwest::Client,
    provider: LlmProvider,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    max_retries: u32,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, ExtractionError> {
        if !config.is_usable() {
            return Err(ExtractionError::MissingApiKey { provider: config.provider.as_str() });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| ExtractionError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            provider: config.provider,
            base_url: config.endpoint_base(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_once(&self, prompt: &ChatPrompt) -> Result<String, ExtractionError> {
        let request = match self.provider {
            LlmProvider::OpenAi | LlmProvider::Ollama => {
                let url = format!("{}/v1/chat/completions", self.base_url);
                let mut request = self.client.post(url).json(&json!({
                    "model": self.model,
                    "messages": [
                        { "role": "system", "content": prompt.system },
                        { "role": "user", "content": prompt.user },
                    ],
                    "temperature": prompt.temperature,
                    "max_tokens": prompt.max_tokens,
                }));
                if let Some(key) = &self.api_key {
                    request = request.bearer_auth(key.expose_secret());
                }
                request
            }
            LlmProvider::Anthropic => {
                let url = format!("{}/v1/messages", self.base_url);
                let key = self
                    .api_key
                    .as_ref()
                    .ok_or(ExtractionError::MissingApiKey { provider: "anthropic" })?;
                self.client
                    .post(url)
                    .header("x-api-key", key.expose_secret())
                    .header("anthropic-version", "2023-06-01")
                    .json(&json!({
                        "model": self.model,
                        "system": prompt.system,
                        "messages": [{ "role": "user", "content": prompt.user }],
                        "temperature": prompt.temperature,
                        "max_tokens": prompt.max_tokens,
                    }))
            }
        };

        let response =
            request.send().await.map_err(|error| ExtractionError::Transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|error| ExtractionError::InvalidResponse(error.to_string()))?;
        completion_text(self.provider, &body).ok_or(ExtractionError::EmptyCompletion)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String, ExtractionError> {
        let mut attempt = 0;
        loop {
            info!(
                event_name = "agent.llm.request",
                provider = self.provider.as_str(),
                model = %self.model,
                attempt,
                "sending extraction prompt"
            );

            match self.send_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    let delay = Duration::from_millis(RETRY_BASE_DELAY_MS << attempt.min(6));
                    warn!(
                        event_name = "agent.llm.retry",
                        provider = self.provider.as_str(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "llm request failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Assistant text from a provider response body; `None` when absent or blank.
pub fn completion_text(provider: LlmProvider, body: &Value) -> Option<String> {
    let text = match provider {
        LlmProvider::OpenAi | LlmProvider::Ollama => body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str),
        LlmProvider::Anthropic => body
            .get("content")
            .and_then(Value::as_array)
            .and_then(|parts| {
                parts.iter().find(|part| part.get("type").and_then(Value::as_str) == Some("text"))
            })
            .and_then(|part| part.get("text"))
            .and_then(Value::as_str),
    }?;

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
