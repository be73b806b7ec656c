use async_trait::async_trait;
use rigquote_core::{ApplicationError, ExtractedFields};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("text input is required")]
    EmptyInput,
    #[error("text input exceeds {limit} characters")]
    InputTooLong { limit: usize },
    #[error("{provider} API key is required for AI extraction")]
    MissingApiKey { provider: &'static str },
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm returned an empty completion")]
    EmptyCompletion,
    #[error("invalid AI response format: {0}")]
    InvalidResponse(String),
}

impl ExtractionError {
    /// Worth another attempt: connection trouble, rate limiting and server errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<ExtractionError> for ApplicationError {
    fn from(error: ExtractionError) -> Self {
        match error {
            ExtractionError::EmptyInput | ExtractionError::InputTooLong { .. } => {
                ApplicationError::Extraction(error.to_string())
            }
            ExtractionError::MissingApiKey { .. } => {
                ApplicationError::Configuration(error.to_string())
            }
            ExtractionError::Transport(_)
            | ExtractionError::Status { .. }
            | ExtractionError::EmptyCompletion
            | ExtractionError::InvalidResponse(_) => ApplicationError::Integration(error.to_string()),
        }
    }
}

/// Turns pasted free text into a partial field mapping. Implementations return
/// only the fields they found; blank values are never included.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn extract(&self, text: &str) -> Result<ExtractedFields, ExtractionError>;
}
