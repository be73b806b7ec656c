use std::sync::Arc;

use rigquote_core::config::{AppConfig, ExtractionMode};
use rigquote_core::{merge_with_outcome, ExtractedFields, MergeOutcome, QuoteRequest};
use serde::Serialize;
use tracing::{info, warn};

use crate::assisted::LlmExtractor;
use crate::extractor::{ExtractionError, FieldExtractor};
use crate::llm::HttpLlmClient;
use crate::rules::RuleBasedExtractor;

const NOTHING_FOUND_MESSAGE: &str = "I couldn't find any project information in that text. Try \
including details like project name, company, address, contact info, or work description.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutcome {
    #[serde(rename = "extractedInfo")]
    pub fields: ExtractedFields,
    pub message: String,
    pub extractor: &'static str,
}

/// Front door for free-text extraction: input checks, extractor selection and the
/// chat-style summary message.
#[derive(Clone)]
pub struct ExtractionService {
    extractor: Arc<dyn FieldExtractor>,
    max_input_chars: usize,
}

impl ExtractionService {
    pub fn from_config(config: &AppConfig) -> Result<Self, ExtractionError> {
        Self::for_mode(config.effective_extraction_mode(), config)
    }

    pub fn for_mode(mode: ExtractionMode, config: &AppConfig) -> Result<Self, ExtractionError> {
        let extractor: Arc<dyn FieldExtractor> = match mode {
            ExtractionMode::Rules => Arc::new(RuleBasedExtractor::new()),
            ExtractionMode::Llm => {
                let client = HttpLlmClient::from_config(&config.llm)?;
                Arc::new(LlmExtractor::from_config(client, &config.llm))
            }
            ExtractionMode::Auto => {
                return Self::for_mode(
                    if config.llm.is_usable() { ExtractionMode::Llm } else { ExtractionMode::Rules },
                    config,
                )
            }
        };

        Ok(Self::with_extractor(extractor, config.extraction.max_input_chars))
    }

    pub fn with_extractor(extractor: Arc<dyn FieldExtractor>, max_input_chars: usize) -> Self {
        Self { extractor, max_input_chars }
    }

    pub fn extractor_name(&self) -> &'static str {
        self.extractor.name()
    }

    pub async fn extract(&self, text: &str) -> Result<ExtractionOutcome, ExtractionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractionError::EmptyInput);
        }
        if text.chars().count() > self.max_input_chars {
            return Err(ExtractionError::InputTooLong { limit: self.max_input_chars });
        }

        let fields = self.extractor.extract(text).await.map_err(|error| {
            warn!(
                event_name = "agent.extraction.failed",
                extractor = self.extractor.name(),
                error = %error,
                "field extraction failed"
            );
            error
        })?;

        info!(
            event_name = "agent.extraction.completed",
            extractor = self.extractor.name(),
            field_count = fields.len(),
            "field extraction completed"
        );

        Ok(ExtractionOutcome {
            message: summary_message(&fields),
            fields,
            extractor: self.extractor.name(),
        })
    }

    /// Extracts and folds the result into `request`; the caller's request is not touched.
    pub async fn extract_and_merge(
        &self,
        text: &str,
        request: &QuoteRequest,
    ) -> Result<(ExtractionOutcome, MergeOutcome), ExtractionError> {
        let outcome = self.extract(text).await?;
        let merged = merge_with_outcome(request, &outcome.fields);
        Ok((outcome, merged))
    }
}

pub fn summary_message(fields: &ExtractedFields) -> String {
    if fields.is_empty() {
        return NOTHING_FOUND_MESSAGE.to_string();
    }

    let keys = fields.keys().map(String::as_str).collect::<Vec<_>>().join(", ");
    format!(
        "Great! I extracted information for: {keys}. The form has been updated with the extracted data."
    )
}
