use async_trait::async_trait;
use rigquote_core::config::LlmConfig;
use rigquote_core::{ExtractedFields, ForkliftSize, QuoteField, TractorType, TrailerType};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::extractor::{ExtractionError, FieldExtractor};
use crate::llm::{ChatPrompt, LlmClient};

/// LLM-backed extraction. The model only proposes field text; the quote engine
/// still decides equipment and pricing.
pub struct LlmExtractor<C> {
    client: C,
    temperature: f32,
    max_tokens: u32,
}

impl<C> LlmExtractor<C>
where
    C: LlmClient,
{
    pub fn new(client: C, temperature: f32, max_tokens: u32) -> Self {
        Self { client, temperature, max_tokens }
    }

    pub fn from_config(client: C, config: &LlmConfig) -> Self {
        Self::new(client, config.temperature, config.max_tokens)
    }

    pub fn prompt_for(&self, text: &str) -> ChatPrompt {
        ChatPrompt {
            system: system_prompt(),
            user: text.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl<C> FieldExtractor for LlmExtractor<C>
where
    C: LlmClient,
{
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn extract(&self, text: &str) -> Result<ExtractedFields, ExtractionError> {
        let completion = self.client.complete(&self.prompt_for(text)).await?;
        let fields = parse_completion(&completion).map_err(|error| {
            warn!(
                event_name = "agent.extraction.invalid_completion",
                error = %error,
                completion_chars = completion.len(),
                "llm completion did not contain a usable JSON object"
            );
            error
        })?;

        info!(
            event_name = "agent.extraction.llm",
            field_count = fields.len(),
            "llm extraction finished"
        );
        Ok(fields)
    }
}

pub fn system_prompt() -> String {
    let forklifts = option_list(ForkliftSize::OPTIONS.iter().map(|option| option.label()));
    let trailers = option_list(TrailerType::OPTIONS.iter().map(|option| option.label()));
    let tractors = option_list(TractorType::OPTIONS.iter().map(|option| option.label()));

    format!(
        "You are an expert at extracting project information from text for an equipment rigging \
         and rental company. Extract the following information from the provided text and return \
         it as a JSON object with these exact keys:\n\
         - projectTitle: The name or title of the project/job\n\
         - companyName: The company or client name\n\
         - siteAddress: The complete address where work will be performed\n\
         - siteContactName: The name of the person to contact at the site\n\
         - siteContactPhone: The phone number for the site contact\n\
         - crewSize: The number of crew members, as a whole number\n\
         - forkliftSize: One of {forklifts}\n\
         - trailerType: One of {trailers}\n\
         - tractorType: One of {tractors}\n\
         - workDescription: A description of the work to be performed\n\n\
         Only include fields where you can confidently extract the information. If a field cannot \
         be determined from the text, omit it from the response. Return only valid JSON, no \
         additional text."
    )
}

/// Reads the first `{ ... }` object out of a completion. String values are kept,
/// numbers and booleans are stringified, everything else and unknown keys are dropped.
pub fn parse_completion(completion: &str) -> Result<ExtractedFields, ExtractionError> {
    let start = completion.find('{');
    let end = completion.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &completion[start..=end],
        _ => {
            return Err(ExtractionError::InvalidResponse(
                "completion contains no JSON object".to_string(),
            ))
        }
    };

    let object: Map<String, Value> = serde_json::from_str(json)
        .map_err(|error| ExtractionError::InvalidResponse(error.to_string()))?;

    let fields = object
        .into_iter()
        .filter_map(|(key, value)| {
            let field = QuoteField::from_key(&key)?;
            let text = match value {
                Value::String(text) => text.trim().to_string(),
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => return None,
            };
            (!text.is_empty()).then(|| (field.key().to_string(), text))
        })
        .collect();

    Ok(fields)
}

fn option_list<'a>(options: impl Iterator<Item = &'a str>) -> String {
    options.map(|option| format!("\"{option}\"")).collect::<Vec<_>>().join(", ")
}
