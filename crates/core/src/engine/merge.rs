use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::request::{QuoteField, QuoteRequest};

/// Field name to raw text, as returned by an extractor. Keys use the wire
/// form's camelCase names; snake_case is accepted too.
pub type ExtractedFields = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOutcome {
    pub request: QuoteRequest,
    pub applied: Vec<QuoteField>,
    /// Keys that were present and non-blank but unknown or unrepresentable.
    pub skipped: Vec<String>,
}

/// Non-empty extracted values overwrite; everything else is left alone.
pub fn merge_extracted_fields(request: &QuoteRequest, extracted: &ExtractedFields) -> QuoteRequest {
    merge_with_outcome(request, extracted).request
}

pub fn merge_with_outcome(request: &QuoteRequest, extracted: &ExtractedFields) -> MergeOutcome {
    let mut merged = request.clone();
    let mut applied = Vec::new();
    let mut skipped = Vec::new();

    for (key, value) in extracted {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match QuoteField::from_key(key) {
            Some(field) if merged.set_field(field, value) => applied.push(field),
            _ => skipped.push(key.clone()),
        }
    }

    if !skipped.is_empty() {
        debug!(
            event_name = "quote.merge.skipped_fields",
            skipped = ?skipped,
            "extracted fields could not be applied"
        );
    }

    MergeOutcome { request: merged, applied, skipped }
}
