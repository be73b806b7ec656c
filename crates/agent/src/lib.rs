//! Free-text extraction for the quote form.
//!
//! Pasted work orders and emails are turned into a partial field mapping that
//! the core crate merges into a `QuoteRequest`:
//! 1. **Rules** (`rules`) - regex extraction of labelled lines, phones, crew and equipment
//! 2. **LLM** (`assisted`, `llm`) - chat-completion prompt returning a JSON object
//! 3. **Service** (`service`) - input limits, extractor selection, chat summary message
//!
//! # Safety Principle
//!
//! The model is strictly a translator. It proposes field text only; equipment
//! auto-selection, storage pricing and wording stay in the deterministic core.

pub mod assisted;
pub mod extractor;
pub mod llm;
pub mod rules;
pub mod service;

pub use assisted::{parse_completion, LlmExtractor};
pub use extractor::{ExtractionError, FieldExtractor};
pub use llm::{ChatPrompt, HttpLlmClient, LlmClient};
pub use rules::RuleBasedExtractor;
pub use service::{summary_message, ExtractionOutcome, ExtractionService};
