//! Plain-text quote email rendering.
//!
//! The built-in template ships inside the binary; deployments may point
//! `quote.template_path` at their own Tera file using the same context.

use std::collections::HashMap;
use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

use crate::domain::equipment::StorageType;
use crate::domain::request::{QuoteField, QuoteRequest};
use crate::engine::storage::{format_money, StorageCost};
use crate::errors::ApplicationError;

pub const TEMPLATE_NAME: &str = "quote_email.txt";
const BUILTIN_TEMPLATE: &str = include_str!("../../templates/quote_email.txt.tera");

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to read quote template `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("quote template error: {0}")]
    Template(String),
}

impl From<RenderError> for ApplicationError {
    fn from(error: RenderError) -> Self {
        ApplicationError::Template(error.to_string())
    }
}

impl From<tera::Error> for RenderError {
    fn from(error: tera::Error) -> Self {
        // Tera keeps the useful detail (line, missing variable) in the source chain.
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        RenderError::Template(message)
    }
}

/// Everything the template sees besides the request itself.
#[derive(Clone, Copy, Debug)]
pub struct RenderInput<'a> {
    pub request: &'a QuoteRequest,
    pub equipment_list: &'a str,
    pub storage: &'a StorageCost,
    pub business_name: &'a str,
}

#[derive(Debug, Serialize)]
struct StorageView {
    rate: String,
    monthly: String,
    square_footage: String,
}

#[derive(Debug)]
pub struct QuoteRenderer {
    tera: Tera,
    custom: bool,
}

impl QuoteRenderer {
    pub fn builtin() -> Self {
        let mut tera = new_tera();
        tera.add_raw_template(TEMPLATE_NAME, BUILTIN_TEMPLATE)
            .expect("Failed to load quote_email.txt.tera template");
        Self { tera, custom: false }
    }

    pub fn from_template_str(source: &str) -> Result<Self, RenderError> {
        let mut tera = new_tera();
        tera.add_raw_template(TEMPLATE_NAME, source)?;
        Ok(Self { tera, custom: true })
    }

    pub fn from_path(path: &Path) -> Result<Self, RenderError> {
        let source = std::fs::read_to_string(path)
            .map_err(|source| RenderError::Read { path: path.to_path_buf(), source })?;
        Self::from_template_str(&source)
    }

    pub fn is_custom(&self) -> bool {
        self.custom
    }

    pub fn render(&self, input: &RenderInput<'_>) -> Result<String, RenderError> {
        Ok(self.tera.render(TEMPLATE_NAME, &build_context(input))?)
    }
}

impl Default for QuoteRenderer {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Template context. Empty text fields are swapped for their bracketed
/// placeholder so a half-filled form still previews.
pub fn build_context(input: &RenderInput<'_>) -> Context {
    let request = input.request;
    let mut context = Context::new();

    context.insert("recipient", &filled(&request.site_contact_name, QuoteField::SiteContactName));
    context.insert("project_title", &filled(&request.project_title, QuoteField::ProjectTitle));
    context.insert("company_name", &filled(&request.company_name, QuoteField::CompanyName));
    context.insert("site_address", &filled(&request.site_address, QuoteField::SiteAddress));
    context
        .insert("site_contact_name", &filled(&request.site_contact_name, QuoteField::SiteContactName));
    context.insert(
        "site_contact_phone",
        &filled(&request.site_contact_phone, QuoteField::SiteContactPhone),
    );
    context.insert("crew_size", &request.crew_size);
    context.insert("equipment_list", input.equipment_list);
    context.insert("work_description", &filled(&request.work_description, QuoteField::WorkDescription));
    context.insert("storage", &storage_view(input.storage));
    context.insert("return_location", request.yard_location.label());
    context.insert("signer_name", &filled(&request.your_name, QuoteField::YourName));
    context.insert("business_name", input.business_name);

    context
}

fn filled(value: &str, field: QuoteField) -> String {
    let trimmed = value.trim();
    match field.placeholder() {
        Some(placeholder) if trimmed.is_empty() => placeholder.to_string(),
        _ => trimmed.to_string(),
    }
}

fn storage_view(storage: &StorageCost) -> Option<StorageView> {
    if storage.storage_type == StorageType::None || !storage.is_billable() {
        return None;
    }
    let rate = storage.rate_per_sqft?;
    let square_footage = storage.square_footage?;

    Some(StorageView {
        rate: rate.to_string(),
        monthly: storage.monthly_cost.to_string(),
        square_footage: square_footage.normalize().to_string(),
    })
}

fn new_tera() -> Tera {
    let mut tera = Tera::default();
    tera.autoescape_on(Vec::new());
    tera.register_filter("money", money_filter);
    tera
}

/// `{{ amount | money }}` renders a decimal string or number with two places.
fn money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let amount = match value {
        tera::Value::String(text) => Decimal::from_str(text.trim())
            .map_err(|error| tera::Error::msg(format!("money filter: `{text}` is not a number: {error}")))?,
        tera::Value::Number(number) => Decimal::from_str(&number.to_string())
            .map_err(|error| tera::Error::msg(format!("money filter: {error}")))?,
        tera::Value::Null => Decimal::ZERO,
        other => return Err(tera::Error::msg(format!("money filter expects a number, got {other}"))),
    };
    Ok(tera::Value::String(format_money(amount)))
}
