use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::request::QuoteRequest;
use crate::engine::storage::format_money;

/// Everything derived from one request snapshot. Recomputed on every change and
/// never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
    pub normalized_request: QuoteRequest,
    pub equipment_list: Vec<String>,
    pub storage_monthly_cost: Decimal,
    pub rendered_text: String,
}

impl QuoteResult {
    /// The normalized request, ready to be edited and fed back in.
    pub fn to_request_view(&self) -> QuoteRequest {
        self.normalized_request.clone()
    }

    pub fn storage_cost_display(&self) -> String {
        format_money(self.storage_monthly_cost)
    }
}
