use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::equipment::StorageType;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageCost {
    pub storage_type: StorageType,
    pub square_footage: Option<Decimal>,
    pub rate_per_sqft: Option<Decimal>,
    pub monthly_cost: Decimal,
}

impl StorageCost {
    fn none(storage_type: StorageType, square_footage: Option<Decimal>) -> Self {
        Self {
            storage_type,
            square_footage,
            rate_per_sqft: storage_type.monthly_rate(),
            monthly_cost: Decimal::ZERO,
        }
    }

    pub fn is_billable(&self) -> bool {
        self.monthly_cost > Decimal::ZERO
    }

    /// Two decimal places, for display only.
    pub fn monthly_display(&self) -> String {
        format_money(self.monthly_cost)
    }
}

/// Rounds half away from zero to cents, matching how the form displayed totals.
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Reads square footage the way the form field holds it. Blank, negative and
/// unreadable text all yield `None`; thousands separators are tolerated.
pub fn parse_square_footage(raw: &str) -> Option<Decimal> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok().filter(|value| !value.is_sign_negative())
}

/// Monthly storage fee. An unreadable footage is "no cost yet", not an error.
pub fn storage_cost(storage_type: StorageType, raw_square_footage: &str) -> StorageCost {
    let square_footage = parse_square_footage(raw_square_footage);

    let (Some(rate), Some(footage)) = (storage_type.monthly_rate(), square_footage) else {
        if storage_type != StorageType::None && !raw_square_footage.trim().is_empty() {
            debug!(
                event_name = "quote.storage.unparsed_footage",
                storage_type = storage_type.label(),
                raw = raw_square_footage,
                "square footage did not parse; storage cost stays at zero"
            );
        }
        return StorageCost::none(storage_type, square_footage);
    };

    let Some(monthly_cost) = footage.checked_mul(rate) else {
        debug!(
            event_name = "quote.storage.cost_overflow",
            storage_type = storage_type.label(),
            raw = raw_square_footage,
            "square footage too large to price; storage cost stays at zero"
        );
        return StorageCost::none(storage_type, Some(footage));
    };

    StorageCost {
        storage_type,
        square_footage: Some(footage),
        rate_per_sqft: Some(rate),
        monthly_cost,
    }
}
