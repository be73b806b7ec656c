use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::equipment::{ForkliftSize, TractorType, TrailerType};
use crate::domain::request::QuoteRequest;
use crate::errors::DomainError;

/// Whether auto-selection may replace a trailer/tractor the user already picked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationPolicy {
    #[default]
    Overwrite,
    PreserveUserChoice,
}

impl NormalizationPolicy {
    fn allows(self, slot_is_empty: bool) -> bool {
        matches!(self, Self::Overwrite) || slot_is_empty
    }
}

impl FromStr for NormalizationPolicy {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "preserve_user_choice" | "preserve" => Ok(Self::PreserveUserChoice),
            other => Err(DomainError::UnknownOption {
                field: "normalization",
                value: other.to_string(),
            }),
        }
    }
}

pub trait EquipmentNormalizer: Send + Sync {
    fn normalize(&self, request: &QuoteRequest) -> QuoteRequest;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RuleBasedNormalizer {
    policy: NormalizationPolicy,
}

impl RuleBasedNormalizer {
    pub fn new(policy: NormalizationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> NormalizationPolicy {
        self.policy
    }
}

impl EquipmentNormalizer for RuleBasedNormalizer {
    fn normalize(&self, request: &QuoteRequest) -> QuoteRequest {
        normalize_equipment(request, self.policy)
    }
}

/// Trailer implied by the forklift: the smaller counterbalance units ride a Rolldeck.
pub fn auto_trailer(forklift: &ForkliftSize) -> Option<TrailerType> {
    matches!(
        forklift,
        ForkliftSize::Forklift5k | ForkliftSize::Forklift8k | ForkliftSize::Forklift15k
    )
    .then_some(TrailerType::Rolldeck)
}

/// Tractor implied by the forklift: the large lifts need a 4-axel.
pub fn auto_tractor(forklift: &ForkliftSize) -> Option<TractorType> {
    matches!(
        forklift,
        ForkliftSize::Versalift40x60 | ForkliftSize::Versalift60x80 | ForkliftSize::Trilifter
    )
    .then_some(TractorType::FourAxle)
}

/// Applies the auto-selection rules for the current forklift. Forklifts without a
/// rule (including unrecognized ones) leave the request untouched.
pub fn normalize_equipment(request: &QuoteRequest, policy: NormalizationPolicy) -> QuoteRequest {
    let mut normalized = request.clone();
    let forklift = &request.forklift_size;

    if let Some(trailer) = auto_trailer(forklift) {
        if policy.allows(normalized.trailer_type.is_none()) {
            normalized.trailer_type = trailer;
        }
    }

    if let Some(tractor) = auto_tractor(forklift) {
        if policy.allows(normalized.tractor_type.is_none()) {
            normalized.tractor_type = tractor;
        }
    }

    if *forklift == ForkliftSize::Versalift60x80 {
        apply_versalift_60_80(&mut normalized, policy);
    } else if policy == NormalizationPolicy::Overwrite {
        clear_compound_rows(&mut normalized);
    }

    if normalized != *request {
        debug!(
            event_name = "quote.equipment.normalized",
            forklift = %forklift,
            trailer = %normalized.trailer_type,
            tractor = %normalized.tractor_type,
            policy = ?policy,
            "auto-selected equipment for forklift"
        );
    }

    normalized
}

// The 60/80 ships as two loads: Stepdeck and Lowboy, each behind a 4-axel, with a
// 15k forklift to set it.
fn apply_versalift_60_80(request: &mut QuoteRequest, policy: NormalizationPolicy) {
    let secondary_unset = request.secondary_forklift.as_ref().map_or(true, ForkliftSize::is_none);
    if policy.allows(secondary_unset) {
        request.secondary_forklift = Some(ForkliftSize::Forklift15k);
    }

    if policy.allows(request.trailer_type.is_none()) {
        request.trailer_type = TrailerType::Stepdeck;
    }
    if policy.allows(request.additional_trailers.is_empty()) {
        request.additional_trailers = vec![TrailerType::Lowboy];
    }

    if policy.allows(request.tractor_type.is_none()) {
        request.tractor_type = TractorType::FourAxle;
    }
    if policy.allows(request.additional_tractors.is_empty()) {
        request.additional_tractors = vec![TractorType::FourAxle];
    }
}

// Secondary rows only exist for the 60/80; a request posted back after a
// forklift change may still carry them.
fn clear_compound_rows(request: &mut QuoteRequest) {
    request.secondary_forklift = None;
    request.additional_trailers.clear();
    request.additional_tractors.clear();
}

#[cfg(test)]
mod tests {
    use crate::domain::equipment::{ForkliftSize, TractorType, TrailerType};
    use crate::domain::request::QuoteRequest;

    use super::{
        normalize_equipment, EquipmentNormalizer, NormalizationPolicy, RuleBasedNormalizer,
    };

    fn request_with(forklift: ForkliftSize) -> QuoteRequest {
        QuoteRequest { forklift_size: forklift, ..QuoteRequest::default() }
    }

    #[test]
    fn small_forklifts_select_rolldeck() {
        for forklift in [ForkliftSize::Forklift5k, ForkliftSize::Forklift8k, ForkliftSize::Forklift15k]
        {
            let normalized = normalize_equipment(&request_with(forklift), NormalizationPolicy::Overwrite);
            assert_eq!(normalized.trailer_type, TrailerType::Rolldeck);
            assert_eq!(normalized.tractor_type, TractorType::None);
        }
    }

    #[test]
    fn large_lifts_select_four_axle_tractor() {
        for forklift in [ForkliftSize::Versalift40x60, ForkliftSize::Trilifter] {
            let normalized = normalize_equipment(&request_with(forklift), NormalizationPolicy::Overwrite);
            assert_eq!(normalized.tractor_type, TractorType::FourAxle);
            assert_eq!(normalized.trailer_type, TrailerType::None);
        }
    }

    #[test]
    fn versalift_60_80_forces_compound_configuration() {
        let normalized = normalize_equipment(
            &request_with(ForkliftSize::Versalift60x80),
            NormalizationPolicy::Overwrite,
        );
        let equipment = normalized.equipment();

        assert_eq!(normalized.secondary_forklift, Some(ForkliftSize::Forklift15k));
        assert_eq!(equipment.trailers, vec![TrailerType::Stepdeck, TrailerType::Lowboy]);
        assert_eq!(equipment.tractors, vec![TractorType::FourAxle, TractorType::FourAxle]);
    }

    #[test]
    fn forklifts_without_rules_leave_selection_untouched() {
        let request = QuoteRequest {
            forklift_size: ForkliftSize::Forklift30k,
            trailer_type: TrailerType::Dovetail,
            tractor_type: TractorType::ThreeAxle,
            ..QuoteRequest::default()
        };
        assert_eq!(normalize_equipment(&request, NormalizationPolicy::Overwrite), request);

        let unknown = request_with(ForkliftSize::Other("Gantry".to_string()));
        assert_eq!(normalize_equipment(&unknown, NormalizationPolicy::Overwrite), unknown);
    }

    #[test]
    fn overwrite_policy_replaces_user_choice() {
        let request = QuoteRequest {
            forklift_size: ForkliftSize::Forklift8k,
            trailer_type: TrailerType::Lowboy,
            ..QuoteRequest::default()
        };
        let normalized = normalize_equipment(&request, NormalizationPolicy::Overwrite);
        assert_eq!(normalized.trailer_type, TrailerType::Rolldeck);
    }

    #[test]
    fn preserve_policy_only_fills_empty_slots() {
        let request = QuoteRequest {
            forklift_size: ForkliftSize::Versalift60x80,
            trailer_type: TrailerType::Curtain,
            tractor_type: TractorType::ThreeAxle,
            ..QuoteRequest::default()
        };
        let normalizer = RuleBasedNormalizer::new(NormalizationPolicy::PreserveUserChoice);
        let normalized = normalizer.normalize(&request);

        assert_eq!(normalized.trailer_type, TrailerType::Curtain);
        assert_eq!(normalized.tractor_type, TractorType::ThreeAxle);
        assert_eq!(normalized.additional_trailers, vec![TrailerType::Lowboy]);
        assert_eq!(normalized.additional_tractors, vec![TractorType::FourAxle]);
        assert_eq!(normalized.secondary_forklift, Some(ForkliftSize::Forklift15k));
    }

    #[test]
    fn normalization_is_idempotent_under_both_policies() {
        let inputs = [
            request_with(ForkliftSize::Forklift5k),
            request_with(ForkliftSize::Versalift60x80),
            QuoteRequest {
                forklift_size: ForkliftSize::Trilifter,
                trailer_type: TrailerType::Stepdeck,
                ..QuoteRequest::default()
            },
            request_with(ForkliftSize::None),
        ];

        for policy in [NormalizationPolicy::Overwrite, NormalizationPolicy::PreserveUserChoice] {
            for input in &inputs {
                let once = normalize_equipment(input, policy);
                let twice = normalize_equipment(&once, policy);
                assert_eq!(once, twice, "policy {policy:?} should be idempotent");
            }
        }
    }

    #[test]
    fn posted_back_request_drops_stale_compound_rows() {
        let compound = normalize_equipment(
            &request_with(ForkliftSize::Versalift60x80),
            NormalizationPolicy::Overwrite,
        );
        let mut wire = serde_json::to_value(&compound).expect("serialize request");
        wire["forkliftSize"] = serde_json::json!("Forklift (8k)");
        let posted: QuoteRequest = serde_json::from_value(wire).expect("deserialize request");
        assert_eq!(posted.additional_trailers, vec![TrailerType::Lowboy]);

        let normalized = normalize_equipment(&posted, NormalizationPolicy::Overwrite);
        let equipment = normalized.equipment();

        assert_eq!(normalized.secondary_forklift, None);
        assert!(normalized.additional_trailers.is_empty());
        assert!(normalized.additional_tractors.is_empty());
        assert_eq!(equipment.trailers, vec![TrailerType::Rolldeck]);
        assert!(!equipment.trailers.contains(&TrailerType::Lowboy));
        assert_eq!(normalize_equipment(&normalized, NormalizationPolicy::Overwrite), normalized);
    }

    #[test]
    fn preserve_policy_keeps_compound_rows_after_forklift_change() {
        let request = QuoteRequest {
            forklift_size: ForkliftSize::Forklift8k,
            secondary_forklift: Some(ForkliftSize::Forklift15k),
            additional_trailers: vec![TrailerType::Lowboy],
            ..QuoteRequest::default()
        };
        let normalized = normalize_equipment(&request, NormalizationPolicy::PreserveUserChoice);
        assert_eq!(normalized.secondary_forklift, Some(ForkliftSize::Forklift15k));
        assert_eq!(normalized.additional_trailers, vec![TrailerType::Lowboy]);
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("overwrite".parse::<NormalizationPolicy>(), Ok(NormalizationPolicy::Overwrite));
        assert_eq!(
            "preserve_user_choice".parse::<NormalizationPolicy>(),
            Ok(NormalizationPolicy::PreserveUserChoice)
        );
        assert!("sometimes".parse::<NormalizationPolicy>().is_err());
    }
}
