use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Forklift / lift selection. Labels match the form options; anything else that
/// arrives (typically from extraction) is carried verbatim as `Other`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ForkliftSize {
    #[default]
    None,
    Forklift5k,
    Forklift8k,
    Forklift15k,
    Forklift30k,
    Hoist18x26,
    Versalift25x35,
    Versalift40x60,
    Versalift60x80,
    Trilifter,
    Other(String),
}

impl ForkliftSize {
    pub const OPTIONS: [ForkliftSize; 9] = [
        Self::Forklift5k,
        Self::Forklift8k,
        Self::Forklift15k,
        Self::Forklift30k,
        Self::Hoist18x26,
        Self::Versalift25x35,
        Self::Versalift40x60,
        Self::Versalift60x80,
        Self::Trilifter,
    ];

    pub fn label(&self) -> &str {
        match self {
            Self::None => "",
            Self::Forklift5k => "Forklift (5k)",
            Self::Forklift8k => "Forklift (8k)",
            Self::Forklift15k => "Forklift (15k)",
            Self::Forklift30k => "Forklift (30k)",
            Self::Hoist18x26 => "Forklift - Hoist 18/26",
            Self::Versalift25x35 => "Versalift 25/35",
            Self::Versalift40x60 => "Versalift 40/60",
            Self::Versalift60x80 => "Versalift 60/80",
            Self::Trilifter => "Trilifter",
            Self::Other(value) => value,
        }
    }

    pub fn from_label(value: &str) -> Self {
        let trimmed = value.trim();
        if is_none_label(trimmed) {
            return Self::None;
        }

        let wanted = fold(trimmed);
        Self::OPTIONS
            .into_iter()
            .find(|option| fold(option.label()) == wanted)
            .unwrap_or_else(|| Self::Other(trimmed.to_string()))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Counterbalance forklifts read as "<size> forklift" in the equipment list;
    /// lifts such as the Versalift range keep their bare model name.
    pub fn is_counterbalance(&self) -> bool {
        self.label().starts_with("Forklift")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrailerType {
    #[default]
    None,
    Rolldeck,
    Stepdeck,
    Lowboy,
    Dovetail,
    StretchDoubleDrop,
    Curtain,
    Other(String),
}

impl TrailerType {
    pub const OPTIONS: [TrailerType; 6] = [
        Self::Rolldeck,
        Self::Stepdeck,
        Self::Lowboy,
        Self::Dovetail,
        Self::StretchDoubleDrop,
        Self::Curtain,
    ];

    pub fn label(&self) -> &str {
        match self {
            Self::None => "",
            Self::Rolldeck => "Rolldeck",
            Self::Stepdeck => "Stepdeck",
            Self::Lowboy => "Lowboy",
            Self::Dovetail => "Dovetail",
            Self::StretchDoubleDrop => "Stretch Double Drop",
            Self::Curtain => "Curtain",
            Self::Other(value) => value,
        }
    }

    pub fn from_label(value: &str) -> Self {
        let trimmed = strip_suffix_ignore_case(value.trim(), "trailer").trim();
        if is_none_label(trimmed) {
            return Self::None;
        }

        let wanted = fold(trimmed).replace(' ', "");
        Self::OPTIONS
            .into_iter()
            .find(|option| fold(option.label()).replace(' ', "") == wanted)
            .unwrap_or_else(|| Self::Other(trimmed.to_string()))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Tractor selection. The form spells the axle counts "3-axel" / "4-axel" and the
/// rendered text keeps that spelling.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TractorType {
    #[default]
    None,
    ThreeAxle,
    FourAxle,
    Other(String),
}

impl TractorType {
    pub const OPTIONS: [TractorType; 2] = [Self::ThreeAxle, Self::FourAxle];

    pub fn label(&self) -> &str {
        match self {
            Self::None => "None",
            Self::ThreeAxle => "3-axel",
            Self::FourAxle => "4-axel",
            Self::Other(value) => value,
        }
    }

    pub fn from_label(value: &str) -> Self {
        let trimmed = strip_suffix_ignore_case(value.trim(), "tractor").trim();
        if is_none_label(trimmed) {
            return Self::None;
        }

        let compact: String = fold(trimmed)
            .replace("axle", "axel")
            .chars()
            .filter(|character| !matches!(character, ' ' | '-'))
            .collect();
        match compact.as_str() {
            "3axel" => Self::ThreeAxle,
            "4axel" => Self::FourAxle,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StorageType {
    #[default]
    None,
    Outdoor,
    Indoor,
}

impl StorageType {
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Outdoor => "Outdoor",
            Self::Indoor => "Indoor",
        }
    }

    /// Accepts the plain labels as well as the form's button captions
    /// ("Outdoor ($2.50/sqft)", "No Storage").
    pub fn parse_label(value: &str) -> Option<Self> {
        let folded = fold(value.trim());
        if folded.is_empty() || folded == "none" || folded == "no storage" {
            return Some(Self::None);
        }
        if folded.starts_with("outdoor") {
            return Some(Self::Outdoor);
        }
        if folded.starts_with("indoor") {
            return Some(Self::Indoor);
        }
        None
    }

    /// Monthly rate per square foot.
    pub fn monthly_rate(self) -> Option<Decimal> {
        match self {
            Self::None => None,
            Self::Outdoor => Some(Decimal::new(250, 2)),
            Self::Indoor => Some(Decimal::new(350, 2)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum YardLocation {
    #[default]
    Shop,
    Mukilteo,
    Fife,
}

impl YardLocation {
    pub fn label(self) -> &'static str {
        match self {
            Self::Shop => "Shop",
            Self::Mukilteo => "Mukilteo",
            Self::Fife => "Fife",
        }
    }

    pub fn parse_label(value: &str) -> Option<Self> {
        match fold(value.trim()).as_str() {
            "" | "shop" | "shop (default)" => Some(Self::Shop),
            "mukilteo" => Some(Self::Mukilteo),
            "fife" => Some(Self::Fife),
            _ => None,
        }
    }
}

/// Ordered equipment rows after normalization: primary selections first, then the
/// secondary rows a compound configuration adds. Empty and "None" rows are skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentConfiguration {
    pub forklifts: Vec<ForkliftSize>,
    pub trailers: Vec<TrailerType>,
    pub tractors: Vec<TractorType>,
}

macro_rules! label_conversions {
    ($($kind:ty),+) => {
        $(
            impl fmt::Display for $kind {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.label())
                }
            }

            impl From<$kind> for String {
                fn from(value: $kind) -> Self {
                    value.label().to_string()
                }
            }
        )+
    };
}

label_conversions!(ForkliftSize, TrailerType, TractorType, StorageType, YardLocation);

impl From<String> for ForkliftSize {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<String> for TrailerType {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<String> for TractorType {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl TryFrom<String> for StorageType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_label(&value)
            .ok_or(DomainError::UnknownOption { field: "storageType", value })
    }
}

impl TryFrom<String> for YardLocation {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_label(&value)
            .ok_or(DomainError::UnknownOption { field: "yardLocation", value })
    }
}

fn fold(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase()
}

fn is_none_label(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("none")
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> &'a str {
    let split = value.len().saturating_sub(suffix.len());
    match (value.get(..split), value.get(split..)) {
        (Some(head), Some(tail)) if split > 0 && tail.eq_ignore_ascii_case(suffix) => head,
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{ForkliftSize, StorageType, TractorType, TrailerType, YardLocation};

    #[test]
    fn forklift_labels_parse_case_and_space_insensitively() {
        assert_eq!(ForkliftSize::from_label("forklift (8K)"), ForkliftSize::Forklift8k);
        assert_eq!(ForkliftSize::from_label("  Versalift   60/80 "), ForkliftSize::Versalift60x80);
        assert_eq!(ForkliftSize::from_label(""), ForkliftSize::None);
        assert_eq!(ForkliftSize::from_label("None"), ForkliftSize::None);
    }

    #[test]
    fn unknown_forklift_is_carried_verbatim() {
        let parsed = ForkliftSize::from_label("Carry deck crane");
        assert_eq!(parsed, ForkliftSize::Other("Carry deck crane".to_string()));
        assert_eq!(parsed.label(), "Carry deck crane");
    }

    #[test]
    fn counterbalance_detection_follows_label_prefix() {
        assert!(ForkliftSize::Forklift5k.is_counterbalance());
        assert!(ForkliftSize::Hoist18x26.is_counterbalance());
        assert!(!ForkliftSize::Versalift40x60.is_counterbalance());
        assert!(!ForkliftSize::Trilifter.is_counterbalance());
    }

    #[test]
    fn trailer_parsing_tolerates_suffix_and_spacing() {
        assert_eq!(TrailerType::from_label("Roll deck trailer"), TrailerType::Rolldeck);
        assert_eq!(TrailerType::from_label("stretch double drop"), TrailerType::StretchDoubleDrop);
        assert_eq!(TrailerType::from_label("None"), TrailerType::None);
    }

    #[test]
    fn tractor_parsing_accepts_both_axle_spellings() {
        assert_eq!(TractorType::from_label("4-axel"), TractorType::FourAxle);
        assert_eq!(TractorType::from_label("3 axle tractor"), TractorType::ThreeAxle);
        assert_eq!(TractorType::from_label(""), TractorType::None);
        assert_eq!(TractorType::FourAxle.to_string(), "4-axel");
    }

    #[test]
    fn storage_type_accepts_form_captions() {
        assert_eq!(StorageType::parse_label("Outdoor ($2.50/sqft)"), Some(StorageType::Outdoor));
        assert_eq!(StorageType::parse_label("Indoor"), Some(StorageType::Indoor));
        assert_eq!(StorageType::parse_label("No Storage"), Some(StorageType::None));
        assert_eq!(StorageType::parse_label("garage"), None);
        assert_eq!(StorageType::Indoor.monthly_rate(), Some(Decimal::new(350, 2)));
        assert_eq!(StorageType::None.monthly_rate(), None);
    }

    #[test]
    fn yard_location_defaults_to_shop_for_blank() {
        assert_eq!(YardLocation::parse_label(""), Some(YardLocation::Shop));
        assert_eq!(YardLocation::parse_label("fife"), Some(YardLocation::Fife));
        assert_eq!(YardLocation::parse_label("Tacoma"), None);
    }

    #[test]
    fn enums_serialize_as_labels() {
        let json = serde_json::to_string(&ForkliftSize::Versalift40x60).expect("serialize");
        assert_eq!(json, "\"Versalift 40/60\"");

        let parsed: StorageType = serde_json::from_str("\"Outdoor\"").expect("deserialize");
        assert_eq!(parsed, StorageType::Outdoor);

        let rejected = serde_json::from_str::<YardLocation>("\"Tacoma\"");
        assert!(rejected.is_err());
    }
}
