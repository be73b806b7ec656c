use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::equipment::{
    EquipmentConfiguration, ForkliftSize, StorageType, TractorType, TrailerType, YardLocation,
};

pub const DEFAULT_CREW_SIZE: u32 = 3;
pub const DEFAULT_SIGNER: &str = "Kyle Thornton";

/// One form session's worth of input. Plain value: callers clone it, mutate their
/// copy, and hand it back to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteRequest {
    pub project_title: String,
    pub company_name: String,
    pub site_address: String,
    pub site_contact_name: String,
    pub site_contact_phone: String,
    #[serde(deserialize_with = "deserialize_crew_size")]
    pub crew_size: u32,
    pub forklift_size: ForkliftSize,
    pub trailer_type: TrailerType,
    pub tractor_type: TractorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_forklift: Option<ForkliftSize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_trailers: Vec<TrailerType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_tractors: Vec<TractorType>,
    pub work_description: String,
    pub storage_type: StorageType,
    #[serde(deserialize_with = "deserialize_text_or_number")]
    pub storage_square_footage: String,
    pub yard_location: YardLocation,
    pub your_name: String,
}

impl Default for QuoteRequest {
    fn default() -> Self {
        Self {
            project_title: String::new(),
            company_name: String::new(),
            site_address: String::new(),
            site_contact_name: String::new(),
            site_contact_phone: String::new(),
            crew_size: DEFAULT_CREW_SIZE,
            forklift_size: ForkliftSize::None,
            trailer_type: TrailerType::None,
            tractor_type: TractorType::None,
            secondary_forklift: None,
            additional_trailers: Vec::new(),
            additional_tractors: Vec::new(),
            work_description: String::new(),
            storage_type: StorageType::None,
            storage_square_footage: String::new(),
            yard_location: YardLocation::Shop,
            your_name: DEFAULT_SIGNER.to_string(),
        }
    }
}

impl QuoteRequest {
    pub fn with_signer(signer: impl Into<String>) -> Self {
        Self { your_name: signer.into(), ..Self::default() }
    }

    /// Switches the forklift selection. Leaving the Versalift 60/80 drops the
    /// compound rows it brought along; auto-selection itself happens in the normalizer.
    pub fn change_forklift(&mut self, forklift: ForkliftSize) {
        if self.forklift_size == ForkliftSize::Versalift60x80 && forklift != ForkliftSize::Versalift60x80
        {
            self.secondary_forklift = None;
            self.additional_trailers.clear();
            self.additional_tractors.clear();
        }
        self.forklift_size = forklift;
    }

    pub fn equipment(&self) -> EquipmentConfiguration {
        let forklifts = std::iter::once(&self.forklift_size)
            .chain(self.secondary_forklift.iter())
            .filter(|forklift| !forklift.is_none())
            .cloned()
            .collect();
        let trailers = std::iter::once(&self.trailer_type)
            .chain(self.additional_trailers.iter())
            .filter(|trailer| !trailer.is_none())
            .cloned()
            .collect();
        let tractors = std::iter::once(&self.tractor_type)
            .chain(self.additional_tractors.iter())
            .filter(|tractor| !tractor.is_none())
            .cloned()
            .collect();

        EquipmentConfiguration { forklifts, trailers, tractors }
    }

    /// Writes one field from raw text. Returns `false` when the text cannot be
    /// represented (zero/unreadable crew size, unknown storage type or yard).
    pub fn set_field(&mut self, field: QuoteField, value: &str) -> bool {
        match field {
            QuoteField::ProjectTitle => self.project_title = value.to_string(),
            QuoteField::CompanyName => self.company_name = value.to_string(),
            QuoteField::SiteAddress => self.site_address = value.to_string(),
            QuoteField::SiteContactName => self.site_contact_name = value.to_string(),
            QuoteField::SiteContactPhone => self.site_contact_phone = value.to_string(),
            QuoteField::CrewSize => match parse_crew_size(value) {
                Some(crew_size) => self.crew_size = crew_size,
                None => return false,
            },
            QuoteField::ForkliftSize => self.change_forklift(ForkliftSize::from_label(value)),
            QuoteField::TrailerType => self.trailer_type = TrailerType::from_label(value),
            QuoteField::TractorType => self.tractor_type = TractorType::from_label(value),
            QuoteField::WorkDescription => self.work_description = value.to_string(),
            QuoteField::StorageType => match StorageType::parse_label(value) {
                Some(storage_type) => self.storage_type = storage_type,
                None => return false,
            },
            QuoteField::StorageSquareFootage => self.storage_square_footage = value.to_string(),
            QuoteField::YardLocation => match YardLocation::parse_label(value) {
                Some(yard_location) => self.yard_location = yard_location,
                None => return false,
            },
            QuoteField::YourName => self.your_name = value.to_string(),
        }
        true
    }
}

/// The user-editable fields, keyed the way the wire form and the extractors name them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QuoteField {
    ProjectTitle,
    CompanyName,
    SiteAddress,
    SiteContactName,
    SiteContactPhone,
    CrewSize,
    ForkliftSize,
    TrailerType,
    TractorType,
    WorkDescription,
    StorageType,
    StorageSquareFootage,
    YardLocation,
    YourName,
}

impl QuoteField {
    pub const ALL: [QuoteField; 14] = [
        Self::ProjectTitle,
        Self::CompanyName,
        Self::SiteAddress,
        Self::SiteContactName,
        Self::SiteContactPhone,
        Self::CrewSize,
        Self::ForkliftSize,
        Self::TrailerType,
        Self::TractorType,
        Self::WorkDescription,
        Self::StorageType,
        Self::StorageSquareFootage,
        Self::YardLocation,
        Self::YourName,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::ProjectTitle => "projectTitle",
            Self::CompanyName => "companyName",
            Self::SiteAddress => "siteAddress",
            Self::SiteContactName => "siteContactName",
            Self::SiteContactPhone => "siteContactPhone",
            Self::CrewSize => "crewSize",
            Self::ForkliftSize => "forkliftSize",
            Self::TrailerType => "trailerType",
            Self::TractorType => "tractorType",
            Self::WorkDescription => "workDescription",
            Self::StorageType => "storageType",
            Self::StorageSquareFootage => "storageSquareFootage",
            Self::YardLocation => "yardLocation",
            Self::YourName => "yourName",
        }
    }

    /// Resolves camelCase, snake_case and the older form's `storageOption` /
    /// `squareFootage` names.
    pub fn from_key(key: &str) -> Option<Self> {
        let compact: String = key
            .chars()
            .filter(|character| !matches!(character, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        match compact.as_str() {
            "storageoption" => return Some(Self::StorageType),
            "squarefootage" => return Some(Self::StorageSquareFootage),
            _ => {}
        }

        Self::ALL.into_iter().find(|field| field.key().to_ascii_lowercase() == compact)
    }

    /// Bracketed stand-in rendered when a text field is empty.
    pub fn placeholder(self) -> Option<&'static str> {
        match self {
            Self::ProjectTitle => Some("[Project Title]"),
            Self::CompanyName => Some("[Company Name]"),
            Self::SiteAddress => Some("[Site Address]"),
            Self::SiteContactName => Some("[Site Contact Name]"),
            Self::SiteContactPhone => Some("[Site Contact Phone]"),
            Self::WorkDescription => Some("[Work Description]"),
            Self::YourName => Some("[Your Name]"),
            _ => None,
        }
    }
}

/// First run of digits, so "3", "3-man" and "3 man crew" all read as 3.
pub fn parse_crew_size(value: &str) -> Option<u32> {
    let digits: String = value
        .chars()
        .skip_while(|character| !character.is_ascii_digit())
        .take_while(|character| character.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok().filter(|crew_size| *crew_size > 0)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

fn deserialize_text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match TextOrNumber::deserialize(deserializer)? {
        TextOrNumber::Text(text) => text,
        TextOrNumber::Number(number) => number.to_string(),
    })
}

fn deserialize_crew_size<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = deserialize_text_or_number(deserializer)?;
    if raw.trim().is_empty() {
        return Ok(DEFAULT_CREW_SIZE);
    }
    parse_crew_size(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("crewSize must be a positive integer, got `{raw}`")))
}

#[cfg(test)]
mod tests {
    use crate::domain::equipment::{ForkliftSize, StorageType, TractorType, TrailerType};

    use super::{parse_crew_size, QuoteField, QuoteRequest};

    #[test]
    fn defaults_match_the_blank_form() {
        let request = QuoteRequest::default();
        assert_eq!(request.crew_size, 3);
        assert_eq!(request.your_name, "Kyle Thornton");
        assert_eq!(request.storage_type, StorageType::None);
        assert_eq!(request.yard_location.label(), "Shop");
    }

    #[test]
    fn deserializes_partial_camel_case_payload() {
        let request: QuoteRequest = serde_json::from_str(
            r#"{"projectTitle":"Press relocation","crewSize":"4-man","storageSquareFootage":100}"#,
        )
        .expect("payload should deserialize");

        assert_eq!(request.project_title, "Press relocation");
        assert_eq!(request.crew_size, 4);
        assert_eq!(request.storage_square_footage, "100");
        assert_eq!(request.your_name, "Kyle Thornton");
    }

    #[test]
    fn rejects_unreadable_crew_size() {
        let result = serde_json::from_str::<QuoteRequest>(r#"{"crewSize":"lots"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn crew_size_parsing_reads_leading_digits() {
        assert_eq!(parse_crew_size("3"), Some(3));
        assert_eq!(parse_crew_size("5-man"), Some(5));
        assert_eq!(parse_crew_size("crew of 6"), Some(6));
        assert_eq!(parse_crew_size("0"), None);
        assert_eq!(parse_crew_size("several"), None);
    }

    #[test]
    fn field_keys_resolve_across_naming_styles() {
        assert_eq!(QuoteField::from_key("siteAddress"), Some(QuoteField::SiteAddress));
        assert_eq!(QuoteField::from_key("site_address"), Some(QuoteField::SiteAddress));
        assert_eq!(QuoteField::from_key("storageOption"), Some(QuoteField::StorageType));
        assert_eq!(QuoteField::from_key("squareFootage"), Some(QuoteField::StorageSquareFootage));
        assert_eq!(QuoteField::from_key("email"), None);
    }

    #[test]
    fn equipment_view_skips_empty_rows() {
        let request = QuoteRequest {
            forklift_size: ForkliftSize::Versalift60x80,
            secondary_forklift: Some(ForkliftSize::Forklift15k),
            trailer_type: TrailerType::Stepdeck,
            additional_trailers: vec![TrailerType::Lowboy, TrailerType::None],
            tractor_type: TractorType::None,
            ..QuoteRequest::default()
        };

        let equipment = request.equipment();
        assert_eq!(equipment.forklifts, vec![ForkliftSize::Versalift60x80, ForkliftSize::Forklift15k]);
        assert_eq!(equipment.trailers, vec![TrailerType::Stepdeck, TrailerType::Lowboy]);
        assert!(equipment.tractors.is_empty());
    }

    #[test]
    fn leaving_compound_forklift_clears_secondary_rows() {
        let mut request = QuoteRequest {
            forklift_size: ForkliftSize::Versalift60x80,
            secondary_forklift: Some(ForkliftSize::Forklift15k),
            additional_trailers: vec![TrailerType::Lowboy],
            additional_tractors: vec![TractorType::FourAxle],
            ..QuoteRequest::default()
        };

        request.change_forklift(ForkliftSize::Forklift8k);

        assert_eq!(request.forklift_size, ForkliftSize::Forklift8k);
        assert_eq!(request.secondary_forklift, None);
        assert!(request.additional_trailers.is_empty());
        assert!(request.additional_tractors.is_empty());
    }

    #[test]
    fn set_field_rejects_unrepresentable_values() {
        let mut request = QuoteRequest::default();
        assert!(!request.set_field(QuoteField::StorageType, "garage"));
        assert!(!request.set_field(QuoteField::CrewSize, "0"));
        assert!(request.set_field(QuoteField::StorageType, "Indoor ($3.50/sqft)"));
        assert_eq!(request.storage_type, StorageType::Indoor);
        assert_eq!(request.crew_size, 3);
    }
}
