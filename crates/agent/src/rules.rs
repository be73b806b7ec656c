//! Offline extraction from labelled lines ("Project: ...", "Contact: ...") and
//! the equipment vocabulary the form understands.

use async_trait::async_trait;
use regex::{Captures, Regex};
use rigquote_core::{ExtractedFields, ForkliftSize, QuoteField, TractorType, TrailerType};
use tracing::debug;

use crate::extractor::{ExtractionError, FieldExtractor};

const PHONE: &str = r"(?:\+?1[\s.\-]?)?(?:\(\d{3}\)|\b\d{3})[\s.\-]?\d{3}[\s.\-]?\d{4}\b";

pub struct RuleBasedExtractor {
    project_pattern: Regex,
    company_pattern: Regex,
    address_pattern: Regex,
    address_continuation_pattern: Regex,
    contact_pattern: Regex,
    labelled_phone_pattern: Regex,
    phone_pattern: Regex,
    work_pattern: Regex,
    label_line_pattern: Regex,
    crew_patterns: Vec<Regex>,
    forklift_capacity_pattern: Regex,
    versalift_pattern: Regex,
    trilifter_pattern: Regex,
    hoist_pattern: Regex,
    trailer_pattern: Regex,
    tractor_pattern: Regex,
}

impl RuleBasedExtractor {
    pub fn new() -> Self {
        Self {
            project_pattern: pattern(
                r"(?im)^[ \t]*(?:project(?:[ \t]+(?:title|name))?|job(?:[ \t]+name)?)[ \t]*[:\-][ \t]*(\S.*?)[ \t]*$",
            ),
            company_pattern: pattern(
                r"(?im)^[ \t]*(?:company|client|contractor|customer)(?:[ \t]+name)?[ \t]*[:\-][ \t]*(\S.*?)[ \t]*$",
            ),
            address_pattern: pattern(
                r"(?im)^[ \t]*(?:site[ \t]+address|job[ \t]*site|address|location|site)[ \t]*[:\-][ \t]*(\S.*?)[ \t]*$",
            ),
            address_continuation_pattern: pattern(
                r"(?i)^[ \t]*(\S.*(?:\b(?:street|st|avenue|ave|road|rd|blvd|way|drive|dr|lane|ln)\b.*|,[ \t]*[A-Z]{2}[ \t]+\d{5}(?:-\d{4})?))[ \t]*$",
            ),
            contact_pattern: pattern(
                r"(?im)^[ \t]*(?:site[ \t]+contact(?:[ \t]+name)?|on-?site[ \t]+contact|contact(?:[ \t]+name)?|foreman|supervisor|superintendent|manager)[ \t]*[:\-][ \t]*(\S.*?)[ \t]*$",
            ),
            labelled_phone_pattern: pattern(&format!(
                r"(?i)\b(?:phone|tel|telephone|cell|mobile)\b[ \t]*(?:number)?[ \t]*[:#\-]?[ \t]*({PHONE})"
            )),
            phone_pattern: pattern(&format!("({PHONE})")),
            work_pattern: pattern(
                r"(?im)^[ \t]*(?:work(?:[ \t]+description)?|scope(?:[ \t]+of[ \t]+work)?|description|task)[ \t]*[:\-][ \t]*(.*?)[ \t]*$",
            ),
            label_line_pattern: pattern(r"^[ \t]*[A-Za-z][A-Za-z /]{0,30}:"),
            crew_patterns: vec![
                pattern(r"(?i)\bcrew(?:[ \t]+size)?[ \t]*[:\-][ \t]*(\d{1,2})\b"),
                pattern(r"(?i)\b(\d{1,2})[ \t]*-?[ \t]*(?:man|person|member)\b"),
                pattern(r"(?i)\bcrew[ \t]+of[ \t]+(\d{1,2})\b"),
            ],
            forklift_capacity_pattern: pattern(
                r"(?i)\b(5|8|15|30)[ \t]*(?:k|,?000[ \t]*(?:lb|lbs|#)?)\b[^\n]{0,12}?\bfork[ \t]*lift|\bfork[ \t]*lift[ \t]*\(?(5|8|15|30)[ \t]*k\b",
            ),
            versalift_pattern: pattern(r"(?i)\bversa-?lift[ \t]*(\d{2})[ \t]*/[ \t]*(\d{2})\b"),
            trilifter_pattern: pattern(r"(?i)\btri-?lifter\b"),
            hoist_pattern: pattern(r"(?i)\bhoist[ \t]*18[ \t]*/[ \t]*26\b"),
            trailer_pattern: pattern(
                r"(?i)\b(roll[ \t\-]?deck|step[ \t\-]?deck|low[ \t\-]?boy|dove[ \t\-]?tail|stretch[ \t]+double[ \t]+drop|curtain)",
            ),
            tractor_pattern: pattern(r"(?i)\b([34])[ \t]*-?[ \t]*ax(?:le|el)\b"),
        }
    }

    /// Synchronous core of [`FieldExtractor::extract`].
    pub fn extract_fields(&self, text: &str) -> ExtractedFields {
        let mut fields = ExtractedFields::new();
        let mut insert = |field: QuoteField, value: Option<String>| {
            if let Some(value) = value.map(|value| value.trim().to_string()) {
                if !value.is_empty() {
                    fields.insert(field.key().to_string(), value);
                }
            }
        };

        insert(QuoteField::ProjectTitle, first_capture(&self.project_pattern, text));
        insert(QuoteField::CompanyName, first_capture(&self.company_pattern, text));
        insert(QuoteField::SiteAddress, self.site_address(text));
        insert(QuoteField::SiteContactName, self.contact_name(text));
        insert(QuoteField::SiteContactPhone, self.phone(text));
        insert(QuoteField::WorkDescription, self.work_description(text));
        insert(QuoteField::CrewSize, self.crew_size(text));
        insert(QuoteField::ForkliftSize, self.forklift(text).map(|forklift| forklift.to_string()));
        insert(QuoteField::TrailerType, self.trailer(text).map(|trailer| trailer.to_string()));
        insert(QuoteField::TractorType, self.tractor(text).map(|tractor| tractor.to_string()));

        debug!(
            event_name = "agent.extraction.rules",
            field_count = fields.len(),
            "rule-based extraction finished"
        );
        fields
    }

    fn site_address(&self, text: &str) -> Option<String> {
        let captures = self.address_pattern.captures(text)?;
        let first_line = captures.get(1)?.as_str().trim();
        let rest = &text[captures.get(0)?.end()..];
        let next_line = rest.lines().nth(1).unwrap_or_default();

        let continuation = if self.label_line_pattern.is_match(next_line) {
            None
        } else {
            first_capture(&self.address_continuation_pattern, next_line)
        };

        Some(match continuation {
            Some(continuation) => format!("{}, {continuation}", first_line.trim_end_matches(',')),
            None => first_line.to_string(),
        })
    }

    fn contact_name(&self, text: &str) -> Option<String> {
        let raw = first_capture(&self.contact_pattern, text)?;
        let without_phone = self.phone_pattern.replace_all(&raw, "");
        let name = without_phone
            .trim()
            .trim_end_matches(|character: char| {
                matches!(character, ',' | '-' | '(' | ')' | '@' | '/' | '|') || character.is_whitespace()
            })
            .trim_start_matches(|character: char| {
                matches!(character, ',' | '-' | ':') || character.is_whitespace()
            })
            .to_string();
        Some(name)
    }

    fn phone(&self, text: &str) -> Option<String> {
        first_capture(&self.labelled_phone_pattern, text)
            .or_else(|| first_capture(&self.phone_pattern, text))
    }

    fn work_description(&self, text: &str) -> Option<String> {
        let captures = self.work_pattern.captures(text)?;
        let mut lines = Vec::new();
        let head = captures.get(1).map(|value| value.as_str().trim()).unwrap_or_default();
        if !head.is_empty() {
            lines.push(head.to_string());
        }

        let rest = &text[captures.get(0)?.end()..];
        let mut following = rest.lines().skip(1);
        if lines.is_empty() {
            // "Scope of Work:" on its own line; skip blank lines before the body.
            for line in following.by_ref() {
                if !line.trim().is_empty() {
                    if self.label_line_pattern.is_match(line) {
                        return None;
                    }
                    lines.push(line.trim().to_string());
                    break;
                }
            }
        }

        for line in following {
            if line.trim().is_empty() || self.label_line_pattern.is_match(line) {
                break;
            }
            lines.push(line.trim().to_string());
        }

        (!lines.is_empty()).then(|| lines.join(" "))
    }

    fn crew_size(&self, text: &str) -> Option<String> {
        self.crew_patterns
            .iter()
            .find_map(|crew_pattern| first_capture(crew_pattern, text))
            .filter(|value| value.parse::<u32>().is_ok_and(|crew| crew > 0))
    }

    fn forklift(&self, text: &str) -> Option<ForkliftSize> {
        if let Some(captures) = self.versalift_pattern.captures(text) {
            let label = format!("Versalift {}/{}", &captures[1], &captures[2]);
            let forklift = ForkliftSize::from_label(&label);
            if !matches!(forklift, ForkliftSize::Other(_)) {
                return Some(forklift);
            }
        }
        if self.trilifter_pattern.is_match(text) {
            return Some(ForkliftSize::Trilifter);
        }
        if self.hoist_pattern.is_match(text) {
            return Some(ForkliftSize::Hoist18x26);
        }

        let captures = self.forklift_capacity_pattern.captures(text)?;
        let capacity = captures.get(1).or_else(|| captures.get(2))?.as_str();
        Some(ForkliftSize::from_label(&format!("Forklift ({capacity}k)")))
    }

    fn trailer(&self, text: &str) -> Option<TrailerType> {
        let matched = first_capture(&self.trailer_pattern, text)?;
        let compact: String = matched
            .chars()
            .filter(|character| character.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase();

        let trailer = match compact.as_str() {
            "rolldeck" => TrailerType::Rolldeck,
            "stepdeck" => TrailerType::Stepdeck,
            "lowboy" => TrailerType::Lowboy,
            "dovetail" => TrailerType::Dovetail,
            "stretchdoubledrop" => TrailerType::StretchDoubleDrop,
            "curtain" => TrailerType::Curtain,
            _ => return None,
        };
        Some(trailer)
    }

    fn tractor(&self, text: &str) -> Option<TractorType> {
        match first_capture(&self.tractor_pattern, text)?.as_str() {
            "3" => Some(TractorType::ThreeAxle),
            "4" => Some(TractorType::FourAxle),
            _ => None,
        }
    }
}

impl Default for RuleBasedExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FieldExtractor for RuleBasedExtractor {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn extract(&self, text: &str) -> Result<ExtractedFields, ExtractionError> {
        Ok(self.extract_fields(text))
    }
}

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("extraction pattern must compile")
}

fn first_capture(regex: &Regex, text: &str) -> Option<String> {
    regex.captures(text).as_ref().and_then(group_text)
}

fn group_text(captures: &Captures<'_>) -> Option<String> {
    captures
        .iter()
        .skip(1)
        .flatten()
        .next()
        .map(|group| group.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}
