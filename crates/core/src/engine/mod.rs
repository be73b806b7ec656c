pub mod equipment_list;
pub mod merge;
pub mod normalizer;
pub mod renderer;
pub mod storage;

use std::path::PathBuf;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::request::{QuoteRequest, DEFAULT_SIGNER};
use crate::domain::result::QuoteResult;
use crate::errors::ApplicationError;

use self::equipment_list::{equipment_items, format_equipment_list, EquipmentListOptions, GearLine};
use self::normalizer::{EquipmentNormalizer, NormalizationPolicy, RuleBasedNormalizer};
use self::renderer::{QuoteRenderer, RenderInput};
use self::storage::storage_cost;

pub const DEFAULT_BUSINESS_NAME: &str = "Omega Morgan";

/// The `[quote]` configuration section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSettings {
    pub business_name: String,
    pub default_signer: String,
    pub gear_line: GearLine,
    pub normalization: NormalizationPolicy,
    pub rolldeck_phrase: bool,
    pub template_path: Option<PathBuf>,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            business_name: DEFAULT_BUSINESS_NAME.to_string(),
            default_signer: DEFAULT_SIGNER.to_string(),
            gear_line: GearLine::default(),
            normalization: NormalizationPolicy::default(),
            rolldeck_phrase: true,
            template_path: None,
        }
    }
}

impl QuoteSettings {
    pub fn list_options(&self) -> EquipmentListOptions {
        EquipmentListOptions { gear_line: self.gear_line, rolldeck_phrase: self.rolldeck_phrase }
    }
}

pub trait QuoteRuntime: Send + Sync {
    fn normalize_and_render(&self, request: &QuoteRequest) -> QuoteResult;
    fn new_request(&self) -> QuoteRequest;
}

/// Normalize, cost, list and render in one pass. Immutable after construction.
pub struct QuoteEngine<N = RuleBasedNormalizer> {
    normalizer: N,
    renderer: QuoteRenderer,
    fallback: Option<QuoteRenderer>,
    settings: QuoteSettings,
}

impl QuoteEngine<RuleBasedNormalizer> {
    /// Builds the engine described by `settings`. A custom template is loaded
    /// and trial-rendered here so broken templates surface at startup.
    pub fn from_settings(settings: QuoteSettings) -> Result<Self, ApplicationError> {
        let normalizer = RuleBasedNormalizer::new(settings.normalization);
        let Some(path) = settings.template_path.clone() else {
            return Ok(Self::new(normalizer, QuoteRenderer::builtin(), settings));
        };

        let renderer = QuoteRenderer::from_path(&path)?;
        let engine = Self::new(normalizer, renderer, settings);
        engine.trial_render()?;
        Ok(engine)
    }
}

impl<N> QuoteEngine<N>
where
    N: EquipmentNormalizer,
{
    pub fn new(normalizer: N, renderer: QuoteRenderer, settings: QuoteSettings) -> Self {
        let fallback = renderer.is_custom().then(QuoteRenderer::builtin);
        Self { normalizer, renderer, fallback, settings }
    }

    pub fn settings(&self) -> &QuoteSettings {
        &self.settings
    }

    pub fn uses_custom_template(&self) -> bool {
        self.renderer.is_custom()
    }

    pub fn new_request(&self) -> QuoteRequest {
        QuoteRequest::with_signer(self.settings.default_signer.clone())
    }

    pub fn normalize_and_render(&self, request: &QuoteRequest) -> QuoteResult {
        let normalized = self.normalizer.normalize(request);
        let storage = storage_cost(normalized.storage_type, &normalized.storage_square_footage);
        let equipment_list = equipment_items(&normalized.equipment(), &self.settings.list_options());
        let joined = format_equipment_list(&equipment_list);

        let input = RenderInput {
            request: &normalized,
            equipment_list: &joined,
            storage: &storage,
            business_name: &self.settings.business_name,
        };
        let rendered_text = match self.renderer.render(&input) {
            Ok(text) => text,
            Err(render_error) => {
                error!(
                    event_name = "quote.render.fallback",
                    error = %render_error,
                    "custom quote template failed; rendering with built-in template"
                );
                self.fallback
                    .as_ref()
                    .and_then(|fallback| fallback.render(&input).ok())
                    .unwrap_or_default()
            }
        };

        QuoteResult {
            normalized_request: normalized,
            equipment_list,
            storage_monthly_cost: storage.monthly_cost,
            rendered_text,
        }
    }

    fn trial_render(&self) -> Result<(), ApplicationError> {
        let request = self.new_request();
        let storage = storage_cost(request.storage_type, &request.storage_square_footage);
        self.renderer.render(&RenderInput {
            request: &request,
            equipment_list: self.settings.gear_line.label(),
            storage: &storage,
            business_name: &self.settings.business_name,
        })?;
        Ok(())
    }
}

impl Default for QuoteEngine<RuleBasedNormalizer> {
    fn default() -> Self {
        let settings = QuoteSettings::default();
        Self::new(RuleBasedNormalizer::new(settings.normalization), QuoteRenderer::builtin(), settings)
    }
}

impl<N> QuoteRuntime for QuoteEngine<N>
where
    N: EquipmentNormalizer,
{
    fn normalize_and_render(&self, request: &QuoteRequest) -> QuoteResult {
        QuoteEngine::<N>::normalize_and_render(self, request)
    }

    fn new_request(&self) -> QuoteRequest {
        QuoteEngine::<N>::new_request(self)
    }
}

/// [`QuoteEngine::normalize_and_render`] on the default engine.
pub fn normalize_and_render(request: &QuoteRequest) -> QuoteResult {
    static ENGINE: OnceLock<QuoteEngine> = OnceLock::new();
    ENGINE.get_or_init(QuoteEngine::default).normalize_and_render(request)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rust_decimal::Decimal;

    use crate::domain::equipment::{ForkliftSize, StorageType, TractorType, TrailerType, YardLocation};
    use crate::domain::request::QuoteRequest;
    use crate::engine::merge::{merge_extracted_fields, ExtractedFields};
    use crate::engine::normalizer::NormalizationPolicy;
    use crate::errors::ApplicationError;

    use super::equipment_list::GearLine;
    use super::renderer::QuoteRenderer;
    use super::{normalize_and_render, QuoteEngine, QuoteRuntime, QuoteSettings};

    fn filled_request() -> QuoteRequest {
        QuoteRequest {
            project_title: "Press relocation".to_string(),
            company_name: "Acme Fabrication".to_string(),
            site_address: "4410 Airport Way S, Seattle, WA 98108".to_string(),
            site_contact_name: "Dana Ruiz".to_string(),
            site_contact_phone: "(206) 555-0142".to_string(),
            crew_size: 4,
            forklift_size: ForkliftSize::Forklift8k,
            work_description: "Disconnect, skid and relocate one 200-ton press.".to_string(),
            yard_location: YardLocation::Fife,
            ..QuoteRequest::default()
        }
    }

    #[test]
    fn rendered_text_has_no_template_syntax() {
        let requests = [
            QuoteRequest::default(),
            filled_request(),
            QuoteRequest {
                forklift_size: ForkliftSize::Versalift60x80,
                storage_type: StorageType::Indoor,
                storage_square_footage: "1,250".to_string(),
                ..filled_request()
            },
        ];

        for request in &requests {
            let text = normalize_and_render(request).rendered_text;
            assert!(!text.contains("{{") && !text.contains("}}") && !text.contains("{%"), "{text}");
        }
    }

    #[test]
    fn filled_request_renders_the_full_email() {
        let result = normalize_and_render(&filled_request());

        assert_eq!(result.normalized_request.trailer_type, TrailerType::Rolldeck);
        assert_eq!(
            result.rendered_text,
            "Hello Dana Ruiz,\n\
             \n\
             Please find below the scope and quote details for the upcoming project:\n\
             \n\
             Project: Press relocation\n\
             Company: Acme Fabrication\n\
             \n\
             Scope of Work\n\
             Mobilize crew and Omega Morgan equipment to site:\n\
             \n\
             4410 Airport Way S, Seattle, WA 98108\n\
             \n\
             Dana Ruiz\n\
             (206) 555-0142\n\
             \n\
             Omega Morgan to supply a 4-man crew, Gear truck and trailer, and a Rolldeck, \
             Forklift (8k) forklift.\n\
             \n\
             Disconnect, skid and relocate one 200-ton press.\n\
             \n\
             When the job is complete, we will clean up debris and return to Fife.\n\
             \n\
             Let me know if you have any questions or need revisions to this scope.\n\
             \n\
             Best regards,\n\
             Kyle Thornton\n\
             Omega Morgan"
        );
    }

    #[test]
    fn renormalizing_the_request_view_is_stable() {
        let inputs = [
            filled_request(),
            QuoteRequest { forklift_size: ForkliftSize::Versalift60x80, ..filled_request() },
            QuoteRequest { forklift_size: ForkliftSize::Trilifter, ..QuoteRequest::default() },
            QuoteRequest {
                forklift_size: ForkliftSize::Other("Gantry".to_string()),
                trailer_type: TrailerType::Curtain,
                ..QuoteRequest::default()
            },
        ];

        for input in &inputs {
            let once = normalize_and_render(input);
            let twice = normalize_and_render(&once.to_request_view());
            assert_eq!(once.normalized_request, twice.normalized_request);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn eight_k_with_empty_trailer_selects_rolldeck() {
        let request = QuoteRequest { forklift_size: ForkliftSize::Forklift8k, ..QuoteRequest::default() };
        let result = normalize_and_render(&request);
        assert_eq!(result.normalized_request.trailer_type, TrailerType::Rolldeck);
    }

    #[test]
    fn versalift_60_80_renders_compound_configuration() {
        let request =
            QuoteRequest { forklift_size: ForkliftSize::Versalift60x80, ..QuoteRequest::default() };
        let result = normalize_and_render(&request);
        let equipment = result.normalized_request.equipment();

        assert_eq!(equipment.trailers, vec![TrailerType::Stepdeck, TrailerType::Lowboy]);
        assert_eq!(equipment.tractors, vec![TractorType::FourAxle, TractorType::FourAxle]);
        assert_eq!(result.normalized_request.secondary_forklift, Some(ForkliftSize::Forklift15k));
        assert_eq!(
            result.equipment_list,
            vec![
                "Gear truck and trailer",
                "Stepdeck with 4-axel tractor",
                "Lowboy with 4-axel tractor",
                "Versalift 60/80",
                "Forklift (15k) forklift",
            ]
        );
    }

    #[test]
    fn forklift_change_on_posted_view_drops_the_second_load() {
        let compound = normalize_and_render(&QuoteRequest {
            forklift_size: ForkliftSize::Versalift60x80,
            ..QuoteRequest::default()
        });
        let mut view = compound.to_request_view();
        view.forklift_size = ForkliftSize::Forklift8k;
        let json = serde_json::to_string(&view).expect("serialize view");
        let posted: QuoteRequest = serde_json::from_str(&json).expect("deserialize view");

        let result = normalize_and_render(&posted);

        assert_eq!(result.normalized_request.secondary_forklift, None);
        assert!(result.equipment_list.contains(&"Forklift (8k) forklift".to_string()));
        for stale in ["Lowboy with 4-axel tractor", "Forklift (15k) forklift"] {
            assert!(!result.equipment_list.contains(&stale.to_string()), "{stale} survived");
        }
    }

    #[test]
    fn storage_costs_flow_into_the_result() {
        let outdoor = QuoteRequest {
            storage_type: StorageType::Outdoor,
            storage_square_footage: "100".to_string(),
            ..QuoteRequest::default()
        };
        let result = normalize_and_render(&outdoor);
        assert_eq!(result.storage_monthly_cost, Decimal::new(25_000, 2));
        assert_eq!(result.storage_cost_display(), "250.00");
        assert!(result.rendered_text.contains("estimated $250.00 per month"));

        let indoor = QuoteRequest {
            storage_type: StorageType::Indoor,
            storage_square_footage: "abc".to_string(),
            ..QuoteRequest::default()
        };
        assert_eq!(normalize_and_render(&indoor).storage_monthly_cost, Decimal::ZERO);
    }

    #[test]
    fn oversized_storage_footage_renders_without_a_fee() {
        let request = QuoteRequest {
            work_description: "Relocate press".to_string(),
            storage_type: StorageType::Outdoor,
            storage_square_footage: "79228162514264337593543950335".to_string(),
            ..QuoteRequest::default()
        };
        let result = normalize_and_render(&request);

        assert_eq!(result.storage_monthly_cost, Decimal::ZERO);
        assert!(!result.rendered_text.contains("Storage fee"));
        assert!(result.rendered_text.contains("Relocate press\n\nWhen the job is complete"));
    }

    #[test]
    fn merged_fields_feed_the_engine() {
        let extracted: ExtractedFields = [
            ("companyName".to_string(), String::new()),
            ("siteAddress".to_string(), "123 Main St".to_string()),
        ]
        .into_iter()
        .collect();
        let request = QuoteRequest { company_name: "Acme".to_string(), ..QuoteRequest::default() };

        let merged = merge_extracted_fields(&request, &extracted);
        assert_eq!(merged.company_name, "Acme");
        assert_eq!(merged.site_address, "123 Main St");

        let text = normalize_and_render(&merged).rendered_text;
        assert!(text.contains("123 Main St"));
        assert!(text.contains("Company: Acme\n"));
    }

    #[test]
    fn five_k_crew_of_three_lists_forklift_and_rolldeck() {
        let request = QuoteRequest {
            crew_size: 3,
            forklift_size: ForkliftSize::Forklift5k,
            ..QuoteRequest::default()
        };
        let result = normalize_and_render(&request);

        assert!(result.equipment_list.contains(&"Forklift (5k) forklift".to_string()));
        assert!(result.equipment_list.contains(&"and a Rolldeck".to_string()));
        assert!(result.rendered_text.contains("3-man crew"));
    }

    #[test]
    fn settings_change_business_name_gear_line_and_policy() {
        let settings = QuoteSettings {
            business_name: "Northwest Rigging".to_string(),
            default_signer: "Sam Ortiz".to_string(),
            gear_line: GearLine::GearTruck,
            normalization: NormalizationPolicy::PreserveUserChoice,
            rolldeck_phrase: false,
            template_path: None,
        };
        let engine = QuoteEngine::from_settings(settings).expect("engine");

        let mut request = engine.new_request();
        assert_eq!(request.your_name, "Sam Ortiz");
        request.forklift_size = ForkliftSize::Forklift5k;
        request.trailer_type = TrailerType::Dovetail;

        let result = engine.normalize_and_render(&request);
        assert_eq!(result.normalized_request.trailer_type, TrailerType::Dovetail);
        assert_eq!(result.equipment_list[0], "Gear truck");
        assert!(result.rendered_text.contains("Northwest Rigging to supply a 3-man crew"));
        assert!(result.rendered_text.ends_with("Sam Ortiz\nNorthwest Rigging"));
    }

    #[test]
    fn broken_custom_template_fails_at_construction() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{{{{ missing_variable }}}}").expect("write template");

        let settings =
            QuoteSettings { template_path: Some(file.path().to_path_buf()), ..QuoteSettings::default() };
        let error = QuoteEngine::from_settings(settings).err().expect("trial render should fail");
        assert!(matches!(error, ApplicationError::Template(_)));
    }

    #[test]
    fn failing_custom_template_falls_back_to_builtin() {
        // Renders during the trial render (no storage), fails once storage shows up.
        let renderer =
            QuoteRenderer::from_template_str("{% if storage %}{{ storage.nope }}{% endif %}ok")
                .expect("template parses");
        let engine = QuoteEngine::new(
            crate::engine::normalizer::RuleBasedNormalizer::default(),
            renderer,
            QuoteSettings::default(),
        );
        let runtime: &dyn QuoteRuntime = &engine;

        assert_eq!(runtime.normalize_and_render(&QuoteRequest::default()).rendered_text, "ok");

        let request = QuoteRequest {
            storage_type: StorageType::Outdoor,
            storage_square_footage: "10".to_string(),
            ..QuoteRequest::default()
        };
        let text = runtime.normalize_and_render(&request).rendered_text;
        assert!(text.starts_with("Hello [Site Contact Name],"));
    }
}
