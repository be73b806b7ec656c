pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;

pub use domain::equipment::{
    EquipmentConfiguration, ForkliftSize, StorageType, TractorType, TrailerType, YardLocation,
};
pub use domain::request::{parse_crew_size, QuoteField, QuoteRequest, DEFAULT_CREW_SIZE};
pub use domain::result::QuoteResult;
pub use engine::equipment_list::{equipment_items, format_equipment_list, GearLine};
pub use engine::merge::{merge_extracted_fields, merge_with_outcome, ExtractedFields, MergeOutcome};
pub use engine::normalizer::{
    normalize_equipment, EquipmentNormalizer, NormalizationPolicy, RuleBasedNormalizer,
};
pub use engine::renderer::{QuoteRenderer, RenderError};
pub use engine::storage::{storage_cost, StorageCost};
pub use engine::{normalize_and_render, QuoteEngine, QuoteRuntime, QuoteSettings};
pub use errors::{ApplicationError, DomainError, InterfaceError};
