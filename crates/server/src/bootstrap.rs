use rigquote_agent::{ExtractionError, ExtractionService};
use rigquote_core::config::AppConfig;
use rigquote_core::{ApplicationError, QuoteEngine};
use thiserror::Error;
use tracing::info;

use crate::api::AppState;

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("quote template could not be loaded: {0}")]
    Template(#[source] ApplicationError),
    #[error("extraction service could not be built: {0}")]
    Extraction(#[source] ExtractionError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let engine = QuoteEngine::from_settings(config.quote.clone()).map_err(BootstrapError::Template)?;
    info!(
        event_name = "system.bootstrap.template_loaded",
        correlation_id = "bootstrap",
        custom_template = engine.uses_custom_template(),
        "quote template loaded"
    );

    let extraction = ExtractionService::from_config(&config).map_err(BootstrapError::Extraction)?;
    info!(
        event_name = "system.bootstrap.extraction_ready",
        correlation_id = "bootstrap",
        extractor = extraction.extractor_name(),
        "extraction service ready"
    );

    Ok(Application { state: AppState::new(engine, extraction), config })
}

#[cfg(test)]
mod tests {
    use rigquote_core::config::{AppConfig, ExtractionMode};

    use super::{bootstrap_with_config, BootstrapError};

    #[test]
    fn default_config_boots_with_rules_extraction() {
        let mut config = AppConfig::default();
        config.extraction.mode = ExtractionMode::Rules;

        let app = bootstrap_with_config(config).expect("bootstrap");
        assert_eq!(app.state.extraction.extractor_name(), "rules");
        assert!(!app.state.engine.uses_custom_template());
    }

    #[test]
    fn llm_mode_without_key_fails_to_boot() {
        let mut config = AppConfig::default();
        config.extraction.mode = ExtractionMode::Llm;
        config.llm.api_key = None;

        let error = bootstrap_with_config(config).err().expect("bootstrap should fail");
        assert!(matches!(error, BootstrapError::Extraction(_)));
    }
}
