use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::api::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub quote_template: HealthCheck,
    pub extraction: HealthCheck,
    pub checked_at: String,
}

/// Everything the server depends on is resolved at bootstrap, so a running
/// process is always ready; the payload reports what it is running with.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let template = if state.engine.uses_custom_template() { "custom" } else { "builtin" };

    Json(HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "rigquote-server runtime initialized".to_string(),
        },
        quote_template: HealthCheck { status: "ready", detail: format!("{template} template") },
        extraction: HealthCheck {
            status: "ready",
            detail: format!("{} extractor", state.extraction.extractor_name()),
        },
        checked_at: Utc::now().to_rfc3339(),
    })
}
