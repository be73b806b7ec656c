use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rigquote_agent::{ExtractionOutcome, ExtractionService};
use rigquote_core::{ApplicationError, InterfaceError, QuoteEngine, QuoteRequest, QuoteResult};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::health;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QuoteEngine>,
    pub extraction: ExtractionService,
}

impl AppState {
    pub fn new(engine: QuoteEngine, extraction: ExtractionService) -> Self {
        Self { engine: Arc::new(engine), extraction }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractRequest {
    pub text: String,
    pub request: Option<QuoteRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    #[serde(flatten)]
    pub outcome: ExtractionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<QuoteRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub correlation_id: String,
}

/// `InterfaceError` as an HTTP response. Bad requests echo the detail; other
/// failures only carry the generic user message.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self.0 {
            InterfaceError::BadRequest { message, .. } => {
                (StatusCode::BAD_REQUEST, "bad_request", message.clone())
            }
            InterfaceError::ServiceUnavailable { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                self.0.user_message().to_string(),
            ),
            InterfaceError::Internal { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                self.0.user_message().to_string(),
            ),
        };

        let body = ErrorBody {
            error: kind,
            message,
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/quote", post(render_quote))
        .route("/api/extract", post(extract_fields))
        .with_state(state)
}

/// A body axum could not decode, reported in the same shape as every other error.
fn rejected_body(route: &'static str, rejection: JsonRejection) -> ApiError {
    let correlation_id = Uuid::new_v4().to_string();
    let message = rejection.body_text();
    warn!(
        event_name = "api.request.rejected_body",
        correlation_id = %correlation_id,
        route,
        reason = %message,
        "request body could not be decoded"
    );
    ApiError(InterfaceError::BadRequest { message, correlation_id })
}

pub async fn render_quote(
    State(state): State<AppState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<QuoteResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| rejected_body("/api/quote", rejection))?;
    let result = state.engine.normalize_and_render(&request);
    info!(
        event_name = "api.quote.rendered",
        equipment_items = result.equipment_list.len(),
        "quote rendered"
    );
    Ok(Json(result))
}

pub async fn extract_fields(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let Json(body) = payload.map_err(|rejection| rejected_body("/api/extract", rejection))?;
    let correlation_id = Uuid::new_v4().to_string();

    let response = match body.request {
        Some(request) => state
            .extraction
            .extract_and_merge(&body.text, &request)
            .await
            .map(|(outcome, merged)| ExtractResponse { outcome, request: Some(merged.request) }),
        None => state
            .extraction
            .extract(&body.text)
            .await
            .map(|outcome| ExtractResponse { outcome, request: None }),
    };

    match response {
        Ok(response) => {
            info!(
                event_name = "api.extract.completed",
                correlation_id = %correlation_id,
                extractor = response.outcome.extractor,
                field_count = response.outcome.fields.len(),
                "extraction request completed"
            );
            Ok(Json(response))
        }
        Err(extraction_error) => {
            let interface = ApplicationError::from(extraction_error).into_interface(&correlation_id);
            match &interface {
                InterfaceError::BadRequest { message, .. } => warn!(
                    event_name = "api.extract.rejected",
                    correlation_id = %correlation_id,
                    reason = %message,
                    "extraction request rejected"
                ),
                other => error!(
                    event_name = "api.extract.failed",
                    correlation_id = %correlation_id,
                    error = %other,
                    "extraction request failed"
                ),
            }
            Err(ApiError(interface))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use rigquote_agent::{ExtractionError, ExtractionService, FieldExtractor, RuleBasedExtractor};
    use rigquote_core::{ExtractedFields, QuoteEngine};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, AppState};

    struct UnavailableExtractor;

    #[async_trait]
    impl FieldExtractor for UnavailableExtractor {
        fn name(&self) -> &'static str {
            "llm"
        }

        async fn extract(&self, _text: &str) -> Result<ExtractedFields, ExtractionError> {
            Err(ExtractionError::Status { status: 503, body: "overloaded".to_string() })
        }
    }

    fn app_with(extractor: Arc<dyn FieldExtractor>) -> Router {
        let extraction = ExtractionService::with_extractor(extractor, 20_000);
        router(AppState::new(QuoteEngine::default(), extraction))
    }

    fn app() -> Router {
        app_with(Arc::new(RuleBasedExtractor::new()))
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn quote_endpoint_normalizes_and_renders() {
        let (status, payload) = post_json(
            app(),
            "/api/quote",
            json!({ "forkliftSize": "Versalift 60/80", "siteContactName": "Dana Ruiz" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["normalizedRequest"]["trailerType"], "Stepdeck");
        assert_eq!(payload["normalizedRequest"]["tractorType"], "4-axel");
        assert_eq!(payload["equipmentList"][1], "Stepdeck with 4-axel tractor");
        assert!(payload["renderedText"]
            .as_str()
            .is_some_and(|text| text.starts_with("Hello Dana Ruiz,")));
    }

    #[tokio::test]
    async fn malformed_quote_body_gets_the_error_shape() {
        let (status, payload) = post_json(app(), "/api/quote", json!({ "crewSize": "lots" })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["error"], "bad_request");
        assert!(payload["message"].as_str().is_some_and(|message| message.contains("crewSize")));
        assert!(payload["correlationId"].as_str().is_some_and(|id| id.len() == 36));
    }

    #[tokio::test]
    async fn unparsable_body_is_a_bad_request_on_both_routes() {
        for uri in ["/api/quote", "/api/extract"] {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"projectTitle\": "))
                .expect("request");

            let response = app().oneshot(request).await.expect("response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
            let payload: Value = serde_json::from_slice(&bytes).expect("json error body");
            assert_eq!(payload["error"], "bad_request", "{uri}");
        }
    }

    #[tokio::test]
    async fn extract_endpoint_returns_fields_and_message() {
        let (status, payload) = post_json(
            app(),
            "/api/extract",
            json!({ "text": "Project: Mill move\nCompany: Acme Fabrication" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["extractedInfo"]["projectTitle"], "Mill move");
        assert_eq!(payload["extractedInfo"]["companyName"], "Acme Fabrication");
        assert_eq!(
            payload["message"],
            "Great! I extracted information for: companyName, projectTitle. The form has been updated with the extracted data."
        );
        assert!(payload.get("request").is_none());
    }

    #[tokio::test]
    async fn extract_endpoint_merges_supplied_request() {
        let (status, payload) = post_json(
            app(),
            "/api/extract",
            json!({
                "text": "Company: Acme Fabrication",
                "request": { "projectTitle": "Existing title", "crewSize": 5 }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["request"]["projectTitle"], "Existing title");
        assert_eq!(payload["request"]["companyName"], "Acme Fabrication");
        assert_eq!(payload["request"]["crewSize"], 5);
    }

    #[tokio::test]
    async fn blank_text_is_a_bad_request() {
        let (status, payload) = post_json(app(), "/api/extract", json!({ "text": "   " })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["error"], "bad_request");
        assert!(payload["message"]
            .as_str()
            .is_some_and(|message| message.contains("text input is required")));
        assert!(payload["correlationId"].as_str().is_some_and(|id| id.len() == 36));
    }

    #[tokio::test]
    async fn collaborator_failure_is_service_unavailable() {
        let (status, payload) = post_json(
            app_with(Arc::new(UnavailableExtractor)),
            "/api/extract",
            json!({ "text": "Project: Mill move" }),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload["error"], "service_unavailable");
        assert!(!payload["message"].as_str().unwrap_or_default().contains("overloaded"));
    }

    #[tokio::test]
    async fn health_reports_template_and_extractor() {
        let request = Request::builder().uri("/health").body(Body::empty()).expect("request");
        let response = app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(payload["status"], "ready");
        assert_eq!(payload["quote_template"]["detail"], "builtin template");
        assert_eq!(payload["extraction"]["detail"], "rules extractor");
    }
}
