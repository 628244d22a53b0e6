use std::any::Any;
use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use gie_core::ServiceRecord;
use gie_ml::CompletionBackend;
use gie_observability::{AppMetrics, MetricsSnapshot};
use gie_pipeline::{ClassificationPipeline, EngineConfig};
use serde::Serialize;
use serde_json::Value;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

const MAX_BODY_BYTES: usize = 16 * 1024;

pub struct ApiState<B> {
    pub pipeline: Arc<ClassificationPipeline<B>>,
    pub allowed_origins: Arc<Vec<String>>,
}

impl<B> Clone for ApiState<B> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            allowed_origins: self.allowed_origins.clone(),
        }
    }
}

impl<B> ApiState<B> {
    pub fn new(pipeline: ClassificationPipeline<B>, allowed_origins: Vec<String>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            allowed_origins: Arc::new(allowed_origins),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    primary_classifier: bool,
    metrics: MetricsSnapshot,
}

#[derive(Debug, Serialize)]
struct IntentSummary {
    id: String,
    label: String,
}

#[derive(Debug, Serialize)]
struct CatalogResponse {
    intents: Vec<IntentSummary>,
    services: BTreeMap<String, Vec<ServiceRecord>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    error: &'static str,
    message: &'static str,
    code: u16,
}

pub fn build_app(config: &EngineConfig, allowed_origins: Vec<String>) -> Result<Router> {
    let metrics = AppMetrics::shared();
    let pipeline = ClassificationPipeline::from_config(config, metrics)?;
    Ok(build_router(ApiState::new(pipeline, allowed_origins)))
}

pub fn build_router<B>(state: ApiState<B>) -> Router
where
    B: CompletionBackend + 'static,
{
    Router::new()
        .route("/api/health", get(health::<B>))
        .route("/api/gie", post(classify::<B>))
        .route("/api/catalog", get(catalog::<B>))
        .fallback(not_found)
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

async fn health<B>(State(state): State<ApiState<B>>) -> impl IntoResponse
where
    B: CompletionBackend + 'static,
{
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        primary_classifier: state.pipeline.primary_available(),
        metrics: state.pipeline.metrics().snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

/// Every pipeline outcome, `invalid` included, is a 200; callers branch on
/// `mode`. A body that is not JSON or has no string `text` counts as empty
/// text.
async fn classify<B>(State(state): State<ApiState<B>>, body: Bytes) -> impl IntoResponse
where
    B: CompletionBackend + 'static,
{
    let request = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    let text = request
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let segment = request.get("segment").and_then(Value::as_str);

    let result = state.pipeline.classify(segment, text).await;
    (StatusCode::OK, Json(result))
}

async fn catalog<B>(State(state): State<ApiState<B>>) -> impl IntoResponse
where
    B: CompletionBackend + 'static,
{
    let catalog = state.pipeline.catalog();
    let payload = CatalogResponse {
        intents: catalog
            .intents()
            .iter()
            .map(|intent| IntentSummary {
                id: intent.id.clone(),
                label: intent.label.clone(),
            })
            .collect(),
        services: catalog.services().clone(),
    };
    (StatusCode::OK, Json(payload))
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "not_found", "Resource not found")
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!(panic = %detail, "request handler panicked");

    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_server_error",
        "Unexpected server error",
    )
}

fn error_response(code: StatusCode, error: &'static str, message: &'static str) -> Response {
    (
        code,
        Json(ErrorBody {
            status: "error",
            error,
            message,
            code: code.as_u16(),
        }),
    )
        .into_response()
}

/// An empty list allows any origin; otherwise only the listed ones.
fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn parse_allowed_origins() -> Vec<String> {
    env::var("GIE_ALLOWED_ORIGINS")
        .ok()
        .map(|value| split_origins(&value))
        .unwrap_or_default()
}

fn split_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty() && origin != "*")
        .collect()
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    #[test]
    fn origins_are_trimmed_and_wildcard_means_any() {
        assert_eq!(
            split_origins(" http://localhost:5500/ ,https://example.sa,, "),
            vec!["http://localhost:5500", "https://example.sa"]
        );
        assert!(split_origins("*").is_empty());
    }

    #[tokio::test]
    async fn panic_maps_to_generic_error_body() {
        let response = handle_panic(Box::new("index out of bounds".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "error");
        assert_eq!(parsed["error"], "internal_server_error");
        assert_eq!(parsed["message"], "Unexpected server error");
        assert_eq!(parsed["code"], 500);
        assert!(!body.windows(5).any(|w| w == b"index"));
    }
}
