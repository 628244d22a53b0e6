use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use gie_api::{build_app, build_router, ApiState};
use gie_core::Catalog;
use gie_ml::CannedBackend;
use gie_observability::AppMetrics;
use gie_pipeline::{ClassificationPipeline, EngineConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

fn offline_app() -> Router {
    build_app(&EngineConfig::default(), Vec::new()).expect("app should build")
}

fn app_with_reply(reply: &str) -> Router {
    let pipeline = ClassificationPipeline::new(
        Arc::new(Catalog::builtin()),
        Some(CannedBackend::reply(reply)),
        AppMetrics::shared(),
    );
    build_router(ApiState::new(pipeline, Vec::new()))
}

fn gie_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/gie")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let response = offline_app()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());

    let parsed = json_body(response).await;
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["primary_classifier"], false);
    assert_eq!(parsed["metrics"]["requests_total"], 0);
}

#[tokio::test]
async fn passport_renewal_falls_back_to_keywords() {
    let body = json!({ "text": "أبغى أجدد جوازي" }).to_string();
    let response = offline_app().oneshot(gie_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["mode"], "fallback");
    assert_eq!(parsed["segment"], "individual");
    assert_eq!(parsed["detected_intent"], "personal_docs");
    assert!(!parsed["fallback_reason"].as_str().unwrap().is_empty());

    let services = parsed["services"].as_array().unwrap();
    assert!(services.iter().any(|s| s["id"] == "renew_passport"));
    assert_eq!(services[0]["action"]["type"], "navigate");

    let titles = services
        .iter()
        .map(|s| s["title"].clone())
        .collect::<Vec<_>>();
    assert_eq!(parsed["service_bundle"].as_array().unwrap(), &titles);
}

#[tokio::test]
async fn english_text_is_invalid_but_ok() {
    let body = json!({ "text": "hello" }).to_string();
    let response = offline_app().oneshot(gie_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["mode"], "invalid");
    assert_eq!(parsed["detected_intent"], Value::Null);
    assert_eq!(parsed["top_intents"], json!([]));
    assert_eq!(parsed["services"], json!([]));
    assert!(parsed.get("fallback_reason").is_none());
}

#[tokio::test]
async fn unreadable_bodies_count_as_empty_text() {
    for body in ["not json", "{\"text\": 42}", "[]", ""] {
        let response = offline_app().oneshot(gie_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{body}");

        let parsed = json_body(response).await;
        assert_eq!(parsed["mode"], "invalid");
        assert_eq!(parsed["input_text"], "");
    }
}

#[tokio::test]
async fn primary_classifier_result_is_returned() {
    let app = app_with_reply(
        r#"```json
{"top_intents": [
  {"id": "fraud_report", "confidence": 0.93, "reason": "بلاغ احتيال"},
  {"id": "hacking", "confidence": 0.8}
]}
```"#,
    );
    let body = json!({ "text": "كيف ارفع بلاغ عن احتيال", "segment": "business" }).to_string();
    let response = app.oneshot(gie_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["mode"], "primary");
    assert_eq!(parsed["segment"], "individual");
    assert_eq!(parsed["detected_intent"], "fraud_report");
    assert_eq!(parsed["top_intents"].as_array().unwrap().len(), 1);
    assert_eq!(parsed["top_intents"][0]["label"], "البلاغات والاحتيال");
    assert_eq!(parsed["service_bundle"], json!(["رفع بلاغ احتيال"]));
}

#[tokio::test]
async fn health_counts_classified_requests() {
    let app = offline_app();

    let body = json!({ "text": "ودي اسافر بكرة" }).to_string();
    let response = app.clone().oneshot(gie_request(body)).await.unwrap();
    let parsed = json_body(response).await;
    assert_eq!(parsed["mode"], "fallback");
    assert_eq!(parsed["detected_intent"], "travel");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let health = json_body(response).await;
    assert_eq!(health["metrics"]["requests_total"], 1);
    assert_eq!(health["metrics"]["fallback_total"], 1);
}

#[tokio::test]
async fn catalog_lists_intents_in_order() {
    let response = offline_app()
        .oneshot(
            Request::builder()
                .uri("/api/catalog")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    let intents = parsed["intents"].as_array().unwrap();
    assert_eq!(intents.len(), 7);
    assert_eq!(intents[0]["id"], "travel");
    assert_eq!(parsed["services"]["personal_docs"][1]["id"], "renew_passport");
}

#[tokio::test]
async fn unknown_route_returns_json_error() {
    let response = offline_app()
        .oneshot(
            Request::builder()
                .uri("/api/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let parsed = json_body(response).await;
    assert_eq!(parsed["status"], "error");
    assert_eq!(parsed["code"], 404);
}

#[tokio::test]
async fn cors_preflight_allows_any_origin_by_default() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/gie")
        .header("origin", "http://127.0.0.1:5500")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();

    let response = offline_app().oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );
}
