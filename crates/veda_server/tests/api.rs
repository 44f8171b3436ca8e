//! HTTP surface tests against an in-process router with a stub provider.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use tower::util::ServiceExt;

use veda_llms::{
    FinishReason, GenerateRequest, GenerateResponse, GenerateStream, Provider,
    Result as LlmResult, StreamEvent, Usage,
};
use veda_runtime::RuntimeConfig;
use veda_server::{build_router, build_state};

struct StubProvider;

#[async_trait]
impl Provider for StubProvider {
    fn provider_id(&self) -> &str {
        "stub"
    }

    async fn generate(&self, request: GenerateRequest) -> LlmResult<GenerateResponse> {
        let system = request
            .messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or("");
        if system.contains("route a student's message") {
            return Ok(GenerateResponse::text_only(
                r#"{"target": "teach", "reason": "general", "confidence": 0.9}"#,
            ));
        }
        Ok(GenerateResponse::text_only("Let's work through it together."))
    }

    async fn stream(&self, _request: GenerateRequest) -> LlmResult<GenerateStream> {
        let events = vec![
            Ok(StreamEvent::start("s1")),
            Ok(StreamEvent::text_delta("Let's work through it together.")),
            Ok(StreamEvent::finish(Usage::default(), FinishReason::Stop)),
        ];
        Ok(GenerateStream::new(Box::pin(futures::stream::iter(events))))
    }
}

fn app(config: RuntimeConfig) -> axum::Router {
    let state = build_state(Arc::new(StubProvider), config).unwrap();
    build_router(state)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn chat_returns_persona_fields() {
    let app = app(RuntimeConfig::new());
    let response = app
        .oneshot(post_json(
            "/api/v1/chat",
            serde_json::json!({"message": "hello", "session_id": "s1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["session_id"], "s1");
    assert_eq!(body["agent_name"], "teach");
    assert_eq!(body["agent_label"], "Veda");
    assert!(!body["response"].as_str().unwrap().is_empty());
    // debug fields absent outside debug mode
    assert!(body.get("route_reason").is_none());
    assert!(body.get("route_confidence").is_none());
    assert!(body.get("payload").is_none());
}

#[tokio::test]
async fn chat_debug_mode_carries_diagnostics() {
    let app = app(RuntimeConfig::new().with_debug(true));
    let response = app
        .oneshot(post_json(
            "/api/v1/chat",
            serde_json::json!({"message": "hello", "session_id": "s1"}),
        ))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert!(body["route_reason"].is_string());
    assert!(body["route_confidence"].is_number());
    assert_eq!(body["runtime_mode"], "debug");
}

#[tokio::test]
async fn empty_message_is_400() {
    let app = app(RuntimeConfig::new());
    let response = app
        .oneshot(post_json(
            "/api/v1/chat",
            serde_json::json!({"message": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn question_generate_pattern_quadratic() {
    let app = app(RuntimeConfig::new());
    let response = app
        .oneshot(post_json(
            "/api/v1/question/generate",
            serde_json::json!({
                "concept": "quadratic_nature_of_roots",
                "marks": 2,
                "difficulty": 0.4,
                "force_source": "pattern"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["source"], "pattern");
    assert_eq!(body["concept"], "quadratic_nature_of_roots");
    assert!(body["final_answer"].as_str().unwrap().contains("real and distinct"));
    assert!(body["solution_steps"].as_array().unwrap().len() >= 2);
}

#[tokio::test]
async fn question_generate_unknown_source_is_400() {
    let app = app(RuntimeConfig::new());
    let response = app
        .oneshot(post_json(
            "/api/v1/question/generate",
            serde_json::json!({"concept": "polynomials", "force_source": "oracle"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn question_generate_unknown_concept_is_400() {
    let app = app(RuntimeConfig::new());
    let response = app
        .oneshot(post_json(
            "/api/v1/question/generate",
            serde_json::json!({"concept": "astrology", "force_source": "pattern"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_components() {
    let app = app(RuntimeConfig::new());
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["llm"], true);
    assert_eq!(body["components"]["sandbox"], true);
    assert_eq!(body["components"]["patterns"], true);
}

#[tokio::test]
async fn rate_limit_returns_429_with_retry_after() {
    let mut config = RuntimeConfig::new();
    config.rate_limit_max_requests = 2;
    config.rate_limit_window_seconds = 60;
    let app = app(config);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/chat",
                serde_json::json!({"message": "hello", "session_id": "rl"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(post_json(
            "/api/v1/chat",
            serde_json::json!({"message": "hello", "session_id": "rl"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn stream_emits_meta_tokens_done() {
    let app = app(RuntimeConfig::new());
    let response = app
        .oneshot(post_json(
            "/api/v1/chat/stream",
            serde_json::json!({"message": "hello", "session_id": "sse1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-cache"
    );
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("event: meta"));
    assert!(text.contains("\"agent_name\":\"teach\""));
    assert!(text.contains("event: token"));
    assert!(text.contains("event: done"));

    let meta_pos = text.find("event: meta").unwrap();
    let done_pos = text.rfind("event: done").unwrap();
    assert!(meta_pos < done_pos);
}

#[tokio::test]
async fn wildcard_cors_rejected_outside_debug() {
    let mut config = RuntimeConfig::new();
    config.cors_origins = vec!["*".to_string()];
    assert!(build_state(Arc::new(StubProvider), config).is_err());
}
