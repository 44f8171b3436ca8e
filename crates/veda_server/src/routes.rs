//! HTTP handlers: unary chat, SSE chat stream, question generation, health.

use std::convert::Infallible;

use axum::extract::State;
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::info;

use veda_core::{ChatEvent, Question, QuestionSource, UserProfile};
use veda_runtime::{RuntimeError, TurnOutcome, TurnRequest};
use veda_sandbox::{Binding, Sandbox, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/chat/stream", post(chat_stream))
        .route("/api/v1/question/generate", post(question_generate))
        .route("/api/v1/health", get(health))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_profile: Option<ProfileBody>,
    #[serde(default)]
    pub force_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileBody {
    #[serde(default)]
    pub language_preference: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponseBody {
    pub session_id: String,
    pub response: String,
    pub agent_name: String,
    pub agent_label: String,
    pub agent_emoji: String,
    pub agent_color: String,
    // debug-only diagnostics; omitted entirely in non-debug deployments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

fn turn_request(body: ChatRequestBody) -> TurnRequest {
    let mut request = TurnRequest::new(body.message);
    if let Some(session_id) = body.session_id {
        request = request.with_session(session_id);
    }
    if let Some(profile) = body.user_profile {
        let mut user_profile = UserProfile::new();
        user_profile.language_preference = profile.language_preference;
        user_profile.channel = profile.channel;
        request = request.with_profile(user_profile);
    }
    if let Some(force_agent) = body.force_agent {
        request = request.with_force_agent(force_agent);
    }
    request
}

fn chat_response(state: &AppState, outcome: TurnOutcome) -> ChatResponseBody {
    let persona = veda_constant::persona::by_name(outcome.agent.as_str())
        .unwrap_or(veda_constant::persona::TEACH);

    let mut body = ChatResponseBody {
        session_id: outcome.session_id.to_string(),
        response: outcome.reply.text,
        agent_name: persona.name.to_string(),
        agent_label: persona.label.to_string(),
        agent_emoji: persona.emoji.to_string(),
        agent_color: persona.color.to_string(),
        route_reason: None,
        route_confidence: None,
        runtime_mode: None,
        payload: None,
    };

    if state.debug {
        body.route_reason = Some(outcome.route.reason);
        body.route_confidence = Some(outcome.route.confidence);
        body.runtime_mode = Some("debug".to_string());
        if let Some(question) = outcome.reply.question {
            body.payload = Some(serde_json::json!({ "question": question }));
        }
    }

    body
}

async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Json<ChatResponseBody>, ApiError> {
    rate_limit(&state, body.session_id.as_deref())?;

    let outcome = state
        .runner
        .run_turn(turn_request(body))
        .await
        .map_err(|e| ApiError::from_runtime(e, state.debug))?;

    Ok(Json(chat_response(&state, outcome)))
}

async fn chat_stream(
    State(state): State<AppState>,
    Json(body): Json<ChatRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    rate_limit(&state, body.session_id.as_deref())?;

    let cancel = CancellationToken::new();
    let rx = state.runner.stream_turn(turn_request(body), cancel.clone());

    // dropping the response stream (client disconnect) cancels the turn
    let guard = cancel.drop_guard();
    let stream: std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>> =
        Box::pin(ReceiverStream::new(rx).map(move |event| {
            let _keep_alive = &guard;
            Ok(to_sse_event(&event))
        }));

    let sse = Sse::new(stream).keep_alive(KeepAlive::default());
    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        sse,
    ))
}

/// Event payloads carry no type tag; the SSE event name is the type.
fn to_sse_event(event: &ChatEvent) -> Event {
    let data = match event {
        ChatEvent::Meta {
            session_id,
            agent_name,
            agent_label,
            agent_emoji,
            agent_color,
        } => serde_json::json!({
            "session_id": session_id,
            "agent_name": agent_name,
            "agent_label": agent_label,
            "agent_emoji": agent_emoji,
            "agent_color": agent_color,
        }),
        ChatEvent::Token { text } => serde_json::json!({ "text": text }),
        ChatEvent::Done => serde_json::json!({}),
        ChatEvent::Error { text } => serde_json::json!({ "text": text }),
    };
    Event::default()
        .event(event.event_name())
        .data(data.to_string())
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequestBody {
    pub concept: String,
    #[serde(default = "default_marks")]
    pub marks: u32,
    #[serde(default = "default_difficulty")]
    pub difficulty: f64,
    #[serde(default)]
    pub force_source: Option<String>,
}

fn default_marks() -> u32 {
    2
}

fn default_difficulty() -> f64 {
    0.5
}

async fn question_generate(
    State(state): State<AppState>,
    Json(body): Json<QuestionRequestBody>,
) -> Result<Json<Question>, ApiError> {
    let force_source = match &body.force_source {
        None => None,
        Some(raw) => Some(raw.parse::<QuestionSource>().map_err(|_| {
            ApiError::bad_request(format!(
                "unknown force_source {:?} (expected \"pattern\" or \"ai\")",
                raw
            ))
        })?),
    };

    let question = state
        .orchestrator
        .generate(
            &body.concept,
            body.marks,
            body.difficulty.clamp(0.0, 1.0),
            force_source,
            None,
        )
        .await
        .map_err(|e| match e {
            veda_engine::EngineError::UnknownConcept(_)
            | veda_engine::EngineError::UnknownPattern(_) => ApiError::bad_request(e.to_string()),
            other => ApiError::internal(state.debug, other),
        })?;

    Ok(Json(question))
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub components: HealthComponents,
}

#[derive(Debug, Serialize)]
pub struct HealthComponents {
    pub llm: bool,
    pub sandbox: bool,
    pub patterns: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    let sandbox_ok = Sandbox::new()
        .eval_expression("1 + 1", &Binding::new())
        .map(|v| v == Value::Int(2))
        .unwrap_or(false);
    let patterns_ok = !state.catalog.is_empty();

    let components = HealthComponents {
        llm: state.llm_configured,
        sandbox: sandbox_ok,
        patterns: patterns_ok,
    };
    let status = if components.llm && components.sandbox && components.patterns {
        "healthy"
    } else {
        "degraded"
    };

    info!(status, "health check");
    Json(HealthBody { status, components })
}

fn rate_limit(state: &AppState, session_id: Option<&str>) -> Result<(), ApiError> {
    let key = session_id.unwrap_or("anonymous");
    state.limiter.check(key).map_err(|retry_after_secs| {
        ApiError::from_runtime(
            RuntimeError::RateLimited { retry_after_secs },
            state.debug,
        )
    })
}
