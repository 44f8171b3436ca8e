//! veda-server — the HTTP surface over the tutoring runtime.
//!
//! Everything is constructed explicitly at startup (`build_app`) and
//! injected into the router; tests build their own instances with stub
//! providers.

pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use veda_core::{MessageSink, SqliteSink};
use veda_engine::{
    GenerativeEngine, HybridOrchestrator, PatternCatalog, PatternEngine, SourcePreferences,
};
use veda_llms::Provider;
use veda_runtime::{RuntimeConfig, TurnRunner};
use veda_toolbus::ToolBus;

pub use error::ApiError;
pub use rate_limit::SessionRateLimiter;
pub use routes::build_router;
pub use state::AppState;

/// Wire the engines, tool bus, and runner around a provider, and return the
/// ready-to-serve router.
pub fn build_app(provider: Arc<dyn Provider>, config: RuntimeConfig) -> anyhow::Result<Router> {
    let state = build_state(provider, config.clone())?;
    let cors = cors_layer(&config)?;

    Ok(build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// The dependency graph behind the handlers, also used directly by tests.
pub fn build_state(provider: Arc<dyn Provider>, config: RuntimeConfig) -> anyhow::Result<AppState> {
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let catalog = match &config.catalog_path {
        Some(path) => PatternCatalog::from_path(path)
            .with_context(|| format!("load pattern catalog from {}", path.display()))?,
        None => PatternCatalog::builtin().context("load builtin pattern catalog")?,
    };
    let catalog = Arc::new(catalog);

    let pattern = Arc::new(PatternEngine::new(Arc::clone(&catalog)));
    let generative = Arc::new(
        GenerativeEngine::new(Arc::clone(&provider), config.model.as_str())
            .with_fallback(Arc::clone(&pattern))
            .with_llm_timeout(config.llm_timeout),
    );

    let preferences = match &config.preferences_path {
        Some(path) => SourcePreferences::from_path(path)
            .with_context(|| format!("load source preferences from {}", path.display()))?,
        None => SourcePreferences::builtin(),
    };

    let orchestrator = Arc::new(
        HybridOrchestrator::new(pattern, generative)
            .with_preferences(preferences)
            .with_ai_ratio(config.ai_ratio),
    );

    let toolbus = Arc::new(ToolBus::new(
        Arc::clone(&orchestrator),
        Arc::clone(&provider),
        config.model.as_str(),
    ));

    let mut runner = TurnRunner::new(Arc::clone(&provider), toolbus, config.clone());
    if let Some(path) = &config.sink_path {
        let sink = SqliteSink::open(path)
            .with_context(|| format!("open message sink at {}", path.display()))?;
        runner = runner.with_sink(Arc::new(sink) as Arc<dyn MessageSink>);
    }

    let limiter = Arc::new(SessionRateLimiter::new(
        config.rate_limit_max_requests,
        config.rate_limit_window_seconds,
    ));

    Ok(AppState {
        runner: Arc::new(runner),
        orchestrator,
        catalog,
        limiter,
        llm_configured: true,
        debug: config.debug,
    })
}

fn cors_layer(config: &RuntimeConfig) -> anyhow::Result<CorsLayer> {
    if config.cors_origins.is_empty() {
        return Ok(CorsLayer::new());
    }
    if config.cors_origins.iter().any(|o| o == "*") {
        // validate() has already rejected this outside debug
        return Ok(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid CORS origin {:?}", origin))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}
