//! Shared handler state, constructed once at startup and injected.

use std::sync::Arc;

use veda_engine::{HybridOrchestrator, PatternCatalog};
use veda_runtime::TurnRunner;

use crate::rate_limit::SessionRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<TurnRunner>,
    pub orchestrator: Arc<HybridOrchestrator>,
    pub catalog: Arc<PatternCatalog>,
    pub limiter: Arc<SessionRateLimiter>,
    /// Whether an LLM provider was configured at startup.
    pub llm_configured: bool,
    pub debug: bool,
}
