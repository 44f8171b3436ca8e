//! Runtime configuration, environment-driven with builder overrides.

use std::path::PathBuf;
use std::time::Duration;

use veda_constant::app;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Chat model used by agents, the supervisor fallback, and summarization.
    pub model: String,
    /// Share of question generation routed to the generative engine.
    pub ai_ratio: f64,
    /// Per-session rate limit: requests per window.
    pub rate_limit_max_requests: u32,
    /// Per-session rate limit: window length in seconds.
    pub rate_limit_window_seconds: u64,
    /// Allowed CORS origins; must not be `*` outside debug.
    pub cors_origins: Vec<String>,
    pub debug: bool,
    /// Per-LLM-call timeout.
    pub llm_timeout: Duration,
    /// Soft deadline for a whole turn.
    pub turn_deadline: Duration,
    /// How long a request waits for a busy session.
    pub session_wait: Duration,
    /// Retained messages per session.
    pub memory_window: usize,
    /// Messages kept verbatim when the window overflows.
    pub keep_verbatim: usize,
    /// Token budget for the rolling summary.
    pub summary_max_tokens: u32,
    /// Idle session lifetime.
    pub session_ttl: Duration,
    /// HTTP bind address.
    pub bind_addr: String,
    /// Optional template catalog override.
    pub catalog_path: Option<PathBuf>,
    /// Optional source-preference table override.
    pub preferences_path: Option<PathBuf>,
    /// Optional SQLite message sink.
    pub sink_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self {
            model: app::DEFAULT_MODEL.to_string(),
            ai_ratio: app::DEFAULT_AI_RATIO,
            rate_limit_max_requests: app::DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            rate_limit_window_seconds: app::DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
            cors_origins: Vec::new(),
            debug: false,
            llm_timeout: Duration::from_secs(app::DEFAULT_LLM_TIMEOUT_SECS),
            turn_deadline: Duration::from_secs(app::DEFAULT_TURN_DEADLINE_SECS),
            session_wait: Duration::from_secs(app::DEFAULT_SESSION_WAIT_SECS),
            memory_window: app::DEFAULT_MEMORY_WINDOW,
            keep_verbatim: app::DEFAULT_MEMORY_KEEP_VERBATIM,
            summary_max_tokens: app::DEFAULT_SUMMARY_MAX_TOKENS,
            session_ttl: Duration::from_secs(app::DEFAULT_SESSION_TTL_SECS),
            bind_addr: app::DEFAULT_BIND.to_string(),
            catalog_path: None,
            preferences_path: None,
            sink_path: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_ai_ratio(mut self, ai_ratio: f64) -> Self {
        self.ai_ratio = ai_ratio.clamp(0.0, 1.0);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub fn with_turn_deadline(mut self, deadline: Duration) -> Self {
        self.turn_deadline = deadline;
        self
    }

    pub fn with_session_wait(mut self, wait: Duration) -> Self {
        self.session_wait = wait;
        self
    }

    pub fn with_memory_window(mut self, window: usize) -> Self {
        self.memory_window = window;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Load configuration from `VEDA_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Ok(model) = std::env::var("VEDA_MODEL") {
            config.model = model;
        }
        if let Some(ratio) = env_parse::<f64>("VEDA_AI_RATIO") {
            config.ai_ratio = ratio.clamp(0.0, 1.0);
        }
        if let Some(max) = env_parse::<u32>("VEDA_RATE_LIMIT_MAX_REQUESTS") {
            config.rate_limit_max_requests = max;
        }
        if let Some(window) = env_parse::<u64>("VEDA_RATE_LIMIT_WINDOW_SECONDS") {
            config.rate_limit_window_seconds = window;
        }
        if let Ok(origins) = std::env::var("VEDA_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(debug) = std::env::var("VEDA_DEBUG") {
            config.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(secs) = env_parse::<u64>("VEDA_LLM_TIMEOUT_SECS") {
            config.llm_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("VEDA_TURN_DEADLINE_SECS") {
            config.turn_deadline = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("VEDA_SESSION_WAIT_SECS") {
            config.session_wait = Duration::from_secs(secs);
        }
        if let Some(window) = env_parse::<usize>("VEDA_MEMORY_WINDOW") {
            config.memory_window = window;
        }
        if let Some(secs) = env_parse::<u64>("VEDA_SESSION_TTL_SECS") {
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Ok(bind) = std::env::var("VEDA_BIND") {
            config.bind_addr = bind;
        }
        if let Ok(path) = std::env::var("VEDA_PATTERNS_PATH") {
            config.catalog_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("VEDA_SOURCE_PREFERENCES_PATH") {
            config.preferences_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("VEDA_SINK_PATH") {
            config.sink_path = Some(PathBuf::from(path));
        }

        config
    }

    /// `*` origins are only acceptable in debug deployments.
    pub fn validate(&self) -> Result<(), String> {
        if !self.debug && self.cors_origins.iter().any(|o| o == "*") {
            return Err("cors_origins must not be '*' outside debug".to_string());
        }
        if self.keep_verbatim >= self.memory_window {
            return Err("keep_verbatim must be smaller than memory_window".to_string());
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::new();
        assert_eq!(config.ai_ratio, 0.5);
        assert_eq!(config.rate_limit_max_requests, 30);
        assert_eq!(config.rate_limit_window_seconds, 60);
        assert_eq!(config.llm_timeout, Duration::from_secs(30));
        assert_eq!(config.turn_deadline, Duration::from_secs(60));
        assert_eq!(config.session_wait, Duration::from_secs(30));
        assert_eq!(config.memory_window, 40);
        assert_eq!(config.keep_verbatim, 20);
        assert!(!config.debug);
    }

    #[test]
    fn test_builder() {
        let config = RuntimeConfig::new()
            .with_model("gpt-4o")
            .with_ai_ratio(0.8)
            .with_debug(true)
            .with_memory_window(10);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.ai_ratio, 0.8);
        assert!(config.debug);
        assert_eq!(config.memory_window, 10);
    }

    #[test]
    fn test_ai_ratio_clamped() {
        assert_eq!(RuntimeConfig::new().with_ai_ratio(1.5).ai_ratio, 1.0);
        assert_eq!(RuntimeConfig::new().with_ai_ratio(-0.5).ai_ratio, 0.0);
    }

    #[test]
    fn test_validate_rejects_wildcard_cors_outside_debug() {
        let mut config = RuntimeConfig::new();
        config.cors_origins = vec!["*".to_string()];
        assert!(config.validate().is_err());

        config.debug = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_window_sizes() {
        let config = RuntimeConfig::new().with_memory_window(10);
        // keep_verbatim default 20 >= window 10
        assert!(config.validate().is_err());
    }
}
