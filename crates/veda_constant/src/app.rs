//! App metadata and process-wide defaults.

pub const APP_NAME: &str = "veda";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address for the HTTP surface.
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

/// Default chat model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Share of question generation routed to the generative engine.
pub const DEFAULT_AI_RATIO: f64 = 0.5;

/// Per-session rate limit: requests per window.
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 30;
/// Per-session rate limit: window length in seconds.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;

/// Per-LLM-call timeout in seconds.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
/// Soft deadline for a whole turn in seconds.
pub const DEFAULT_TURN_DEADLINE_SECS: u64 = 60;
/// How long a request waits for a busy session before giving up, in seconds.
pub const DEFAULT_SESSION_WAIT_SECS: u64 = 30;

/// Retained messages per session before summarization kicks in.
pub const DEFAULT_MEMORY_WINDOW: usize = 40;
/// Messages kept verbatim when the window overflows.
pub const DEFAULT_MEMORY_KEEP_VERBATIM: usize = 20;
/// Token budget for the rolling summary.
pub const DEFAULT_SUMMARY_MAX_TOKENS: u32 = 400;
/// Idle session lifetime in seconds (24 hours).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// Tool-call recursion cap per turn.
pub const MAX_TOOL_CALLS_PER_TURN: usize = 4;

/// Fallback reply when the turn deadline is breached.
pub const DEADLINE_FALLBACK_REPLY: &str =
    "I'm having trouble thinking right now — could you try again?";
