//! Runtime error types. The `kind()` identifiers are stable and appear in
//! the per-turn structured log record.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid input: {0}")]
    InputInvalid(String),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("session is processing another turn")]
    SessionBusy,

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("tool loop exceeded {0} calls")]
    ToolLoopExceeded(usize),

    #[error("turn deadline exceeded")]
    Timeout,

    #[error(transparent)]
    Engine(#[from] veda_engine::EngineError),

    #[error(transparent)]
    Core(#[from] veda_core::CoreError),
}

impl RuntimeError {
    /// Stable identifier for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeError::InputInvalid(_) => "InputInvalid",
            RuntimeError::RateLimited { .. } => "RateLimited",
            RuntimeError::SessionBusy => "SessionBusy",
            RuntimeError::ProviderUnavailable(_) => "ProviderUnavailable",
            RuntimeError::ToolLoopExceeded(_) => "ToolLoopExceeded",
            RuntimeError::Timeout => "Timeout",
            RuntimeError::Engine(_) => "EngineError",
            RuntimeError::Core(_) => "CoreError",
        }
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
