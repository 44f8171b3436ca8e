use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckCalculationError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("evaluation failed: {0}")]
    Evaluation(#[from] veda_sandbox::SandboxError),
}
