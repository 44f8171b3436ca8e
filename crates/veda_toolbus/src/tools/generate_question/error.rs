use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateQuestionError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("unknown source {0:?} (expected \"pattern\" or \"ai\")")]
    UnknownSource(String),

    #[error("generation failed: {0}")]
    Generation(#[from] veda_engine::EngineError),
}
