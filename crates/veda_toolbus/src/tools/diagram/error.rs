use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("diagram generation failed: {0}")]
    Generation(String),
}
