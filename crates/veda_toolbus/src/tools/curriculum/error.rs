use thiserror::Error;

#[derive(Debug, Error)]
pub enum CurriculumError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("no chapter matches {0:?}")]
    NoMatch(String),
}
