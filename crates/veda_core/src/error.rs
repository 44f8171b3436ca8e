use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("session error: {0}")]
    Session(String),

    #[error("sink error: {0}")]
    Sink(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
