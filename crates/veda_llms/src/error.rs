use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing API key for provider {0}")]
    MissingApiKey(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    #[error("request timed out")]
    Timeout,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn provider_error(message: impl Into<String>) -> Self {
        Error::Provider(message.into())
    }

    pub fn stream_error(message: impl Into<String>) -> Self {
        Error::Stream(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
