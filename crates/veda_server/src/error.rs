//! HTTP error mapping. Every 4xx carries `{detail}`; 5xx bodies say
//! "internal error" unless debug is enabled. Stack traces never leave the
//! process.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use veda_runtime::RuntimeError;

pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
            retry_after_secs: None,
        }
    }

    pub fn internal(debug: bool, raw: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: if debug {
                raw.to_string()
            } else {
                "internal error".to_string()
            },
            retry_after_secs: None,
        }
    }

    pub fn from_runtime(error: RuntimeError, debug: bool) -> Self {
        match error {
            RuntimeError::InputInvalid(detail) => Self::bad_request(detail),
            RuntimeError::RateLimited { retry_after_secs } => Self {
                status: StatusCode::TOO_MANY_REQUESTS,
                detail: "too many requests for this session".to_string(),
                retry_after_secs: Some(retry_after_secs),
            },
            RuntimeError::SessionBusy => Self {
                status: StatusCode::CONFLICT,
                detail: "session is processing another turn".to_string(),
                retry_after_secs: None,
            },
            other => Self::internal(debug, other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "detail": self.detail }));
        let mut response = (self.status, body).into_response();
        if let Some(secs) = self.retry_after_secs {
            if let Ok(value) = secs.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
