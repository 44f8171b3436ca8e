//! Utility macros and functions for tracing

/// Create a span with common HTTP request fields.
///
/// Use this in HTTP handlers to capture request metadata consistently.
///
/// # Example
///
/// ```rust
/// use veda_observability::http_request_span;
///
/// let span = http_request_span!("POST", "/api/v1/chat", "req-123");
/// let _guard = span.enter();
/// // ... handler code ...
/// ```
#[macro_export]
macro_rules! http_request_span {
    ($method:expr, $path:expr, $request_id:expr) => {
        tracing::info_span!(
            "http.request",
            http.method = $method,
            http.route = $path,
            http.status_code = tracing::field::Empty,
            request.id = $request_id,
        )
    };
}

/// Create a span for agent operations.
///
/// # Example
///
/// ```rust
/// use veda_observability::agent_span;
///
/// let span = agent_span!("practice", "invoke");
/// let _guard = span.enter();
/// // ... agent call ...
/// ```
#[macro_export]
macro_rules! agent_span {
    ($agent:expr, $operation:expr) => {
        tracing::info_span!(
            "agent.operation",
            agent.name = $agent,
            operation = $operation,
        )
    };
}

/// Create a span covering one chat turn. Route fields are recorded once the
/// supervisor has decided.
///
/// # Example
///
/// ```rust
/// use veda_observability::turn_span;
///
/// let span = turn_span!("session-123");
/// let _guard = span.enter();
/// // ... turn processing ...
/// ```
#[macro_export]
macro_rules! turn_span {
    ($session_id:expr) => {
        tracing::info_span!(
            "turn",
            session.id = $session_id,
            route.target = tracing::field::Empty,
            route.source = tracing::field::Empty,
            route.confidence = tracing::field::Empty,
            error.kind = tracing::field::Empty,
        )
    };
}

/// Record an error on the current span.
///
/// # Example
///
/// ```rust,ignore
/// match some_operation() {
///     Ok(result) => result,
///     Err(e) => {
///         veda_observability::record_error(&e);
///         return Err(e);
///     }
/// }
/// ```
pub fn record_error<E: std::error::Error>(error: &E) {
    let span = tracing::Span::current();
    span.record("error", true);
    span.record("error.message", error.to_string());
    tracing::error!(error = %error, "Operation failed");
}

/// Record latency/duration on the current span.
///
/// # Example
///
/// ```rust
/// use std::time::Instant;
///
/// let start = Instant::now();
/// // ... operation ...
/// veda_observability::record_duration("llm.duration_ms", start.elapsed());
/// ```
pub fn record_duration(key: &str, duration: std::time::Duration) {
    let span = tracing::Span::current();
    span.record(key, duration.as_millis() as u64);
}
