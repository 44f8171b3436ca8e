//! Veda Observability - Reusable tracing utilities for the tutoring backend
//!
//! Provides OpenTelemetry tracing setup and span helpers shared by the
//! server and any future workers.
//!
//! # Quick Start
//!
//! ```no_run
//! use veda_observability::ObservabilityConfig;
//!
//! let config = ObservabilityConfig::new("veda-server")
//!     .with_otlp_endpoint("http://localhost:4317")
//!     .with_log_level("info");
//!
//! veda_observability::init(config).unwrap();
//!
//! // Or initialize from environment variables
//! // veda_observability::init_from_env().unwrap();
//!
//! tracing::info!("Service started");
//! ```
//!
//! # Environment Variables
//!
//! - `OTEL_SERVICE_NAME` or `SERVICE_NAME` - Service name
//! - `OTEL_SERVICE_VERSION` or `SERVICE_VERSION` - Service version
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` or `TEMPO_ENDPOINT` - OTLP endpoint
//! - `OTEL_LOG_LEVEL` or `RUST_LOG` - Log level filter

pub mod config;
pub mod error;
pub mod telemetry;
pub mod tracing;

pub use config::ObservabilityConfig;
pub use error::ObservabilityError;
pub use telemetry::{init, init_from_env, shutdown};
pub use tracing::{record_duration, record_error};

// Macros are exported via #[macro_export] and available as
// veda_observability::turn_span!(), agent_span!(), http_request_span!().
