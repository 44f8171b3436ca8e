//! OpenTelemetry initialization (OTLP export with console fallback).
//!
//! Uses the OpenTelemetry Rust 0.31 builder APIs: `SpanExporter::builder()`
//! plus `SdkTracerProvider::builder()`, with the provider stored for a clean
//! shutdown.

use once_cell::sync::OnceCell;
use opentelemetry::{global, trace::TracerProvider, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

use crate::config::ObservabilityConfig;
use crate::error::ObservabilityError;

// Kept for shutdown; set once on successful OTLP init.
static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Initialize tracing with the given configuration.
///
/// Console logging is always available; OTLP export is added when an
/// endpoint is configured, and failure to reach it degrades to
/// console-only rather than aborting startup.
pub fn init(config: ObservabilityConfig) -> Result<(), ObservabilityError> {
    let env_filter = config
        .log_level
        .as_ref()
        .map(|level| tracing_subscriber::EnvFilter::new(level.as_str()))
        .unwrap_or_else(|| {
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        });

    let mut attributes = vec![KeyValue::new("service.name", config.service_name.clone())];
    if let Some(version) = &config.service_version {
        attributes.push(KeyValue::new("service.version", version.clone()));
    }
    for (key, value) in &config.resource_attributes {
        attributes.push(KeyValue::new(key.clone(), value.clone()));
    }

    let resource = Resource::builder().with_attributes(attributes).build();

    // Build layers separately, compose once (avoids subscriber type mismatch)
    let fmt_layer = config
        .enable_console
        .then_some(tracing_subscriber::fmt::layer());

    let otel_layer = if let Some(endpoint) = &config.otlp_endpoint {
        match build_otlp_tracer_provider(&config.service_name, endpoint, resource) {
            Ok((tracer, provider)) => {
                // set the global provider before creating the layer
                global::set_tracer_provider(provider.clone());
                let _ = TRACER_PROVIDER.set(provider);

                tracing::info!(
                    service.name = %config.service_name,
                    otlp.endpoint = %endpoint,
                    "OTLP tracing enabled"
                );
                Some(OpenTelemetryLayer::new(tracer))
            }
            Err(e) => {
                tracing::warn!(
                    service.name = %config.service_name,
                    endpoint = %endpoint,
                    error = %e,
                    "Failed to initialize OTLP export, falling back to console-only tracing"
                );
                None
            }
        }
    } else {
        tracing::info!(
            service.name = %config.service_name,
            "Tracing initialized (console only, no OTLP endpoint configured)"
        );
        None
    };

    let subscriber = Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer);

    subscriber.init();

    Ok(())
}

fn build_otlp_tracer_provider(
    service_name: &str,
    endpoint: &str,
    resource: Resource,
) -> Result<(opentelemetry_sdk::trace::SdkTracer, SdkTracerProvider), ObservabilityError> {
    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.to_string())
        .build()
        .map_err(|e| ObservabilityError::InitFailed(e.to_string()))?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(span_exporter)
        .with_resource(resource)
        .build();

    // tracer() requires 'static, so pass an owned String
    let tracer = provider.tracer(service_name.to_string());

    Ok((tracer, provider))
}

/// Flush and shut down the tracer provider. Call during graceful shutdown.
pub fn shutdown() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        let _ = provider.shutdown();
        tracing::debug!("OpenTelemetry tracer provider shut down");
    } else {
        tracing::debug!("No OpenTelemetry tracer provider to shutdown");
    }
}

/// Initialize with configuration read from environment variables.
pub fn init_from_env() -> Result<(), ObservabilityError> {
    let config = ObservabilityConfig::from_env();
    init(config)
}
