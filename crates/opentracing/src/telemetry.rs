//! Telemetry bootstrap
//!
//! Installs the process-wide tracing subscriber and, when an OTLP endpoint is
//! configured, an OpenTelemetry SDK tracer provider registered as the global
//! provider. Options without an explicit tracer export through it, whether
//! they were built before or after.

use std::time::Duration;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
    Resource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::options::DEFAULT_TRACER_NAME;

/// Configuration for telemetry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name for traces
    pub service_name: String,
    /// Service version
    pub service_version: Option<String>,
    /// OTLP endpoint (e.g., "http://localhost:4317")
    pub otlp_endpoint: Option<String>,
    /// Environment (e.g., "development", "production")
    pub environment: Option<String>,
    /// Whether to enable console logging
    pub enable_console: bool,
    /// Log filter (e.g., "info", "debug", "flowline=debug")
    pub log_filter: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "flowline".to_string(),
            service_version: None,
            otlp_endpoint: None,
            environment: None,
            enable_console: true,
            log_filter: None,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `OTEL_SERVICE_NAME`: Service name (default: "flowline")
    /// - `OTEL_SERVICE_VERSION`: Service version
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., "http://localhost:4317")
    /// - `OTEL_ENVIRONMENT`: Deployment environment
    /// - `RUST_LOG` or `LOG_LEVEL`: Log filter
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            service_name: lookup("OTEL_SERVICE_NAME").unwrap_or_else(|| "flowline".to_string()),
            service_version: lookup("OTEL_SERVICE_VERSION"),
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|e| !e.is_empty()),
            environment: lookup("OTEL_ENVIRONMENT"),
            enable_console: true,
            log_filter: lookup("RUST_LOG").or_else(|| lookup("LOG_LEVEL")),
        }
    }

    fn resource(&self) -> Resource {
        let mut attrs = vec![KeyValue::new("service.name", self.service_name.clone())];

        if let Some(version) = &self.service_version {
            attrs.push(KeyValue::new("service.version", version.clone()));
        }

        if let Some(env) = &self.environment {
            attrs.push(KeyValue::new("deployment.environment", env.clone()));
        }

        Resource::builder().with_attributes(attrs).build()
    }

    fn env_filter(&self) -> EnvFilter {
        self.log_filter
            .as_ref()
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

/// Guard that shuts down the tracer provider when dropped
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// True when spans are exported over OTLP
    pub fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shutdown tracer provider: {:?}", e);
            }
        }
    }
}

/// Initialize logging and, if configured, OTLP span export
///
/// Returns a guard that shuts the provider down when dropped; keep it alive
/// for the lifetime of the application. An exporter that fails to build is
/// logged and skipped rather than failing startup. Installing a second
/// subscriber in the same process fails with [`TelemetryError::Subscriber`].
///
/// # Example
///
/// ```ignore
/// use flowline_opentracing::telemetry::{init_telemetry, TelemetryConfig};
/// use flowline_opentracing::OpenTracingOptions;
///
/// let _guard = init_telemetry(TelemetryConfig::from_env())?;
/// // Without an explicit tracer, spans go to the provider installed above
/// let options = OpenTracingOptions::builder().build();
/// ```
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let console_layer = config.enable_console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(config.env_filter())
    });

    let (provider, otel_layer, otel_status) = match &config.otlp_endpoint {
        Some(endpoint) => match build_otlp_provider(endpoint, config.resource()) {
            Ok(provider) => {
                let tracer = provider.tracer(DEFAULT_TRACER_NAME);
                let layer = tracing_opentelemetry::layer().with_tracer(tracer);
                (Some(provider), Some(layer), Some(Ok(endpoint.clone())))
            }
            Err(e) => (None, None, Some(Err(e))),
        },
        None => (None, None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(console_layer)
        .with(otel_layer);
    let guard = install(subscriber, provider)?;

    // Logged after the subscriber exists so the messages are not lost
    match otel_status {
        Some(Ok(endpoint)) => {
            tracing::info!(endpoint = %endpoint, "OpenTelemetry tracing enabled");
        }
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Failed to initialize OTLP tracer, continuing without tracing");
        }
        None => {
            tracing::debug!("OpenTelemetry tracing disabled: OTEL_EXPORTER_OTLP_ENDPOINT not set");
        }
    }

    Ok(guard)
}

// Global provider is only replaced once the subscriber is in place
fn install<S>(
    subscriber: S,
    provider: Option<SdkTracerProvider>,
) -> Result<TelemetryGuard, TelemetryError>
where
    S: SubscriberInitExt,
{
    subscriber.try_init()?;

    if let Some(provider) = &provider {
        opentelemetry::global::set_tracer_provider(provider.clone());
    }

    Ok(TelemetryGuard { provider })
}

fn build_otlp_provider(
    endpoint: &str,
    resource: Resource,
) -> Result<SdkTracerProvider, TelemetryError> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = TelemetryConfig::from_lookup(lookup(&[]));
        assert_eq!(config, TelemetryConfig::default());
    }

    #[test]
    fn test_from_lookup_reads_vars() {
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("OTEL_SERVICE_NAME", "orders-worker"),
            ("OTEL_SERVICE_VERSION", "1.2.3"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"),
            ("OTEL_ENVIRONMENT", "staging"),
            ("LOG_LEVEL", "debug"),
        ]));

        assert_eq!(config.service_name, "orders-worker");
        assert_eq!(config.service_version.as_deref(), Some("1.2.3"));
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://localhost:4317"));
        assert_eq!(config.environment.as_deref(), Some("staging"));
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn test_rust_log_takes_precedence() {
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("RUST_LOG", "flowline=trace"),
            ("LOG_LEVEL", "warn"),
        ]));
        assert_eq!(config.log_filter.as_deref(), Some("flowline=trace"));
    }

    #[test]
    fn test_empty_endpoint_disables_export() {
        let config =
            TelemetryConfig::from_lookup(lookup(&[("OTEL_EXPORTER_OTLP_ENDPOINT", "")]));
        assert_eq!(config.otlp_endpoint, None);
    }

    #[test]
    fn test_failed_install_keeps_global_provider() {
        use opentelemetry::trace::{Span as _, Tracer as _};

        // Holds the global default so the install below is rejected
        let _ = tracing_subscriber::registry().try_init();

        let result = install(
            tracing_subscriber::registry(),
            Some(SdkTracerProvider::builder().build()),
        );
        assert!(matches!(result, Err(TelemetryError::Subscriber(_))));

        let span = opentelemetry::global::tracer("telemetry-test").start("after-failed-install");
        assert!(!span.span_context().is_valid());
    }

    #[test]
    fn test_invalid_filter_falls_back_to_info() {
        let config = TelemetryConfig {
            log_filter: Some("flowline=notalevel".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.env_filter().to_string(),
            EnvFilter::new("info").to_string()
        );
    }
}
