//! Error types

/// A span operation type name that matches no known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown span operation type: {0}")]
pub struct UnknownSpanOperationType(pub String);

/// Telemetry initialization errors
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The OTLP span exporter could not be built
    #[error("failed to build OTLP exporter: {0}")]
    Exporter(String),

    /// A global tracing subscriber is already installed
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}
