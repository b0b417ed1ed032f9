//! # Flowline Tracing Options
//!
//! Configures how workflow and activity calls are traced:
//!
//! - [`OpenTracingOptions`] - the tracer receiving spans and per-operation span name prefixes
//! - [`SpanOperationType`] - closed set of traced operations, each with a default prefix
//! - [`telemetry`] - subscriber and OTLP bootstrap that installs the global tracer provider
//!
//! A missing tracer is never an error: options fall back to a tracer that
//! forwards to the OpenTelemetry global provider.

pub mod error;
pub mod options;
pub mod span;
pub mod telemetry;

// Re-exports
pub use error::{TelemetryError, UnknownSpanOperationType};
pub use options::{OpenTracingOptions, OpenTracingOptionsBuilder, DEFAULT_TRACER_NAME};
pub use span::SpanOperationType;
pub use telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};
