//! Telemetry bootstrap against process-global state
//!
//! Kept in its own binary: the subscriber and the tracer provider can be
//! installed once per process.

use flowline_opentracing::{init_telemetry, OpenTracingOptions, TelemetryConfig, TelemetryError};
use opentelemetry::global;
use opentelemetry::trace::{Span as _, Tracer as _};
use opentelemetry_sdk::trace::SdkTracerProvider;

#[test]
fn console_only_init_then_second_init_fails() {
    let config = TelemetryConfig {
        log_filter: Some("debug".to_string()),
        ..Default::default()
    };

    let guard = init_telemetry(config.clone()).unwrap();
    assert!(!guard.is_exporting());

    let second = init_telemetry(config);
    assert!(matches!(second, Err(TelemetryError::Subscriber(_))));
}

#[test]
fn fallback_tracer_follows_provider_installed_later() {
    let default_options = OpenTracingOptions::default_instance();
    let before = OpenTracingOptions::builder().build();
    assert!(before.uses_global_tracer());
    assert!(!before.tracer().start("no-provider").span_context().is_valid());

    let provider = SdkTracerProvider::builder().build();
    global::set_tracer_provider(provider.clone());

    let after = OpenTracingOptions::builder().build();
    for (label, options) in [("default", default_options), ("before", &before), ("after", &after)] {
        let span = options.tracer().start("RunWorkflow:Order");
        assert!(span.span_context().is_valid(), "{label} options did not reach the provider");
    }

    provider.shutdown().unwrap();
}
