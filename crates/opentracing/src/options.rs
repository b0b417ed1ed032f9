//! OpenTracing options
//!
//! Which tracer receives workflow spans, and how those spans are named.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use opentelemetry::global::{self, BoxedSpan, BoxedTracer};
use opentelemetry::trace::{SpanBuilder, Tracer};
use opentelemetry::Context;
use tracing::debug;

use crate::span::SpanOperationType;

/// Instrumentation scope name of the fallback tracer
pub const DEFAULT_TRACER_NAME: &str = "flowline-opentracing";

static DEFAULT_INSTANCE: LazyLock<OpenTracingOptions> =
    LazyLock::new(|| OpenTracingOptions::builder().build());

/// Tracer that looks up the global provider on every span
///
/// Options built before the global provider is installed still export
/// through it once it is.
#[derive(Debug, Clone, Copy, Default)]
struct GlobalTracer;

impl Tracer for GlobalTracer {
    type Span = BoxedSpan;

    fn build_with_context(&self, builder: SpanBuilder, parent_cx: &Context) -> Self::Span {
        global::tracer(DEFAULT_TRACER_NAME).build_with_context(builder, parent_cx)
    }
}

/// Immutable tracing settings
///
/// Always holds a tracer. When none was given, the tracer forwards every span
/// to whatever OpenTelemetry global provider is installed at the time the span
/// starts (see [`crate::telemetry::init_telemetry`]).
///
/// # Example
///
/// ```
/// use flowline_opentracing::{OpenTracingOptions, SpanOperationType};
///
/// let options = OpenTracingOptions::builder()
///     .with_span_operation_name_prefix(SpanOperationType::RunWorkflow, "workflow.run")
///     .build();
///
/// assert_eq!(
///     options.span_operation_name(SpanOperationType::RunWorkflow, "OrderWorkflow"),
///     "workflow.run:OrderWorkflow"
/// );
/// assert_eq!(
///     options.span_operation_name_prefix(SpanOperationType::RunActivity),
///     "RunActivity"
/// );
/// ```
#[derive(Clone)]
pub struct OpenTracingOptions {
    tracer: Arc<BoxedTracer>,
    global_tracer: bool,
    custom_span_operation_name_prefixes: HashMap<SpanOperationType, String>,
}

impl fmt::Debug for OpenTracingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenTracingOptions")
            .field("global_tracer", &self.global_tracer)
            .field(
                "custom_span_operation_name_prefixes",
                &self.custom_span_operation_name_prefixes,
            )
            .finish_non_exhaustive()
    }
}

impl Default for OpenTracingOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl OpenTracingOptions {
    /// Builder with no tracer and no prefix overrides
    pub fn builder() -> OpenTracingOptionsBuilder {
        OpenTracingOptionsBuilder::default()
    }

    /// Builder seeded with a copy of the tracer and overrides of `existing`
    pub fn builder_from(existing: &OpenTracingOptions) -> OpenTracingOptionsBuilder {
        OpenTracingOptionsBuilder {
            tracer: (!existing.global_tracer).then(|| Arc::clone(&existing.tracer)),
            custom_span_operation_name_prefixes: existing
                .custom_span_operation_name_prefixes
                .clone(),
        }
    }

    /// Process-wide options with the global tracer and default prefixes,
    /// built once on first access
    pub fn default_instance() -> &'static OpenTracingOptions {
        &DEFAULT_INSTANCE
    }

    pub fn tracer(&self) -> &Arc<BoxedTracer> {
        &self.tracer
    }

    /// True when the tracer forwards to the global provider
    pub fn uses_global_tracer(&self) -> bool {
        self.global_tracer
    }

    /// Prefix for spans of `operation_type`: the override if one was set,
    /// otherwise the type's built-in prefix
    pub fn span_operation_name_prefix(&self, operation_type: SpanOperationType) -> &str {
        self.custom_span_operation_name_prefixes
            .get(&operation_type)
            .map(String::as_str)
            .unwrap_or_else(|| operation_type.default_prefix())
    }

    /// Full span name, `{prefix}:{name}`, where `name` is the workflow or
    /// activity type
    pub fn span_operation_name(&self, operation_type: SpanOperationType, name: &str) -> String {
        format!("{}:{}", self.span_operation_name_prefix(operation_type), name)
    }
}

/// Mutable accumulator for [`OpenTracingOptions`]
///
/// Not synchronized; meant for a single owner.
#[derive(Clone, Default)]
pub struct OpenTracingOptionsBuilder {
    tracer: Option<Arc<BoxedTracer>>,
    custom_span_operation_name_prefixes: HashMap<SpanOperationType, String>,
}

impl fmt::Debug for OpenTracingOptionsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenTracingOptionsBuilder")
            .field("tracer_set", &self.tracer.is_some())
            .field(
                "custom_span_operation_name_prefixes",
                &self.custom_span_operation_name_prefixes,
            )
            .finish()
    }
}

impl OpenTracingOptionsBuilder {
    /// Set the tracer receiving spans
    pub fn with_tracer(mut self, tracer: Arc<BoxedTracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Set the tracer from any OpenTelemetry tracer, boxing it
    pub fn with_tracer_from<T>(self, tracer: T) -> Self
    where
        T: Tracer + Send + Sync + 'static,
        T::Span: Send + Sync + 'static,
    {
        self.with_tracer(Arc::new(BoxedTracer::new(Box::new(tracer))))
    }

    /// Override the span name prefix for one operation type
    ///
    /// The last value set for a type wins.
    pub fn with_span_operation_name_prefix(
        mut self,
        operation_type: SpanOperationType,
        prefix: impl Into<String>,
    ) -> Self {
        self.custom_span_operation_name_prefixes
            .insert(operation_type, prefix.into());
        self
    }

    /// Override several prefixes at once, in iteration order
    pub fn with_span_operation_name_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = (SpanOperationType, S)>,
        S: Into<String>,
    {
        for (operation_type, prefix) in prefixes {
            self = self.with_span_operation_name_prefix(operation_type, prefix);
        }
        self
    }

    /// Freeze a copy of the current state, falling back to a tracer that
    /// forwards to the global provider
    pub fn build(&self) -> OpenTracingOptions {
        let (tracer, global_tracer) = match &self.tracer {
            Some(tracer) => (Arc::clone(tracer), false),
            None => (Arc::new(BoxedTracer::new(Box::new(GlobalTracer))), true),
        };

        debug!(
            global_tracer,
            prefix_overrides = self.custom_span_operation_name_prefixes.len(),
            "Built tracing options"
        );

        OpenTracingOptions {
            tracer,
            global_tracer,
            custom_span_operation_name_prefixes: self.custom_span_operation_name_prefixes.clone(),
        }
    }
}
