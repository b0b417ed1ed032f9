//! Worker factory options
//!
//! Settings shared by every worker created from one factory: the sticky
//! workflow cache, the workflow thread budget, the sticky task queue timeout
//! and poller, and the context propagators applied to all workflows.

use std::sync::LazyLock;
use std::time::Duration;

use tracing::debug;

use crate::config::WorkerFactoryConfig;
use crate::error::{ensure_positive, OptionsError};
use crate::poller::PollerOptions;
use crate::propagation::SharedPropagator;

/// Default maximum number of cached sticky workflow executions
pub const DEFAULT_CACHE_MAXIMUM_SIZE: u32 = 600;

/// Default workflow thread budget across all workers of a factory
pub const DEFAULT_MAX_WORKFLOW_THREAD_COUNT: u32 = 600;

/// Default seconds before a sticky decision task is released to any worker
pub const DEFAULT_STICKY_DECISION_SCHEDULE_TO_START_TIMEOUT_SECS: u32 = 5;

static DEFAULT_INSTANCE: LazyLock<WorkerFactoryOptions> =
    LazyLock::new(WorkerFactoryOptions::defaults);

/// Immutable worker factory settings
///
/// Every value is an owned snapshot: nothing in a built instance is shared
/// with the builder that produced it or with collections the caller passed in.
/// Safe to share across threads once built.
///
/// # Example
///
/// ```
/// use flowline_worker::WorkerFactoryOptions;
///
/// let options = WorkerFactoryOptions::builder()
///     .with_cache_maximum_size(1_000)
///     .with_max_workflow_thread_count(800)
///     .build()
///     .unwrap();
///
/// assert_eq!(options.cache_maximum_size(), 1_000);
/// assert_eq!(options.sticky_decision_schedule_to_start_timeout_secs(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct WorkerFactoryOptions {
    cache_maximum_size: u32,
    max_workflow_thread_count: u32,
    sticky_decision_schedule_to_start_timeout_secs: u32,
    sticky_workflow_poller_options: PollerOptions,
    context_propagators: Vec<SharedPropagator>,
}

impl Default for WorkerFactoryOptions {
    fn default() -> Self {
        Self::defaults()
    }
}

impl WorkerFactoryOptions {
    /// Builder seeded with defaults
    pub fn builder() -> WorkerFactoryOptionsBuilder {
        WorkerFactoryOptionsBuilder::default()
    }

    /// Builder seeded with a copy of every field of `existing`
    pub fn builder_from(existing: &WorkerFactoryOptions) -> WorkerFactoryOptionsBuilder {
        WorkerFactoryOptionsBuilder {
            cache_maximum_size: existing.cache_maximum_size,
            max_workflow_thread_count: existing.max_workflow_thread_count,
            sticky_decision_schedule_to_start_timeout_secs: existing
                .sticky_decision_schedule_to_start_timeout_secs,
            sticky_workflow_poller_options: Some(existing.sticky_workflow_poller_options.clone()),
            context_propagators: Some(existing.context_propagators.clone()),
        }
    }

    /// Shorthand for [`WorkerFactoryOptions::builder_from`]
    pub fn to_builder(&self) -> WorkerFactoryOptionsBuilder {
        Self::builder_from(self)
    }

    /// Process-wide defaults, built once on first access
    ///
    /// Prefer passing options explicitly; this exists for call sites that
    /// have no configuration of their own.
    pub fn default_instance() -> &'static WorkerFactoryOptions {
        &DEFAULT_INSTANCE
    }

    /// Build options from a configuration structure
    ///
    /// Unset fields take their defaults. Context propagators are code rather
    /// than data; use [`WorkerFactoryOptions::builder_from_config`] to add them.
    pub fn from_config(config: WorkerFactoryConfig) -> Result<Self, OptionsError> {
        Self::builder_from_config(config)?.build()
    }

    /// Builder seeded from a configuration structure
    ///
    /// A poller configuration is validated here since it did not go through
    /// [`PollerOptions::builder`]. The remaining fields are validated by
    /// `build()`.
    pub fn builder_from_config(
        config: WorkerFactoryConfig,
    ) -> Result<WorkerFactoryOptionsBuilder, OptionsError> {
        let mut builder = Self::builder();

        if let Some(size) = config.cache_maximum_size {
            builder = builder.with_cache_maximum_size(size);
        }
        if let Some(count) = config.max_workflow_thread_count {
            builder = builder.with_max_workflow_thread_count(count);
        }
        if let Some(secs) = config.sticky_decision_schedule_to_start_timeout_secs {
            builder = builder.with_sticky_decision_schedule_to_start_timeout_secs(secs);
        }
        if let Some(poller) = config.sticky_workflow_poller_options {
            poller.validate()?;
            builder = builder.with_sticky_workflow_poller_options(poller);
        }

        Ok(builder)
    }

    // Builder defaults are valid by construction
    fn defaults() -> Self {
        WorkerFactoryOptionsBuilder::default().snapshot()
    }

    /// Maximum number of sticky workflow executions cached across all workers
    pub fn cache_maximum_size(&self) -> u32 {
        self.cache_maximum_size
    }

    /// Threads available for workflow execution across all workers
    pub fn max_workflow_thread_count(&self) -> u32 {
        self.max_workflow_thread_count
    }

    /// Seconds a sticky decision task waits for its host before any worker may take it
    pub fn sticky_decision_schedule_to_start_timeout_secs(&self) -> u32 {
        self.sticky_decision_schedule_to_start_timeout_secs
    }

    /// [`Self::sticky_decision_schedule_to_start_timeout_secs`] as a `Duration`
    pub fn sticky_decision_schedule_to_start_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(
            self.sticky_decision_schedule_to_start_timeout_secs,
        ))
    }

    /// Poller tuning for the sticky task queue shared by all workers
    pub fn sticky_workflow_poller_options(&self) -> &PollerOptions {
        &self.sticky_workflow_poller_options
    }

    /// Propagators in the order they are applied
    pub fn context_propagators(&self) -> &[SharedPropagator] {
        &self.context_propagators
    }

    /// Propagator names, in application order
    pub fn context_propagator_names(&self) -> Vec<&str> {
        self.context_propagators.iter().map(|p| p.name()).collect()
    }
}

impl TryFrom<WorkerFactoryConfig> for WorkerFactoryOptions {
    type Error = OptionsError;

    fn try_from(config: WorkerFactoryConfig) -> Result<Self, Self::Error> {
        Self::from_config(config)
    }
}

/// Mutable accumulator for [`WorkerFactoryOptions`]
///
/// Setters record values as given; validation happens in
/// [`WorkerFactoryOptionsBuilder::build`]. A builder is meant for a single
/// owner and is not synchronized.
#[derive(Debug, Clone)]
pub struct WorkerFactoryOptionsBuilder {
    cache_maximum_size: u32,
    max_workflow_thread_count: u32,
    sticky_decision_schedule_to_start_timeout_secs: u32,
    sticky_workflow_poller_options: Option<PollerOptions>,
    context_propagators: Option<Vec<SharedPropagator>>,
}

impl Default for WorkerFactoryOptionsBuilder {
    fn default() -> Self {
        Self {
            cache_maximum_size: DEFAULT_CACHE_MAXIMUM_SIZE,
            max_workflow_thread_count: DEFAULT_MAX_WORKFLOW_THREAD_COUNT,
            sticky_decision_schedule_to_start_timeout_secs:
                DEFAULT_STICKY_DECISION_SCHEDULE_TO_START_TIMEOUT_SECS,
            sticky_workflow_poller_options: None,
            context_propagators: None,
        }
    }
}

impl WorkerFactoryOptionsBuilder {
    /// Set the maximum number of cached sticky workflow executions
    ///
    /// The cache is shared by all workers created by the factory.
    pub fn with_cache_maximum_size(mut self, size: u32) -> Self {
        self.cache_maximum_size = size;
        self
    }

    /// Set the workflow thread budget across all workers of the factory
    pub fn with_max_workflow_thread_count(mut self, count: u32) -> Self {
        self.max_workflow_thread_count = count;
        self
    }

    /// Set how long a sticky decision task waits for its assigned host
    ///
    /// Once it times out, any worker can pick it up.
    pub fn with_sticky_decision_schedule_to_start_timeout_secs(mut self, secs: u32) -> Self {
        self.sticky_decision_schedule_to_start_timeout_secs = secs;
        self
    }

    /// Set the poller tuning for the sticky task queue
    pub fn with_sticky_workflow_poller_options(mut self, options: PollerOptions) -> Self {
        self.sticky_workflow_poller_options = Some(options);
        self
    }

    /// Set the context propagators, in application order
    ///
    /// `None` leaves the choice to `build`, which falls back to no propagators.
    pub fn with_context_propagators(
        mut self,
        propagators: impl Into<Option<Vec<SharedPropagator>>>,
    ) -> Self {
        self.context_propagators = propagators.into();
        self
    }

    /// Validate the current state and freeze a copy of it
    ///
    /// The builder is left untouched and can be adjusted and built again.
    pub fn build(&self) -> Result<WorkerFactoryOptions, OptionsError> {
        ensure_positive("cache_maximum_size", self.cache_maximum_size)?;
        ensure_positive("max_workflow_thread_count", self.max_workflow_thread_count)?;
        ensure_positive(
            "sticky_decision_schedule_to_start_timeout_secs",
            self.sticky_decision_schedule_to_start_timeout_secs,
        )?;

        let options = self.snapshot();

        debug!(
            cache_maximum_size = options.cache_maximum_size,
            max_workflow_thread_count = options.max_workflow_thread_count,
            sticky_timeout_secs = options.sticky_decision_schedule_to_start_timeout_secs,
            sticky_poll_threads = options.sticky_workflow_poller_options.poll_thread_count(),
            propagators = options.context_propagators.len(),
            "Built worker factory options"
        );

        Ok(options)
    }

    // Copies the current state without validating it
    fn snapshot(&self) -> WorkerFactoryOptions {
        WorkerFactoryOptions {
            cache_maximum_size: self.cache_maximum_size,
            max_workflow_thread_count: self.max_workflow_thread_count,
            sticky_decision_schedule_to_start_timeout_secs: self
                .sticky_decision_schedule_to_start_timeout_secs,
            sticky_workflow_poller_options: self
                .sticky_workflow_poller_options
                .clone()
                .unwrap_or_else(PollerOptions::sticky_workflow_default),
            context_propagators: self.context_propagators.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::testing::KeyedPropagator;
    use std::sync::Arc;

    #[test]
    fn test_default_builder() {
        let options = WorkerFactoryOptions::builder().build().unwrap();
        assert_eq!(options.cache_maximum_size(), 600);
        assert_eq!(options.max_workflow_thread_count(), 600);
        assert_eq!(options.sticky_decision_schedule_to_start_timeout_secs(), 5);
        assert_eq!(
            options.sticky_decision_schedule_to_start_timeout(),
            Duration::from_secs(5)
        );
        assert!(options.context_propagators().is_empty());

        let poller = options.sticky_workflow_poller_options();
        assert_eq!(poller.poll_backoff_initial_interval(), Duration::from_millis(200));
        assert_eq!(poller.poll_backoff_maximum_interval(), Duration::from_secs(20));
        assert_eq!(poller.poll_thread_count(), 1);
    }

    #[test]
    fn test_default_instance_matches_fresh_build() {
        let instance = WorkerFactoryOptions::default_instance();
        let fresh = WorkerFactoryOptions::builder().build().unwrap();

        assert_eq!(instance.cache_maximum_size(), fresh.cache_maximum_size());
        assert_eq!(
            instance.max_workflow_thread_count(),
            fresh.max_workflow_thread_count()
        );
        assert_eq!(
            instance.sticky_decision_schedule_to_start_timeout_secs(),
            fresh.sticky_decision_schedule_to_start_timeout_secs()
        );
        assert_eq!(
            instance.sticky_workflow_poller_options(),
            fresh.sticky_workflow_poller_options()
        );
        assert!(instance.context_propagators().is_empty());
    }

    #[test]
    fn test_default_is_what_the_default_builder_builds() {
        let built = WorkerFactoryOptionsBuilder::default().build().unwrap();
        let default = WorkerFactoryOptions::default();

        assert_eq!(default.cache_maximum_size(), built.cache_maximum_size());
        assert_eq!(
            default.max_workflow_thread_count(),
            built.max_workflow_thread_count()
        );
        assert_eq!(
            default.sticky_decision_schedule_to_start_timeout_secs(),
            built.sticky_decision_schedule_to_start_timeout_secs()
        );
        assert_eq!(
            default.sticky_workflow_poller_options(),
            built.sticky_workflow_poller_options()
        );
        assert_eq!(
            default.context_propagator_names(),
            built.context_propagator_names()
        );
    }

    #[test]
    fn test_default_instance_is_shared() {
        let a = WorkerFactoryOptions::default_instance();
        let b = WorkerFactoryOptions::default_instance();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_zero_cache_size_rejected() {
        let err = WorkerFactoryOptions::builder()
            .with_cache_maximum_size(0)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            OptionsError::NotPositive {
                field: "cache_maximum_size"
            }
        );
        assert_eq!(err.to_string(), "cache_maximum_size should be greater than 0");
    }

    #[test]
    fn test_zero_thread_count_rejected() {
        let err = WorkerFactoryOptions::builder()
            .with_max_workflow_thread_count(0)
            .build()
            .unwrap_err();
        assert_eq!(err.field(), "max_workflow_thread_count");
    }

    #[test]
    fn test_zero_sticky_timeout_rejected() {
        let err = WorkerFactoryOptions::builder()
            .with_sticky_decision_schedule_to_start_timeout_secs(0)
            .build()
            .unwrap_err();
        assert_eq!(err.field(), "sticky_decision_schedule_to_start_timeout_secs");
    }

    #[test]
    fn test_first_invalid_field_is_reported() {
        let err = WorkerFactoryOptions::builder()
            .with_cache_maximum_size(0)
            .with_max_workflow_thread_count(0)
            .build()
            .unwrap_err();
        assert_eq!(err.field(), "cache_maximum_size");
    }

    #[test]
    fn test_failed_build_can_be_corrected() {
        let builder = WorkerFactoryOptions::builder().with_cache_maximum_size(0);
        assert!(builder.build().is_err());

        let options = builder.with_cache_maximum_size(10).build().unwrap();
        assert_eq!(options.cache_maximum_size(), 10);
    }

    #[test]
    fn test_custom_poller_options_kept() {
        let poller = PollerOptions::builder()
            .with_poll_thread_count(5)
            .build()
            .unwrap();
        let options = WorkerFactoryOptions::builder()
            .with_sticky_workflow_poller_options(poller.clone())
            .build()
            .unwrap();
        assert_eq!(options.sticky_workflow_poller_options(), &poller);
    }

    #[test]
    fn test_propagators_keep_order() {
        let options = WorkerFactoryOptions::builder()
            .with_context_propagators(vec![
                KeyedPropagator::shared("tenant"),
                KeyedPropagator::shared("baggage"),
                KeyedPropagator::shared("request"),
            ])
            .build()
            .unwrap();
        assert_eq!(
            options.context_propagator_names(),
            vec!["tenant", "baggage", "request"]
        );
    }

    #[test]
    fn test_none_propagators_build_empty() {
        let options = WorkerFactoryOptions::builder()
            .with_context_propagators(None)
            .build()
            .unwrap();
        assert!(options.context_propagators().is_empty());
    }

    #[test]
    fn test_builder_from_copies_all_fields() {
        let existing = WorkerFactoryOptions::builder()
            .with_cache_maximum_size(42)
            .with_max_workflow_thread_count(7)
            .with_sticky_decision_schedule_to_start_timeout_secs(30)
            .with_context_propagators(vec![KeyedPropagator::shared("tenant")])
            .build()
            .unwrap();

        let copy = WorkerFactoryOptions::builder_from(&existing).build().unwrap();
        assert_eq!(copy.cache_maximum_size(), 42);
        assert_eq!(copy.max_workflow_thread_count(), 7);
        assert_eq!(copy.sticky_decision_schedule_to_start_timeout_secs(), 30);
        assert_eq!(
            copy.sticky_workflow_poller_options(),
            existing.sticky_workflow_poller_options()
        );
        assert_eq!(copy.context_propagator_names(), vec!["tenant"]);
        assert!(Arc::ptr_eq(
            &copy.context_propagators()[0],
            &existing.context_propagators()[0]
        ));
    }

    #[test]
    fn test_builder_from_does_not_alias_propagators() {
        let existing = WorkerFactoryOptions::builder()
            .with_context_propagators(vec![KeyedPropagator::shared("tenant")])
            .build()
            .unwrap();

        let derived = existing
            .to_builder()
            .with_context_propagators(vec![
                KeyedPropagator::shared("a"),
                KeyedPropagator::shared("b"),
            ])
            .build()
            .unwrap();

        assert_eq!(existing.context_propagator_names(), vec!["tenant"]);
        assert_eq!(derived.context_propagator_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_build_snapshots_builder_state() {
        let builder = WorkerFactoryOptions::builder()
            .with_cache_maximum_size(100)
            .with_context_propagators(vec![KeyedPropagator::shared("tenant")]);
        let first = builder.build().unwrap();

        let builder = builder
            .with_cache_maximum_size(200)
            .with_context_propagators(None);
        let second = builder.build().unwrap();

        assert_eq!(first.cache_maximum_size(), 100);
        assert_eq!(first.context_propagator_names(), vec!["tenant"]);
        assert_eq!(second.cache_maximum_size(), 200);
        assert!(second.context_propagators().is_empty());
    }

    #[test]
    fn test_repeated_build_is_idempotent() {
        let builder = WorkerFactoryOptions::builder().with_max_workflow_thread_count(12);
        let a = builder.build().unwrap();
        let b = builder.build().unwrap();
        assert_eq!(a.max_workflow_thread_count(), b.max_workflow_thread_count());
    }

    #[test]
    fn test_from_config_defaults() {
        let options = WorkerFactoryOptions::from_config(WorkerFactoryConfig::default()).unwrap();
        assert_eq!(options.cache_maximum_size(), DEFAULT_CACHE_MAXIMUM_SIZE);
        assert_eq!(
            options.max_workflow_thread_count(),
            DEFAULT_MAX_WORKFLOW_THREAD_COUNT
        );
    }

    #[test]
    fn test_from_config_overrides() {
        let config = WorkerFactoryConfig {
            cache_maximum_size: Some(50),
            max_workflow_thread_count: Some(60),
            sticky_decision_schedule_to_start_timeout_secs: Some(10),
            sticky_workflow_poller_options: None,
        };
        let options = WorkerFactoryOptions::try_from(config).unwrap();
        assert_eq!(options.cache_maximum_size(), 50);
        assert_eq!(options.max_workflow_thread_count(), 60);
        assert_eq!(options.sticky_decision_schedule_to_start_timeout_secs(), 10);
    }

    #[test]
    fn test_from_config_rejects_zero() {
        let config = WorkerFactoryConfig {
            sticky_decision_schedule_to_start_timeout_secs: Some(0),
            ..Default::default()
        };
        let err = WorkerFactoryOptions::from_config(config).unwrap_err();
        assert_eq!(err.field(), "sticky_decision_schedule_to_start_timeout_secs");
    }

    #[test]
    fn test_from_config_validates_poller() {
        let config: WorkerFactoryConfig = serde_json::from_value(serde_json::json!({
            "sticky_workflow_poller_options": {
                "maximum_poll_rate_interval": 1000,
                "maximum_poll_rate_per_second": 0.0,
                "poll_backoff_coefficient": 2.0,
                "poll_backoff_initial_interval": 200,
                "poll_backoff_maximum_interval": 20000,
                "poll_thread_count": 0
            }
        }))
        .unwrap();

        let err = WorkerFactoryOptions::from_config(config).unwrap_err();
        assert_eq!(err.field(), "poll_thread_count");
    }

    #[test]
    fn test_builder_from_config_accepts_propagators() {
        let config = WorkerFactoryConfig {
            cache_maximum_size: Some(25),
            ..Default::default()
        };
        let options = WorkerFactoryOptions::builder_from_config(config)
            .unwrap()
            .with_context_propagators(vec![
                KeyedPropagator::shared("tenant"),
                KeyedPropagator::shared("baggage"),
            ])
            .build()
            .unwrap();

        assert_eq!(options.cache_maximum_size(), 25);
        assert_eq!(options.context_propagator_names(), vec!["tenant", "baggage"]);
    }

    #[test]
    fn test_builder_from_config_validates_poller_early() {
        let config: WorkerFactoryConfig = serde_json::from_value(serde_json::json!({
            "sticky_workflow_poller_options": {
                "maximum_poll_rate_interval": 1000,
                "maximum_poll_rate_per_second": 0.0,
                "poll_backoff_coefficient": 0.5,
                "poll_backoff_initial_interval": 200,
                "poll_backoff_maximum_interval": 20000,
                "poll_thread_count": 1
            }
        }))
        .unwrap();

        let err = WorkerFactoryOptions::builder_from_config(config).unwrap_err();
        assert_eq!(err.field(), "poll_backoff_coefficient");
    }
}
