//! Poller options
//!
//! Tuning for a task poller: how many threads poll, how fast they may poll
//! and how the delay between unsuccessful polls grows.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, OptionsError};

/// Immutable poller tuning
///
/// Built through [`PollerOptionsBuilder`]; a built value always satisfies
/// [`PollerOptions::validate`].
///
/// # Example
///
/// ```
/// use flowline_worker::PollerOptions;
/// use std::time::Duration;
///
/// let options = PollerOptions::builder()
///     .with_poll_backoff_initial_interval(Duration::from_millis(200))
///     .with_poll_backoff_maximum_interval(Duration::from_secs(20))
///     .with_poll_thread_count(1)
///     .build()
///     .unwrap();
///
/// assert_eq!(options.poll_thread_count(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollerOptions {
    /// Window over which `maximum_poll_rate_per_second` is enforced
    #[serde(with = "duration_millis")]
    maximum_poll_rate_interval: Duration,

    /// Upper bound on polls per second across all poll threads (0 = unlimited)
    maximum_poll_rate_per_second: f64,

    /// Growth factor applied to the backoff after each failed poll
    poll_backoff_coefficient: f64,

    /// Delay after the first failed poll
    #[serde(with = "duration_millis")]
    poll_backoff_initial_interval: Duration,

    /// Ceiling for the backoff delay
    #[serde(with = "duration_millis")]
    poll_backoff_maximum_interval: Duration,

    /// Number of threads polling concurrently
    poll_thread_count: u32,

    /// Name prefix for poll threads
    #[serde(default)]
    poll_thread_name_prefix: Option<String>,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            maximum_poll_rate_interval: Duration::from_millis(1000),
            maximum_poll_rate_per_second: 0.0,
            poll_backoff_coefficient: 2.0,
            poll_backoff_initial_interval: Duration::from_millis(100),
            poll_backoff_maximum_interval: Duration::from_secs(60),
            poll_thread_count: 1,
            poll_thread_name_prefix: None,
        }
    }
}

impl PollerOptions {
    /// Builder seeded with the default poller tuning
    pub fn builder() -> PollerOptionsBuilder {
        PollerOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Tuning for the sticky-workflow poller when none is configured:
    /// 200ms initial backoff, 20s maximum backoff, a single poll thread
    pub(crate) fn sticky_workflow_default() -> Self {
        Self {
            poll_backoff_initial_interval: Duration::from_millis(200),
            poll_backoff_maximum_interval: Duration::from_secs(20),
            poll_thread_count: 1,
            ..Self::default()
        }
    }

    /// Builder seeded with every field of `existing`
    pub fn builder_from(existing: &PollerOptions) -> PollerOptionsBuilder {
        PollerOptionsBuilder {
            options: existing.clone(),
        }
    }

    pub fn maximum_poll_rate_interval(&self) -> Duration {
        self.maximum_poll_rate_interval
    }

    pub fn maximum_poll_rate_per_second(&self) -> f64 {
        self.maximum_poll_rate_per_second
    }

    pub fn poll_backoff_coefficient(&self) -> f64 {
        self.poll_backoff_coefficient
    }

    pub fn poll_backoff_initial_interval(&self) -> Duration {
        self.poll_backoff_initial_interval
    }

    pub fn poll_backoff_maximum_interval(&self) -> Duration {
        self.poll_backoff_maximum_interval
    }

    pub fn poll_thread_count(&self) -> u32 {
        self.poll_thread_count
    }

    pub fn poll_thread_name_prefix(&self) -> Option<&str> {
        self.poll_thread_name_prefix.as_deref()
    }

    /// Validate the configuration
    ///
    /// Deserialized values skip the builder, so anything loaded from config
    /// should pass through here before use.
    pub fn validate(&self) -> Result<(), OptionsError> {
        ensure_positive("poll_thread_count", self.poll_thread_count)?;

        if self.poll_backoff_initial_interval.is_zero() {
            return Err(invalid(
                "poll_backoff_initial_interval",
                "should be greater than 0",
            ));
        }
        if self.poll_backoff_maximum_interval < self.poll_backoff_initial_interval {
            return Err(invalid(
                "poll_backoff_maximum_interval",
                "should not be less than poll_backoff_initial_interval",
            ));
        }
        // NaN fails both comparisons below
        if !(self.poll_backoff_coefficient >= 1.0) {
            return Err(invalid(
                "poll_backoff_coefficient",
                "should be greater than or equal to 1.0",
            ));
        }
        if !(self.maximum_poll_rate_per_second >= 0.0) {
            return Err(invalid(
                "maximum_poll_rate_per_second",
                "should not be negative",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &'static str) -> OptionsError {
    tracing::warn!(field, reason, "Rejecting poller options");
    OptionsError::Invalid { field, reason }
}

/// Mutable accumulator for [`PollerOptions`]
///
/// Setters never fail; all checks happen in [`PollerOptionsBuilder::build`].
#[derive(Debug, Clone)]
pub struct PollerOptionsBuilder {
    options: PollerOptions,
}

impl PollerOptionsBuilder {
    /// Set the window for rate limiting
    pub fn with_maximum_poll_rate_interval(mut self, interval: Duration) -> Self {
        self.options.maximum_poll_rate_interval = interval;
        self
    }

    /// Set the maximum polls per second (0 disables the limit)
    pub fn with_maximum_poll_rate_per_second(mut self, rate: f64) -> Self {
        self.options.maximum_poll_rate_per_second = rate;
        self
    }

    /// Set the backoff coefficient
    pub fn with_poll_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.options.poll_backoff_coefficient = coefficient;
        self
    }

    /// Set the initial backoff interval
    pub fn with_poll_backoff_initial_interval(mut self, interval: Duration) -> Self {
        self.options.poll_backoff_initial_interval = interval;
        self
    }

    /// Set the maximum backoff interval
    pub fn with_poll_backoff_maximum_interval(mut self, interval: Duration) -> Self {
        self.options.poll_backoff_maximum_interval = interval;
        self
    }

    /// Set the number of poll threads
    pub fn with_poll_thread_count(mut self, count: u32) -> Self {
        self.options.poll_thread_count = count;
        self
    }

    /// Set the poll thread name prefix
    pub fn with_poll_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.poll_thread_name_prefix = Some(prefix.into());
        self
    }

    /// Validate and freeze the current builder state
    pub fn build(&self) -> Result<PollerOptions, OptionsError> {
        self.options.validate()?;
        Ok(self.options.clone())
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
