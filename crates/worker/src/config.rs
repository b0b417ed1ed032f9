//! Worker factory configuration
//!
//! Plain configuration structure for worker factory options, loadable from
//! serde sources or from environment variables. Every field is optional; unset
//! fields take the defaults from [`crate::factory`].

use serde::{Deserialize, Serialize};

use crate::error::OptionsError;
use crate::poller::PollerOptions;

/// Env var for [`WorkerFactoryConfig::cache_maximum_size`]
pub const ENV_CACHE_MAXIMUM_SIZE: &str = "WORKER_CACHE_MAXIMUM_SIZE";

/// Env var for [`WorkerFactoryConfig::max_workflow_thread_count`]
pub const ENV_MAX_WORKFLOW_THREAD_COUNT: &str = "WORKER_MAX_WORKFLOW_THREAD_COUNT";

/// Env var for [`WorkerFactoryConfig::sticky_decision_schedule_to_start_timeout_secs`]
pub const ENV_STICKY_SCHEDULE_TO_START_TIMEOUT_SECS: &str =
    "WORKER_STICKY_SCHEDULE_TO_START_TIMEOUT_SECS";

/// Configuration for worker factory options
///
/// Turned into validated options with
/// [`WorkerFactoryOptions::from_config`](crate::WorkerFactoryOptions::from_config).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerFactoryConfig {
    /// Maximum cached sticky workflow executions (default: 600)
    pub cache_maximum_size: Option<u32>,

    /// Workflow thread budget (default: 600)
    pub max_workflow_thread_count: Option<u32>,

    /// Sticky decision schedule-to-start timeout in seconds (default: 5)
    pub sticky_decision_schedule_to_start_timeout_secs: Option<u32>,

    /// Sticky poller tuning (default: 200ms / 20s backoff, 1 thread)
    pub sticky_workflow_poller_options: Option<PollerOptions>,
}

impl WorkerFactoryConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `WORKER_CACHE_MAXIMUM_SIZE`: Maximum cached sticky workflows
    /// - `WORKER_MAX_WORKFLOW_THREAD_COUNT`: Workflow thread budget
    /// - `WORKER_STICKY_SCHEDULE_TO_START_TIMEOUT_SECS`: Sticky decision timeout
    ///
    /// A set variable that does not parse as an unsigned integer fails with
    /// [`OptionsError::Invalid`] naming the variable. A `0` parses, and is
    /// rejected later by `build()`.
    pub fn from_env() -> Result<Self, OptionsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, OptionsError> {
        Ok(Self {
            cache_maximum_size: parse_var(&lookup, ENV_CACHE_MAXIMUM_SIZE)?,
            max_workflow_thread_count: parse_var(&lookup, ENV_MAX_WORKFLOW_THREAD_COUNT)?,
            sticky_decision_schedule_to_start_timeout_secs: parse_var(
                &lookup,
                ENV_STICKY_SCHEDULE_TO_START_TIMEOUT_SECS,
            )?,
            sticky_workflow_poller_options: None,
        })
    }
}

fn parse_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u32>, OptionsError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim().parse().map(Some).map_err(|e| {
        tracing::warn!(var = key, value = %raw, error = %e, "Rejecting unparsable environment variable");
        OptionsError::Invalid {
            field: key,
            reason: "should be an unsigned integer",
        }
    })
}
