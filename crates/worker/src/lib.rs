//! # Flowline Worker Options
//!
//! Validated, immutable settings for a worker factory and the workers it creates.
//!
//! - [`WorkerFactoryOptions`] - sticky cache size, workflow thread budget,
//!   sticky decision timeout, sticky poller tuning, context propagators
//! - [`PollerOptions`] - backoff bounds, rate limits and thread count for a poller
//! - [`ContextPropagator`] - plugin carrying context across workflow/activity calls
//! - [`WorkerFactoryConfig`] - plain configuration structure (serde / env vars)
//!
//! All options follow the same lifecycle: obtain a builder (fresh or seeded
//! from existing options), set fields, then `build()`, which validates and
//! returns an owned snapshot or an [`OptionsError`] naming the bad field.
//!
//! ## Example
//!
//! ```
//! use flowline_worker::{PollerOptions, WorkerFactoryOptions};
//! use std::time::Duration;
//!
//! let sticky_poller = PollerOptions::builder()
//!     .with_poll_thread_count(2)
//!     .with_poll_backoff_initial_interval(Duration::from_millis(100))
//!     .with_poll_backoff_maximum_interval(Duration::from_secs(10))
//!     .build()?;
//!
//! let options = WorkerFactoryOptions::builder()
//!     .with_cache_maximum_size(1_000)
//!     .with_sticky_workflow_poller_options(sticky_poller)
//!     .build()?;
//!
//! assert_eq!(options.sticky_workflow_poller_options().poll_thread_count(), 2);
//! # Ok::<(), flowline_worker::OptionsError>(())
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod poller;
pub mod propagation;

// Re-export key types at crate root
pub use config::WorkerFactoryConfig;
pub use error::OptionsError;
pub use factory::{
    WorkerFactoryOptions, WorkerFactoryOptionsBuilder, DEFAULT_CACHE_MAXIMUM_SIZE,
    DEFAULT_MAX_WORKFLOW_THREAD_COUNT, DEFAULT_STICKY_DECISION_SCHEDULE_TO_START_TIMEOUT_SECS,
};
pub use poller::{PollerOptions, PollerOptionsBuilder};
pub use propagation::{ContextPropagator, Header, SharedPropagator};
