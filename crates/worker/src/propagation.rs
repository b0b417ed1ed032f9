//! Context propagation plugins
//!
//! A propagator carries caller context (tenant, request id, trace baggage, ...)
//! across workflow and activity boundaries by serializing it into a header on
//! the way out and restoring it on the way in. The options in this crate only
//! store propagators; workers and clients call them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Serialized context carried alongside a workflow or activity invocation
pub type Header = HashMap<String, Value>;

/// Plugin carrying context across workflow/activity boundaries
///
/// Implementations must be thread-safe: one propagator instance is shared by
/// every worker created from the same factory.
pub trait ContextPropagator: Send + Sync {
    /// Unique name, used as a key when several propagators write one header
    fn name(&self) -> &str;

    /// Turn a context value into header entries
    fn serialize_context(&self, context: &Value) -> Header;

    /// Rebuild a context value from header entries
    fn deserialize_context(&self, header: &Header) -> Value;

    /// Context active on the calling thread
    fn current_context(&self) -> Value;

    /// Install `context` as the active context on the calling thread
    fn set_current_context(&self, context: Value);
}

impl fmt::Debug for dyn ContextPropagator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextPropagator")
            .field("name", &self.name())
            .finish()
    }
}

/// Shared handle to a propagator
pub type SharedPropagator = Arc<dyn ContextPropagator>;
