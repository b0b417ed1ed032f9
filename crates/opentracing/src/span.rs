//! Span operation types
//!
//! Every span emitted by the tracing interceptors belongs to one of these
//! categories. A category carries the default prefix of its span names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownSpanOperationType;

/// Category of a traced operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanOperationType {
    /// Client starting a workflow
    StartWorkflow,
    /// Client signalling a workflow, starting it if needed
    SignalWithStartWorkflow,
    /// Worker executing a workflow
    RunWorkflow,
    /// Workflow starting a child workflow
    StartChildWorkflow,
    /// Workflow scheduling an activity
    StartActivity,
    /// Worker executing an activity
    RunActivity,
}

impl SpanOperationType {
    pub const ALL: [SpanOperationType; 6] = [
        SpanOperationType::StartWorkflow,
        SpanOperationType::SignalWithStartWorkflow,
        SpanOperationType::RunWorkflow,
        SpanOperationType::StartChildWorkflow,
        SpanOperationType::StartActivity,
        SpanOperationType::RunActivity,
    ];

    /// Built-in span name prefix
    pub const fn default_prefix(self) -> &'static str {
        match self {
            Self::StartWorkflow => "StartWorkflow",
            Self::SignalWithStartWorkflow => "SignalWithStartWorkflow",
            Self::RunWorkflow => "RunWorkflow",
            Self::StartChildWorkflow => "StartChildWorkflow",
            Self::StartActivity => "StartActivity",
            Self::RunActivity => "RunActivity",
        }
    }

    /// Snake-case name, as used in serialized configuration
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartWorkflow => "start_workflow",
            Self::SignalWithStartWorkflow => "signal_with_start_workflow",
            Self::RunWorkflow => "run_workflow",
            Self::StartChildWorkflow => "start_child_workflow",
            Self::StartActivity => "start_activity",
            Self::RunActivity => "run_activity",
        }
    }
}

impl fmt::Display for SpanOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_prefix())
    }
}

impl FromStr for SpanOperationType {
    type Err = UnknownSpanOperationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownSpanOperationType(s.to_string()))
    }
}
