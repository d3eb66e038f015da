//! Metric events describing engine activity, exposed to the CLI and to
//! in-process subscribers.

use serde::{Deserialize, Serialize};

use crate::capability::InterfaceId;

/// Engine lifecycle stages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Created,
    Initialized,
    ReleaseRequested,
    Released,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    /// A typed engine method completed. `code` is `0` or a negated error code.
    ApiCall {
        api: String,
        code: i32,
    },
    ParameterChanged {
        key: String,
    },
    CapabilityQueried {
        interface: InterfaceId,
        granted: bool,
    },
    Lifecycle {
        phase: LifecyclePhase,
        timestamp_ms: u64,
    },
    Error {
        code: i32,
        context: String,
    },
}
