//! Inspector errors
//!
//! Only lifecycle misuse, unsupported frameworks and configuration problems
//! reach callers. Everything else is recovered inside the notification
//! pipeline and reported through `tracing`.

use fos_dom::{DomError, NodeId};

use crate::adapter::AdapterState;
use crate::events::EventKind;

/// Inspector result
pub type Result<T> = std::result::Result<T, InspectorError>;

/// Inspector error
#[derive(Debug, thiserror::Error)]
pub enum InspectorError {
    /// The node carries no usable positional marker yet
    #[error("Identity unavailable for {node}: {reason}")]
    IdentityUnavailable { node: NodeId, reason: String },

    #[error("Unclassified mutation on {0}")]
    UnclassifiedMutation(NodeId),

    #[error("Model index out of range for {kind:?} at {id}: {reason}")]
    ModelIndexOutOfRange { kind: EventKind, id: String, reason: String },

    #[error("Framework accessor failed for {node}: {reason}")]
    FrameworkAccessorFailure { node: NodeId, reason: String },

    #[error("Cannot {action} while adapter is {state:?}")]
    InvalidLifecycle { action: &'static str, state: AdapterState },

    #[error("Unsupported framework version: {0}")]
    UnsupportedFramework(String),

    #[error("Transport failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl InspectorError {
    pub(crate) fn accessor(node: NodeId, reason: impl Into<String>) -> Self {
        Self::FrameworkAccessorFailure { node, reason: reason.into() }
    }

    pub(crate) fn no_identity(node: NodeId, reason: impl Into<String>) -> Self {
        Self::IdentityUnavailable { node, reason: reason.into() }
    }
}
