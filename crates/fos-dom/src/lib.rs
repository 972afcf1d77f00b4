//! fOS DOM - Document Object Model
//!
//! Arena-based DOM tree with built-in mutation observation.
//!
//! This is the native rendering surface observed by the inspector: every
//! structural, attribute and text mutation is queued as a [`MutationRecord`]
//! for the observers whose registration covers the mutated node.

mod node;
mod tree;
mod document;
mod observer;

pub use node::{Node, NodeData, ElementData, Attribute};
pub use tree::{DomTree, Children};
pub use document::Document;
pub use observer::{MutationObserver, MutationObserverInit, MutationRecord, MutationType, ObserverId};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this id points at a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Build an id from a raw arena index
    pub fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            f.write_str("#none")
        }
    }
}

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    /// Inserting a node into its own subtree (would create a cycle)
    #[error("Hierarchy request error: {child} cannot be inserted under {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Invalid node type for {0}")]
    InvalidNodeType(NodeId),
}
