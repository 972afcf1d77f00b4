//! Classified adapter events
//!
//! Events travel from the adapter to the controller over a caller-owned
//! `smol` channel. The channel is FIFO, so events are applied in the order
//! they were classified.

use fos_dom::NodeId;
use serde::Serialize;

use crate::identity::ComponentId;

/// Classified event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A root component appeared
    Root,
    /// A child component appeared
    Add,
    /// A component's state or attributes changed
    Change,
    /// A component left the tree
    Remove,
}

/// Uniform event carrying the affected live node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterEvent {
    pub kind: EventKind,
    /// Native handle of the affected component
    pub node: NodeId,
    /// Identity as seen at classification time, if it could be resolved
    pub id: Option<ComponentId>,
    /// Live counts seen by the walk that produced the event
    pub extent: Option<Extent>,
}

/// Live counts around a walked component.
///
/// The reconciler drops recorded slots past these counts, so a re-walk
/// also clears entries the live tree no longer has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    /// Components at this level under the same parent, or live roots
    pub siblings: Option<usize>,
    /// Live component children
    pub children: usize,
}

impl AdapterEvent {
    pub fn new(kind: EventKind, node: NodeId, id: Option<ComponentId>) -> Self {
        Self { kind, node, id, extent: None }
    }

    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn root(node: NodeId, id: Option<ComponentId>) -> Self {
        Self::new(EventKind::Root, node, id)
    }

    pub fn add(node: NodeId, id: Option<ComponentId>) -> Self {
        Self::new(EventKind::Add, node, id)
    }

    pub fn change(node: NodeId, id: Option<ComponentId>) -> Self {
        Self::new(EventKind::Change, node, id)
    }

    pub fn remove(node: NodeId, id: Option<ComponentId>) -> Self {
        Self::new(EventKind::Remove, node, id)
    }

    /// Identity rendered for logs, `?` when unresolved
    pub fn id_label(&self) -> String {
        self.id.as_ref().map_or_else(|| "?".to_string(), ToString::to_string)
    }
}

pub type EventSender = smol::channel::Sender<AdapterEvent>;
pub type EventReceiver = smol::channel::Receiver<AdapterEvent>;

/// Create the event channel shared by an adapter and its controller.
///
/// The adapter owns the sender; dropping it on cleanup closes the channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    smol::channel::unbounded()
}
