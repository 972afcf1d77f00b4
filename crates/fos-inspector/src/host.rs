//! Host collaborators
//!
//! The inspector never owns the application. It reaches it through two
//! seams: [`Introspect`] (the framework's introspection facility) and
//! [`MutationSource`] (the platform's mutation notifications).

use fos_dom::{DomTree, MutationObserverInit, MutationRecord, MutationType, NodeId, ObserverId};
use serde_json::{Map, Value};

use crate::Result;

/// Live component handle.
///
/// Only meaningful while the host it came from is borrowed; it is a proof
/// that `probe` accepted the native handle, not an owned component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentNode(NodeId);

impl ComponentNode {
    pub fn new(native: NodeId) -> Self {
        Self(native)
    }

    /// Native rendering-surface handle
    pub fn native(self) -> NodeId {
        self.0
    }
}

/// Framework introspection facility.
///
/// Treated as side-effect free. Optional facets default to "absent".
pub trait Introspect {
    /// Native rendering surface
    fn surface(&self) -> &DomTree;

    /// Resolve the component rendered at `handle`
    fn probe(&self, handle: NodeId) -> Result<ComponentNode>;

    /// Ordered live component children
    fn children(&self, node: ComponentNode) -> Result<Vec<ComponentNode>>;

    /// Constructor / type name
    fn type_name(&self, node: ComponentNode) -> Result<&str>;

    /// Live state object
    fn state(&self, node: ComponentNode) -> Result<&Map<String, Value>>;

    /// Bound inputs
    fn inputs(&self, _node: ComponentNode) -> Result<Map<String, Value>> {
        Ok(Map::new())
    }

    /// Declared outputs
    fn outputs(&self, _node: ComponentNode) -> Result<Map<String, Value>> {
        Ok(Map::new())
    }

    /// Time of the last change-detection tick touching this component
    fn last_tick_time(&self, _node: ComponentNode) -> Option<f64> {
        None
    }
}

/// Raw mutation kind as delivered by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawMutationKind {
    Attribute,
    Insert,
    Remove,
    /// Anything else, e.g. character data
    Other,
}

/// One raw notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMutation {
    pub kind: RawMutationKind,
    /// Affected node: the mutated element, or the inserted/removed node
    pub target: NodeId,
}

impl RawMutation {
    pub fn new(kind: RawMutationKind, target: NodeId) -> Self {
        Self { kind, target }
    }

    /// Insertions and removals move positional identities
    pub fn is_structural(&self) -> bool {
        matches!(self.kind, RawMutationKind::Insert | RawMutationKind::Remove)
    }
}

/// Part of the surface a subscription covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watch {
    /// Every mutation in the subtree rooted at the node
    Subtree(NodeId),
    /// Insertions and removals of the node's direct children only
    Children(NodeId),
}

impl Watch {
    pub fn node(self) -> NodeId {
        match self {
            Watch::Subtree(node) | Watch::Children(node) => node,
        }
    }

    fn options(self) -> MutationObserverInit {
        match self {
            Watch::Subtree(_) => MutationObserverInit {
                attribute_old_value: false,
                ..MutationObserverInit::all()
            },
            Watch::Children(_) => MutationObserverInit {
                child_list: true,
                ..MutationObserverInit::default()
            },
        }
    }
}

/// Active subscription token
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription(u64);

impl Subscription {
    pub fn new(token: u64) -> Self {
        Self(token)
    }

    pub fn token(&self) -> u64 {
        self.0
    }
}

/// Platform mutation notifications
pub trait MutationSource {
    /// Start watching `targets`
    fn subscribe(&mut self, targets: &[Watch]) -> Result<Subscription>;

    /// Extend a live subscription to more targets
    fn watch(&mut self, subscription: &Subscription, targets: &[Watch]) -> Result<()>;

    /// Stop watching; pending notifications are discarded
    fn unsubscribe(&mut self, subscription: Subscription);

    /// Next batch, in delivery order. Empty when nothing happened.
    fn take_batch(&mut self, subscription: &Subscription) -> Vec<RawMutation>;
}

/// Flatten platform records into raw mutations, keeping delivery order.
/// Within one child-list record, insertions come before removals.
pub fn flatten_records(records: Vec<MutationRecord>) -> Vec<RawMutation> {
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        match record.mutation_type {
            MutationType::Attributes => {
                out.push(RawMutation::new(RawMutationKind::Attribute, record.target));
            }
            MutationType::ChildList => {
                out.extend(record.added_nodes.into_iter().map(|n| RawMutation::new(RawMutationKind::Insert, n)));
                out.extend(record.removed_nodes.into_iter().map(|n| RawMutation::new(RawMutationKind::Remove, n)));
            }
            MutationType::CharacterData => {
                out.push(RawMutation::new(RawMutationKind::Other, record.target));
            }
        }
    }
    out
}

impl MutationSource for DomTree {
    fn subscribe(&mut self, targets: &[Watch]) -> Result<Subscription> {
        let observer = self.create_observer();
        let subscription = Subscription::new(observer.raw());
        if let Err(e) = self.watch(&subscription, targets) {
            self.disconnect(observer);
            return Err(e);
        }
        Ok(subscription)
    }

    fn watch(&mut self, subscription: &Subscription, targets: &[Watch]) -> Result<()> {
        let observer = ObserverId::from_raw(subscription.token());
        for &target in targets {
            self.observe(observer, target.node(), target.options())
                .map_err(|e| crate::InspectorError::accessor(target.node(), e.to_string()))?;
        }
        Ok(())
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        self.disconnect(ObserverId::from_raw(subscription.token()));
    }

    fn take_batch(&mut self, subscription: &Subscription) -> Vec<RawMutation> {
        flatten_records(self.take_records(ObserverId::from_raw(subscription.token())))
    }
}
