//! Framework adapters
//!
//! An adapter hooks into the live application and turns platform mutation
//! notifications into classified [`AdapterEvent`]s.
//!
//! It works in two phases:
//! 1. Setup: find every root component and subscribe to the platform's
//!    mutation notifications, then walk each tree once and announce it
//!    (`Root` for the entry, `Add` for every descendant).
//! 2. Tracking: every pumped batch is classified in delivery order into
//!    `Change`, `Root`/`Add` or `Remove` events.
//!
//! Identities are read when a batch is classified, after all of its
//! mutations happened. With a single insertion or removal in the batch
//! those are the positions the events need. With more, positions read
//! late can point at siblings that moved, so the batch is followed by a
//! re-walk of every root that restates the whole tree.
//!
//! Lifecycle: `Uninitialized → Observing → Stopped`. `cleanup` is valid in
//! every state and is the only way out.

use fos_dom::{DomTree, NodeId};
use smol::channel::TrySendError;

use crate::config::{InspectorConfig, MarkerConfig, ObserveScope};
use crate::events::{AdapterEvent, EventKind, EventSender, Extent};
use crate::host::{Introspect, MutationSource, RawMutation, RawMutationKind, Subscription, Watch};
use crate::identity::{identity_of, is_root_marker, marker_of};
use crate::snapshot::{snapshot, ComponentSnapshot};
use crate::walker::walk;
use crate::{InspectorError, Result};

/// Newest framework release still wired through the debug element listener
const DEBUG_ELEMENT_LAST_ALPHA: u32 = 40;

/// Adapter lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Uninitialized,
    Observing,
    Stopped,
}

/// Supported framework generations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    /// Component host elements carry positional markers written by the
    /// framework's debug element view listener
    DebugElement,
}

impl AdapterKind {
    /// Pick the adapter for a framework version string
    pub fn detect(version: &str) -> Result<AdapterKind> {
        let unsupported = || InspectorError::UnsupportedFramework(version.to_string());

        let alpha = version.trim()
            .strip_prefix("2.0.0-alpha.")
            .ok_or_else(unsupported)?
            .parse::<u32>()
            .map_err(|_| unsupported())?;

        if alpha <= DEBUG_ELEMENT_LAST_ALPHA {
            Ok(AdapterKind::DebugElement)
        } else {
            Err(unsupported())
        }
    }
}

/// Adapter selected once at startup
#[derive(Debug)]
pub enum FrameworkAdapter {
    DebugElement(DebugElementAdapter),
}

impl FrameworkAdapter {
    pub fn new(kind: AdapterKind, config: InspectorConfig, sender: EventSender) -> Self {
        match kind {
            AdapterKind::DebugElement => Self::DebugElement(DebugElementAdapter::new(config, sender)),
        }
    }

    /// Detect the framework version and build the matching adapter
    pub fn detect(version: &str, config: InspectorConfig, sender: EventSender) -> Result<Self> {
        let kind = AdapterKind::detect(version)?;
        tracing::info!(version, ?kind, "framework adapter selected");
        Ok(Self::new(kind, config, sender))
    }

    pub fn kind(&self) -> AdapterKind {
        match self {
            Self::DebugElement(_) => AdapterKind::DebugElement,
        }
    }

    pub fn state(&self) -> AdapterState {
        match self {
            Self::DebugElement(a) => a.state(),
        }
    }

    pub fn setup<H: Introspect + MutationSource>(&mut self, host: &mut H) -> Result<usize> {
        match self {
            Self::DebugElement(a) => a.setup(host),
        }
    }

    pub fn pump<H: Introspect + MutationSource>(&mut self, host: &mut H) -> usize {
        match self {
            Self::DebugElement(a) => a.pump(host),
        }
    }

    pub fn handle_batch<H: Introspect + ?Sized>(&mut self, host: &H, batch: Vec<RawMutation>) -> usize {
        match self {
            Self::DebugElement(a) => a.handle_batch(host, batch),
        }
    }

    pub fn rescan<H: Introspect + ?Sized>(&mut self, host: &H) -> Result<usize> {
        match self {
            Self::DebugElement(a) => a.rescan(host),
        }
    }

    pub fn cleanup<H: MutationSource>(&mut self, host: &mut H) {
        match self {
            Self::DebugElement(a) => a.cleanup(host),
        }
    }

    pub fn serialize_component<H: Introspect + ?Sized>(
        &self,
        host: &H,
        node: NodeId,
        kind: EventKind,
    ) -> Result<ComponentSnapshot> {
        match self {
            Self::DebugElement(a) => a.serialize_component(host, node, kind),
        }
    }
}

/// Adapter for frameworks that mark component host elements with a
/// positional id attribute
#[derive(Debug)]
pub struct DebugElementAdapter {
    config: InspectorConfig,
    state: AdapterState,
    sender: Option<EventSender>,
    subscription: Option<Subscription>,
    /// Roots inserted since the last pump, not yet covered by the subscription
    unwatched: Vec<NodeId>,
}

impl DebugElementAdapter {
    pub fn new(config: InspectorConfig, sender: EventSender) -> Self {
        Self {
            config,
            state: AdapterState::Uninitialized,
            sender: Some(sender),
            subscription: None,
            unwatched: Vec::new(),
        }
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Announce the current tree and start observing
    pub fn setup<H: Introspect + MutationSource>(&mut self, host: &mut H) -> Result<usize> {
        if self.state != AdapterState::Uninitialized {
            return Err(InspectorError::InvalidLifecycle { action: "setup", state: self.state });
        }

        let roots = find_roots(host.surface(), &self.config.marker);
        let targets = watch_targets(host.surface(), &roots, self.config.observe_scope);
        self.subscription = Some(host.subscribe(&targets)?);
        self.state = AdapterState::Observing;

        let mut emitted = 0;
        for &root in &roots {
            let events = tree_events(&*host, root, EventKind::Root, &self.config.marker);
            emitted += self.emit_all(events);
        }

        tracing::info!(roots = roots.len(), events = emitted, scope = ?self.config.observe_scope, "adapter observing");
        Ok(emitted)
    }

    /// Drain the next batch from the mutation source and classify it
    pub fn pump<H: Introspect + MutationSource>(&mut self, host: &mut H) -> usize {
        let batch = match (&self.state, &self.subscription) {
            (AdapterState::Observing, Some(subscription)) => host.take_batch(subscription),
            _ => return 0,
        };
        if batch.is_empty() {
            return 0;
        }
        let emitted = self.handle_batch(&*host, batch);
        self.watch_new_roots(host);
        emitted
    }

    /// Classify and emit one batch, in delivery order
    pub fn handle_batch<H: Introspect + ?Sized>(&mut self, host: &H, batch: Vec<RawMutation>) -> usize {
        if self.state != AdapterState::Observing {
            tracing::trace!(dropped = batch.len(), state = ?self.state, "batch dropped");
            return 0;
        }

        let structural = batch.iter().filter(|m| m.is_structural()).count();
        let mut emitted = 0;
        for mutation in batch {
            let events = self.classify(host, mutation);
            if self.config.observe_scope == ObserveScope::Roots {
                self.unwatched.extend(
                    events.iter()
                        .filter(|e| e.kind == EventKind::Root && host.surface().is_connected(e.node))
                        .map(|e| e.node),
                );
            }
            emitted += self.emit_all(events);
        }

        if structural > 1 {
            let events = self.walk_roots(host);
            tracing::debug!(structural, events = events.len(), "positions re-derived after batch");
            emitted += self.emit_all(events);
        }
        emitted
    }

    /// Classify a single raw mutation
    pub fn classify<H: Introspect + ?Sized>(&self, host: &H, mutation: RawMutation) -> Vec<AdapterEvent> {
        let surface = host.surface();
        let marker = &self.config.marker;
        let target = mutation.target;

        match mutation.kind {
            RawMutationKind::Attribute => {
                let owner = owning_component(surface, target, marker).unwrap_or(target);
                vec![AdapterEvent::change(owner, identity_of(surface, owner, marker).ok())]
            }
            RawMutationKind::Insert => {
                if !surface.is_element(target) {
                    return Vec::new();
                }
                let entries = component_entries(surface, target, marker);
                if entries.is_empty() {
                    return vec![AdapterEvent::add(target, None)];
                }
                entries.into_iter()
                    .flat_map(|entry| {
                        let kind = if is_root_marker(surface, entry, marker) {
                            EventKind::Root
                        } else {
                            EventKind::Add
                        };
                        tree_events(host, entry, kind, marker)
                    })
                    .collect()
            }
            RawMutationKind::Remove => {
                if !surface.is_element(target) {
                    return Vec::new();
                }
                let entries = component_entries(surface, target, marker);
                if entries.is_empty() {
                    tracing::trace!(node = %target, "removed element held no component");
                }
                entries.into_iter()
                    .map(|entry| AdapterEvent::remove(entry, identity_of(surface, entry, marker).ok()))
                    .collect()
            }
            RawMutationKind::Other => {
                tracing::trace!(node = %target, error = %InspectorError::UnclassifiedMutation(target), "ignored");
                Vec::new()
            }
        }
    }

    /// Re-walk every current root, announcing it again
    pub fn rescan<H: Introspect + ?Sized>(&mut self, host: &H) -> Result<usize> {
        if self.state != AdapterState::Observing {
            return Err(InspectorError::InvalidLifecycle { action: "rescan", state: self.state });
        }
        let emitted = self.emit_all(self.walk_roots(host));
        tracing::debug!(events = emitted, "rescan");
        Ok(emitted)
    }

    /// Stop observing and close the event channel
    pub fn cleanup<H: MutationSource>(&mut self, host: &mut H) {
        if let Some(subscription) = self.subscription.take() {
            host.unsubscribe(subscription);
        }
        self.sender = None;
        self.unwatched.clear();
        if self.state != AdapterState::Stopped {
            tracing::info!(from = ?self.state, "adapter stopped");
        }
        self.state = AdapterState::Stopped;
    }

    pub fn serialize_component<H: Introspect + ?Sized>(
        &self,
        host: &H,
        node: NodeId,
        kind: EventKind,
    ) -> Result<ComponentSnapshot> {
        snapshot(host, node, kind, &self.config)
    }

    /// Announce every current root with its descendants
    fn walk_roots<H: Introspect + ?Sized>(&self, host: &H) -> Vec<AdapterEvent> {
        find_roots(host.surface(), &self.config.marker)
            .into_iter()
            .flat_map(|root| tree_events(host, root, EventKind::Root, &self.config.marker))
            .collect()
    }

    /// Extend the subscription over roots inserted since the last pump
    fn watch_new_roots<H: MutationSource>(&mut self, host: &mut H) {
        if self.unwatched.is_empty() {
            return;
        }
        let targets: Vec<Watch> = self.unwatched.drain(..).map(Watch::Subtree).collect();
        let Some(subscription) = &self.subscription else {
            return;
        };
        match host.watch(subscription, &targets) {
            Ok(()) => tracing::debug!(roots = targets.len(), "watching new roots"),
            Err(e) => tracing::warn!(error = %e, "new roots stay unobserved"),
        }
    }

    fn emit_all(&self, events: Vec<AdapterEvent>) -> usize {
        events.into_iter().filter(|event| self.emit(event.clone())).count()
    }

    fn emit(&self, event: AdapterEvent) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        tracing::debug!(kind = ?event.kind, id = %event.id_label(), node = %event.node, "emit");
        match sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(kind = ?event.kind, id = %event.id_label(), "event receiver dropped");
                false
            }
            Err(TrySendError::Full(event)) => {
                tracing::warn!(kind = ?event.kind, id = %event.id_label(), "event channel full");
                false
            }
        }
    }
}

/// Connected elements whose marker has a single segment, in document order
pub fn find_roots(surface: &DomTree, marker: &MarkerConfig) -> Vec<NodeId> {
    surface.descendants(surface.root())
        .into_iter()
        .filter(|&id| surface.is_element(id) && is_root_marker(surface, id, marker))
        .collect()
}

/// What a subscription covers for `roots`.
///
/// In `Roots` scope each root's parent is watched for child insertions and
/// removals only, so roots coming and going are classified too.
fn watch_targets(surface: &DomTree, roots: &[NodeId], scope: ObserveScope) -> Vec<Watch> {
    match scope {
        ObserveScope::Document => vec![Watch::Subtree(surface.root())],
        ObserveScope::Roots => {
            let mut parents: Vec<NodeId> = Vec::new();
            for parent in roots.iter().filter_map(|&root| surface.parent(root)) {
                if !parents.contains(&parent) && !roots.contains(&parent) {
                    parents.push(parent);
                }
            }
            // a registration on the same node replaces the earlier one, roots go last
            parents.into_iter()
                .map(Watch::Children)
                .chain(roots.iter().copied().map(Watch::Subtree))
                .collect()
        }
    }
}

/// Nearest marked element at or above `node`
fn owning_component(surface: &DomTree, node: NodeId, marker: &MarkerConfig) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(id) = current {
        if marker_of(surface, id, marker).is_some() {
            return Some(id);
        }
        current = surface.parent(id);
    }
    None
}

/// Topmost marked elements in the inclusive subtree of `node`
fn component_entries(surface: &DomTree, node: NodeId, marker: &MarkerConfig) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(id) = stack.pop() {
        if !surface.is_element(id) {
            continue;
        }
        if marker_of(surface, id, marker).is_some() {
            out.push(id);
            continue;
        }
        stack.extend(surface.child_ids(id).into_iter().rev());
    }
    out
}

/// Events for a component and its walked descendants
fn tree_events<H: Introspect + ?Sized>(
    host: &H,
    entry: NodeId,
    entry_kind: EventKind,
    marker: &MarkerConfig,
) -> Vec<AdapterEvent> {
    let surface = host.surface();
    let component = match host.probe(entry) {
        Ok(component) => component,
        Err(e) => {
            tracing::debug!(node = %entry, error = %e, "not a live component, announcing element only");
            return vec![AdapterEvent::new(entry_kind, entry, identity_of(surface, entry, marker).ok())];
        }
    };

    let entry_siblings = live_siblings(host, entry, marker);
    // live child counts along the current walk path, indexed by depth
    let mut counts: Vec<usize> = Vec::new();
    let mut events = Vec::new();
    walk(host, component, |visit| {
        let node = visit.node.native();
        counts.truncate(visit.depth);
        let siblings = if visit.is_entry() { entry_siblings } else { counts.last().copied() };
        let children = host.children(visit.node).map_or(0, |c| c.len());
        counts.push(children);

        let kind = if visit.is_entry() { entry_kind } else { EventKind::Add };
        let event = AdapterEvent::new(kind, node, identity_of(surface, node, marker).ok())
            .with_extent(Extent { siblings, children });
        events.push(event);
    });
    events
}

/// Live components sharing the entry's level: all roots, or the owning
/// component's children
fn live_siblings<H: Introspect + ?Sized>(host: &H, entry: NodeId, marker: &MarkerConfig) -> Option<usize> {
    let surface = host.surface();
    if is_root_marker(surface, entry, marker) {
        return Some(find_roots(surface, marker).len());
    }
    let parent = surface.parent(entry).and_then(|p| owning_component(surface, p, marker))?;
    host.probe(parent)
        .and_then(|component| host.children(component))
        .map(|children| children.len())
        .ok()
}
