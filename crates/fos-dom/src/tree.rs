//! DOM Tree (arena-based allocation)
//!
//! Nodes are never freed: a removed node stays in the arena, detached, with
//! its attributes intact. Observers rely on this to inspect removed subtrees
//! after the fact.

use crate::observer::{MutationObserver, MutationObserverInit, MutationRecord, ObserverId};
use crate::{Attribute, DomError, DomResult, Node, NodeData, NodeId};

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    observers: Vec<MutationObserver>,
    next_observer: u64,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            observers: Vec::new(),
            next_observer: 1,
        }
    }

    /// Document node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(DomError::NotFound(id))
    }

    /// Number of nodes in the arena (attached or not)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content))
    }

    /// Create a detached comment
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(Node::comment(content))
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Parent of a node, if attached to one
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(|p| p.is_valid())
    }

    /// Iterate direct children as `(id, node)`
    pub fn children(&self, id: NodeId) -> Children<'_> {
        let next = self.get(id).map_or(NodeId::NONE, |n| n.first_child);
        Children { tree: self, next }
    }

    /// Ids of direct children
    pub fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).map(|(child, _)| child).collect()
    }

    /// Pre-order descendants of `id`, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.child_ids(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.child_ids(next).into_iter().rev());
        }
        out
    }

    /// True if `ancestor` is `node` or one of its ancestors
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = node;
        while current.is_valid() {
            if current == ancestor {
                return true;
            }
            current = match self.get(current) {
                Some(n) => n.parent,
                None => return false,
            };
        }
        false
    }

    /// True if the node is reachable from the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root(), id)
    }

    // ------------------------------------------------------------------
    // Element data
    // ------------------------------------------------------------------

    /// Tag name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_element().map(|e| e.tag.as_str())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    /// Get an attribute value
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?.as_element()?.get_attr(name)
    }

    /// All attributes of an element, in insertion order
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.get(id)
            .and_then(Node::as_element)
            .map_or(&[], |e| e.attrs.as_slice())
    }

    /// Set an attribute. Queues an attribute record unless the value is unchanged.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let element = self.node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType(id))?;
        if element.get_attr(name) == Some(value) {
            return Ok(());
        }
        let old = element.set_attr(name, value.to_string());
        self.queue(MutationRecord::attributes(id, name, old));
        Ok(())
    }

    /// Remove an attribute. Queues a record only if it existed.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<()> {
        let element = self.node_mut(id)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType(id))?;
        if let Some(old) = element.remove_attr(name) {
            self.queue(MutationRecord::attributes(id, name, Some(old)));
        }
        Ok(())
    }

    /// Text content of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_text()
    }

    /// Replace text content of a text node
    pub fn set_text(&mut self, id: NodeId, content: &str) -> DomResult<()> {
        let node = self.node_mut(id)?;
        let NodeData::Text(text) = &mut node.data else {
            return Err(DomError::InvalidNodeType(id));
        };
        if text == content {
            return Ok(());
        }
        let old = std::mem::replace(text, content.to_string());
        self.queue(MutationRecord::character_data(id, old));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Append `child` as last child of `parent`, moving it if attached elsewhere
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end when `None`)
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DomResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if child == NodeId::ROOT || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if reference == Some(child) {
            return Ok(());
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild { parent, child: reference });
            }
        }

        if let Some(old_parent) = self.parent(child) {
            self.remove_child(old_parent, child)?;
        }
        self.link(parent, child, reference);
        Ok(())
    }

    /// Create an element as the last child of `parent`, which must exist
    pub(crate) fn append_new_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let child = self.create_element(tag);
        self.link(parent, child, None);
        child
    }

    /// Splice a detached `child` in before `reference`, or last
    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let prev = match reference {
            Some(r) => self.nodes[r.index()].prev_sibling,
            None => self.nodes[parent.index()].last_child,
        };
        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = reference.unwrap_or(NodeId::NONE);
        }
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        match reference {
            Some(r) => self.nodes[r.index()].prev_sibling = child,
            None => self.nodes[parent.index()].last_child = child,
        }

        self.queue(MutationRecord::child_list(parent, vec![child], Vec::new()));
    }

    /// Detach `child` from `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if self.node(child)?.parent != parent {
            return Err(DomError::NotAChild { parent, child });
        }

        let (prev, next) = {
            let node = &mut self.nodes[child.index()];
            let links = (node.prev_sibling, node.next_sibling);
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
            links
        };
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }

        self.queue(MutationRecord::child_list(parent, Vec::new(), vec![child]));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Register a new observer with no observations
    pub fn create_observer(&mut self) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push(MutationObserver::new(id));
        id
    }

    /// Start observing `target` with `options`
    pub fn observe(&mut self, observer: ObserverId, target: NodeId, options: MutationObserverInit) -> DomResult<()> {
        self.node(target)?;
        if let Some(o) = self.observers.iter_mut().find(|o| o.id() == observer) {
            o.observe(target, options);
        }
        Ok(())
    }

    /// Drop all observations and pending records, then forget the observer
    pub fn disconnect(&mut self, observer: ObserverId) {
        if let Some(o) = self.observers.iter_mut().find(|o| o.id() == observer) {
            o.disconnect();
        }
        self.observers.retain(|o| o.id() != observer);
    }

    /// Drain pending records of an observer, in mutation order
    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers.iter_mut()
            .find(|o| o.id() == observer)
            .map(MutationObserver::take_records)
            .unwrap_or_default()
    }

    /// Look up an observer
    pub fn observer(&self, observer: ObserverId) -> Option<&MutationObserver> {
        self.observers.iter().find(|o| o.id() == observer)
    }

    fn queue(&mut self, record: MutationRecord) {
        if self.observers.is_empty() {
            return;
        }
        let interested: Vec<usize> = self.observers.iter()
            .enumerate()
            .filter(|(_, o)| o.wants(&record, |target| self.contains(target, record.target)))
            .map(|(i, _)| i)
            .collect();

        tracing::trace!(target = %record.target, kind = ?record.mutation_type, observers = interested.len(), "queue mutation");

        for i in interested {
            let keep_old = self.observers[i].wants_old_values();
            self.observers[i].push_record(record.clone(), keep_old);
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the direct children of a node
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.next.is_valid() {
            return None;
        }
        let id = self.next;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}
