//! In-process component host
//!
//! A small component framework over a [`fos_dom::Document`]. It behaves like
//! the framework builds the inspector attaches to: every component host
//! element carries a positional marker, state writes are reflected as
//! `ng-reflect-*` attributes, and unmounting a component renumbers the
//! markers of the siblings after it.
//!
//! Used by the test suites and the `fos-inspect` demo.

use std::collections::HashMap;

use fos_dom::{Document, DomTree, NodeId};
use serde_json::{Map, Value};

use crate::config::MarkerConfig;
use crate::host::{ComponentNode, Introspect, MutationSource, RawMutation, Subscription, Watch};
use crate::identity::{identity_of, ComponentId};
use crate::{InspectorError, Result};

/// Attribute prefix used to reflect state writes onto the host element
pub const REFLECT_PREFIX: &str = "ng-reflect-";

/// Declarative component tree
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSpec {
    type_name: String,
    tag: Option<String>,
    state: Map<String, Value>,
    inputs: Map<String, Value>,
    outputs: Map<String, Value>,
    children: Vec<ComponentSpec>,
}

impl ComponentSpec {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            tag: None,
            state: Map::new(),
            inputs: Map::new(),
            outputs: Map::new(),
            children: Vec::new(),
        }
    }

    /// Host element tag; derived from the type name when unset
    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    pub fn state(mut self, key: &str, value: Value) -> Self {
        self.state.insert(key.to_string(), value);
        self
    }

    pub fn input(mut self, key: &str, value: Value) -> Self {
        self.inputs.insert(key.to_string(), value);
        self
    }

    pub fn output(mut self, key: &str, value: Value) -> Self {
        self.outputs.insert(key.to_string(), value);
        self
    }

    pub fn child(mut self, child: ComponentSpec) -> Self {
        self.children.push(child);
        self
    }

    fn host_tag(&self) -> String {
        self.tag.clone().unwrap_or_else(|| kebab_case(&self.type_name))
    }
}

/// Live component record
#[derive(Debug)]
struct Component {
    type_name: String,
    state: Map<String, Value>,
    inputs: Map<String, Value>,
    outputs: Map<String, Value>,
    tick_time: Option<f64>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Sandbox application
#[derive(Debug)]
pub struct SandboxApp {
    document: Document,
    marker: MarkerConfig,
    components: HashMap<NodeId, Component>,
    roots: Vec<NodeId>,
}

impl SandboxApp {
    pub fn new() -> Self {
        Self::with_marker(MarkerConfig::default())
    }

    /// Use a custom positional marker convention
    pub fn with_marker(marker: MarkerConfig) -> Self {
        Self {
            document: Document::new("sandbox://app"),
            marker,
            components: HashMap::new(),
            roots: Vec::new(),
        }
    }

    pub fn body(&self) -> NodeId {
        self.document.body()
    }

    pub fn dom(&self) -> &DomTree {
        self.document.tree()
    }

    pub fn dom_mut(&mut self) -> &mut DomTree {
        self.document.tree_mut()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Root component host elements, in root order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Child component host elements, in order
    pub fn component_children(&self, node: NodeId) -> Vec<NodeId> {
        self.components.get(&node).map(|c| c.children.clone()).unwrap_or_default()
    }

    pub fn is_component(&self, node: NodeId) -> bool {
        self.components.contains_key(&node)
    }

    /// Bootstrap a new root application at the end of `<body>`
    pub fn bootstrap(&mut self, spec: ComponentSpec) -> Result<NodeId> {
        let id = ComponentId::root(self.roots.len());
        let host = self.build(&spec, &id, None)?;
        let body = self.body();
        self.dom_mut().append_child(body, host)?;
        self.roots.push(host);

        tracing::debug!(%id, node = %host, name = %spec.type_name, "bootstrapped");
        Ok(host)
    }

    /// Mount `spec` as the last child component of `parent`
    pub fn mount(&mut self, parent: NodeId, spec: ComponentSpec) -> Result<NodeId> {
        let index = self.component(parent)?.children.len();
        let parent_id = identity_of(self.dom(), parent, &self.marker)?;
        let id = parent_id.child(index);

        let host = self.build(&spec, &id, Some(parent))?;
        self.dom_mut().append_child(parent, host)?;
        self.component_mut(parent)?.children.push(host);

        tracing::debug!(%id, node = %host, name = %spec.type_name, "mounted");
        Ok(host)
    }

    /// Destroy a component and renumber the siblings after it
    pub fn unmount(&mut self, node: NodeId) -> Result<()> {
        let parent = self.component(node)?.parent;
        let dom_parent = self.dom()
            .parent(node)
            .ok_or_else(|| InspectorError::accessor(node, "component is detached"))?;

        self.dom_mut().remove_child(dom_parent, node)?;
        self.forget(node);

        match parent {
            Some(parent) => {
                let parent_id = identity_of(self.dom(), parent, &self.marker)?;
                let siblings = {
                    let record = self.component_mut(parent)?;
                    record.children.retain(|&c| c != node);
                    record.children.clone()
                };
                for (index, sibling) in siblings.into_iter().enumerate() {
                    self.renumber(sibling, parent_id.child(index))?;
                }
            }
            None => {
                self.roots.retain(|&r| r != node);
                for (index, root) in self.roots.clone().into_iter().enumerate() {
                    self.renumber(root, ComponentId::root(index))?;
                }
            }
        }

        tracing::debug!(node = %node, "unmounted");
        Ok(())
    }

    /// Write one state key and reflect it on the host element
    pub fn set_state(&mut self, node: NodeId, key: &str, value: Value) -> Result<()> {
        let reflected = match &value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.component_mut(node)?.state.insert(key.to_string(), value);
        self.dom_mut().set_attribute(node, &format!("{}{}", REFLECT_PREFIX, key), &reflected)?;
        Ok(())
    }

    /// Set the text content rendered inside `element`; returns the text node
    pub fn set_text(&mut self, element: NodeId, text: &str) -> Result<NodeId> {
        let existing = self.dom()
            .child_ids(element)
            .into_iter()
            .find(|&c| self.dom().text(c).is_some());

        match existing {
            Some(text_node) => {
                self.dom_mut().set_text(text_node, text)?;
                Ok(text_node)
            }
            None => {
                let text_node = self.dom_mut().create_text(text);
                self.dom_mut().append_child(element, text_node)?;
                Ok(text_node)
            }
        }
    }

    /// Append a plain element that is not a component
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId> {
        let el = self.dom_mut().create_element(tag);
        self.dom_mut().append_child(parent, el)?;
        Ok(el)
    }

    /// Record a change detection tick on a component
    pub fn set_tick_time(&mut self, node: NodeId, millis: f64) {
        if let Some(component) = self.components.get_mut(&node) {
            component.tick_time = Some(millis);
        }
    }

    /// Live `(position, type name)` pairs in pre-order
    pub fn shape(&self) -> Vec<(ComponentId, String)> {
        let mut out = Vec::new();
        let mut stack: Vec<(ComponentId, NodeId)> = self.roots.iter()
            .enumerate()
            .rev()
            .map(|(index, &node)| (ComponentId::root(index), node))
            .collect();

        while let Some((id, node)) = stack.pop() {
            let Some(component) = self.components.get(&node) else {
                continue;
            };
            out.push((id.clone(), component.type_name.clone()));
            stack.extend(
                component.children.iter()
                    .enumerate()
                    .rev()
                    .map(|(index, &child)| (id.child(index), child)),
            );
        }
        out
    }

    /// Build a detached host element tree for `spec`
    fn build(&mut self, spec: &ComponentSpec, id: &ComponentId, parent: Option<NodeId>) -> Result<NodeId> {
        let host = self.dom_mut().create_element(&spec.host_tag());
        let marker = self.marker_text(id);
        let attribute = self.marker.attribute.clone();
        self.dom_mut().set_attribute(host, &attribute, &marker)?;

        let mut children = Vec::with_capacity(spec.children.len());
        for (index, child) in spec.children.iter().enumerate() {
            let child_host = self.build(child, &id.child(index), Some(host))?;
            self.dom_mut().append_child(host, child_host)?;
            children.push(child_host);
        }

        self.components.insert(host, Component {
            type_name: spec.type_name.clone(),
            state: spec.state.clone(),
            inputs: spec.inputs.clone(),
            outputs: spec.outputs.clone(),
            tick_time: None,
            parent,
            children,
        });
        Ok(host)
    }

    /// Rewrite markers of `node` and its component descendants
    fn renumber(&mut self, node: NodeId, id: ComponentId) -> Result<()> {
        let mut stack = vec![(node, id)];
        while let Some((node, id)) = stack.pop() {
            let marker = self.marker_text(&id);
            let attribute = self.marker.attribute.clone();
            self.dom_mut().set_attribute(node, &attribute, &marker)?;

            let children = self.component_children(node);
            stack.extend(
                children.into_iter()
                    .enumerate()
                    .rev()
                    .map(|(index, child)| (child, id.child(index))),
            );
        }
        Ok(())
    }

    /// Drop the registry entries of a destroyed subtree
    fn forget(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            if let Some(component) = self.components.remove(&next) {
                stack.extend(component.children);
            }
        }
    }

    fn marker_text(&self, id: &ComponentId) -> String {
        id.segments()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(&self.marker.separator.to_string())
    }

    fn component(&self, node: NodeId) -> Result<&Component> {
        self.components
            .get(&node)
            .ok_or_else(|| InspectorError::accessor(node, "no component at node"))
    }

    fn component_mut(&mut self, node: NodeId) -> Result<&mut Component> {
        self.components
            .get_mut(&node)
            .ok_or_else(|| InspectorError::accessor(node, "no component at node"))
    }
}

impl Default for SandboxApp {
    fn default() -> Self {
        Self::new()
    }
}

impl Introspect for SandboxApp {
    fn surface(&self) -> &DomTree {
        self.document.tree()
    }

    fn probe(&self, handle: NodeId) -> Result<ComponentNode> {
        self.component(handle).map(|_| ComponentNode::new(handle))
    }

    fn children(&self, node: ComponentNode) -> Result<Vec<ComponentNode>> {
        let component = self.component(node.native())?;
        Ok(component.children.iter().copied().map(ComponentNode::new).collect())
    }

    fn type_name(&self, node: ComponentNode) -> Result<&str> {
        Ok(self.component(node.native())?.type_name.as_str())
    }

    fn state(&self, node: ComponentNode) -> Result<&Map<String, Value>> {
        Ok(&self.component(node.native())?.state)
    }

    fn inputs(&self, node: ComponentNode) -> Result<Map<String, Value>> {
        Ok(self.component(node.native())?.inputs.clone())
    }

    fn outputs(&self, node: ComponentNode) -> Result<Map<String, Value>> {
        Ok(self.component(node.native())?.outputs.clone())
    }

    fn last_tick_time(&self, node: ComponentNode) -> Option<f64> {
        self.components.get(&node.native())?.tick_time
    }
}

impl MutationSource for SandboxApp {
    fn subscribe(&mut self, targets: &[Watch]) -> Result<Subscription> {
        self.document.tree_mut().subscribe(targets)
    }

    fn watch(&mut self, subscription: &Subscription, targets: &[Watch]) -> Result<()> {
        self.document.tree_mut().watch(subscription, targets)
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        self.document.tree_mut().unsubscribe(subscription);
    }

    fn take_batch(&mut self, subscription: &Subscription) -> Vec<RawMutation> {
        self.document.tree_mut().take_batch(subscription)
    }
}

/// `TodoList` → `todo-list`
fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
