//! Component serialization
//!
//! Turns a live component into an immutable [`ComponentSnapshot`]. Identity
//! is the only hard requirement; every other facet degrades to an empty
//! value when the framework cannot provide it, so a partially readable
//! component still shows up in the inspector.

use fos_dom::NodeId;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::InspectorConfig;
use crate::events::EventKind;
use crate::host::{ComponentNode, Introspect};
use crate::identity::{identity_of, ComponentId};
use crate::Result;

/// Placeholder name when the type descriptor cannot be read
pub const UNKNOWN_NAME: &str = "<unknown>";

/// Immutable serialized view of one component
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSnapshot {
    id: ComponentId,
    name: String,
    state: Map<String, Value>,
    inputs: Map<String, Value>,
    outputs: Map<String, Value>,
    properties: Map<String, Value>,
    last_tick_time: f64,
    meta: SnapshotMeta,
}

/// Snapshot metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotMeta {
    /// Event that produced the snapshot
    pub event: EventKind,
}

impl ComponentSnapshot {
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shallow copy of the component's own state, in insertion order
    pub fn state(&self) -> &Map<String, Value> {
        &self.state
    }

    pub fn inputs(&self) -> &Map<String, Value> {
        &self.inputs
    }

    pub fn outputs(&self) -> &Map<String, Value> {
        &self.outputs
    }

    /// Host element attributes minus the reserved ones
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn last_tick_time(&self) -> f64 {
        self.last_tick_time
    }

    pub fn event(&self) -> EventKind {
        self.meta.event
    }
}

/// Snapshot the component rendered at `handle`.
///
/// Fails only with `IdentityUnavailable`.
pub fn snapshot<H: Introspect + ?Sized>(
    host: &H,
    handle: NodeId,
    kind: EventKind,
    config: &InspectorConfig,
) -> Result<ComponentSnapshot> {
    let surface = host.surface();
    let id = identity_of(surface, handle, &config.marker)?;

    let properties = surface.attributes(handle)
        .iter()
        .filter(|attr| !config.is_reserved_attribute(&attr.name))
        .map(|attr| (attr.name.clone(), Value::String(attr.value.clone())))
        .collect();

    let component = match host.probe(handle) {
        Ok(component) => component,
        Err(e) => {
            tracing::debug!(node = %handle, %id, error = %e, "component not resolvable, snapshot degraded");
            return Ok(ComponentSnapshot {
                id,
                name: UNKNOWN_NAME.to_string(),
                state: Map::new(),
                inputs: Map::new(),
                outputs: Map::new(),
                properties,
                last_tick_time: 0.0,
                meta: SnapshotMeta { event: kind },
            });
        }
    };

    let name = match host.type_name(component) {
        Ok(name) => name.to_string(),
        Err(e) => {
            tracing::debug!(node = %handle, error = %e, "type name unavailable");
            UNKNOWN_NAME.to_string()
        }
    };

    let state = match host.state(component) {
        Ok(state) => state.iter()
            .filter(|(key, _)| !config.is_reserved_state_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        Err(e) => {
            tracing::debug!(node = %handle, error = %e, "state unavailable");
            Map::new()
        }
    };

    let inputs = facet(host.inputs(component), component, "inputs")
        .into_iter()
        .filter(|(key, _)| !config.is_reserved_attribute(key))
        .collect();
    let outputs = facet(host.outputs(component), component, "outputs");

    Ok(ComponentSnapshot {
        id,
        name,
        state,
        inputs,
        outputs,
        properties,
        last_tick_time: host.last_tick_time(component).unwrap_or(0.0),
        meta: SnapshotMeta { event: kind },
    })
}

fn facet(result: Result<Map<String, Value>>, node: ComponentNode, what: &str) -> Map<String, Value> {
    result.unwrap_or_else(|e| {
        tracing::debug!(node = %node.native(), facet = what, error = %e, "facet unavailable");
        Map::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{ComponentSpec, SandboxApp};
    use crate::InspectorError;
    use serde_json::json;

    #[test]
    fn test_snapshot_fields() {
        let mut app = SandboxApp::new();
        let root = app.bootstrap(
            ComponentSpec::new("TodoApp")
                .state("title", json!("todos"))
                .state("__ngContext", json!(12))
                .state("count", json!(2))
                .input("theme", json!("dark"))
                .output("closed", json!("EventEmitter")),
        ).unwrap();
        app.set_tick_time(root, 16.5);

        let snap = snapshot(&app, root, EventKind::Root, &InspectorConfig::default()).unwrap();
        assert_eq!(snap.id().to_string(), "0");
        assert_eq!(snap.name(), "TodoApp");
        let keys: Vec<_> = snap.state().keys().map(String::as_str).collect();
        assert_eq!(keys, ["title", "count"]);
        assert_eq!(snap.inputs()["theme"], json!("dark"));
        assert_eq!(snap.outputs()["closed"], json!("EventEmitter"));
        assert!(!snap.properties().contains_key("data-ngid"));
        assert_eq!(snap.last_tick_time(), 16.5);
        assert_eq!(snap.event(), EventKind::Root);
    }

    #[test]
    fn test_snapshot_requires_identity() {
        let mut app = SandboxApp::new();
        let plain = app.append_element(app.body(), "div").unwrap();

        let err = snapshot(&app, plain, EventKind::Add, &InspectorConfig::default()).unwrap_err();
        assert!(matches!(err, InspectorError::IdentityUnavailable { .. }));
    }

    #[test]
    fn test_snapshot_degrades_without_component() {
        let mut app = SandboxApp::new();
        let plain = app.append_element(app.body(), "div").unwrap();
        app.dom_mut().set_attribute(plain, "data-ngid", "4").unwrap();
        app.dom_mut().set_attribute(plain, "title", "orphan").unwrap();

        let snap = snapshot(&app, plain, EventKind::Change, &InspectorConfig::default()).unwrap();
        assert_eq!(snap.name(), UNKNOWN_NAME);
        assert!(snap.state().is_empty());
        assert_eq!(snap.properties()["title"], json!("orphan"));
        assert_eq!(snap.last_tick_time(), 0.0);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let mut app = SandboxApp::new();
        let root = app.bootstrap(ComponentSpec::new("App")).unwrap();
        let snap = snapshot(&app, root, EventKind::Root, &InspectorConfig::default()).unwrap();

        let value = serde_json::to_value(&snap).unwrap();
        assert_eq!(value["id"], json!("0"));
        assert_eq!(value["lastTickTime"], json!(0.0));
        assert_eq!(value["meta"]["event"], json!("ROOT"));
    }
}
