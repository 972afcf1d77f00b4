//! Integration tests - Live tree to mirrored model
//!
//! Drives a sandbox application through the adapter, the event channel and
//! the controller, and checks the events and the resulting model.

use fos_dom::NodeId;
use fos_inspector::{
    event_channel, identity_of, snapshot, AdapterEvent, AdapterKind, AdapterState, ComponentId, ComponentSpec,
    DomController, EventKind, EventReceiver, FrameworkAdapter, InspectorConfig, InspectorError, MemoryTransport,
    ObserveScope, Reconciler, SandboxApp,
};
use serde_json::json;

const VERSION: &str = "2.0.0-alpha.40";

struct Harness {
    app: SandboxApp,
    adapter: FrameworkAdapter,
    controller: DomController<MemoryTransport>,
}

impl Harness {
    fn new(app: SandboxApp, config: InspectorConfig) -> Self {
        let (tx, rx) = event_channel();
        Self {
            app,
            adapter: FrameworkAdapter::detect(VERSION, config.clone(), tx).unwrap(),
            controller: DomController::new(config, rx, MemoryTransport::new()),
        }
    }

    /// Adapter whose events are read directly instead of applied
    fn observing_events(app: SandboxApp) -> (Self, EventReceiver) {
        let (tx, rx) = event_channel();
        let (_, idle) = event_channel();
        let harness = Self {
            app,
            adapter: FrameworkAdapter::new(AdapterKind::DebugElement, InspectorConfig::default(), tx),
            controller: DomController::new(InspectorConfig::default(), idle, MemoryTransport::new()),
        };
        (harness, rx)
    }

    fn start(&mut self) -> usize {
        self.adapter.setup(&mut self.app).unwrap();
        self.controller.sync(&self.app)
    }

    fn tick(&mut self) -> usize {
        self.adapter.pump(&mut self.app);
        self.controller.sync(&self.app)
    }

    fn entry(&self, id: &str) -> &fos_inspector::ModelNode {
        self.controller.model().get(&id.parse().unwrap()).unwrap()
    }
}

fn two_children() -> (SandboxApp, NodeId) {
    let mut app = SandboxApp::new();
    let root = app.bootstrap(
        ComponentSpec::new("App")
            .child(ComponentSpec::new("Header"))
            .child(ComponentSpec::new("Content").child(ComponentSpec::new("Card"))),
    ).unwrap();
    (app, root)
}

fn drain(rx: &EventReceiver) -> Vec<(EventKind, String)> {
    std::iter::from_fn(|| rx.try_recv().ok())
        .map(|e| (e.kind, e.id_label()))
        .collect()
}

// ============================================================================
// EVENT FLOW
// ============================================================================

#[test]
fn test_setup_announces_preorder() {
    let mut app = SandboxApp::new();
    app.bootstrap(ComponentSpec::new("App").child(ComponentSpec::new("A")).child(ComponentSpec::new("B"))).unwrap();
    let (mut harness, rx) = Harness::observing_events(app);

    harness.adapter.setup(&mut harness.app).unwrap();
    assert_eq!(drain(&rx), vec![
        (EventKind::Root, "0".to_string()),
        (EventKind::Add, "0.0".to_string()),
        (EventKind::Add, "0.1".to_string()),
    ]);
}

#[test]
fn test_state_change_keeps_children() {
    let (app, root) = two_children();
    let mut harness = Harness::new(app, InspectorConfig::default());
    harness.start();
    let before = harness.entry("0.1").children.clone();

    let content = harness.app.component_children(root)[1];
    harness.app.set_state(content, "expanded", json!(true)).unwrap();
    assert_eq!(harness.tick(), 1);

    let entry = harness.entry("0.1");
    assert_eq!(entry.snapshot.state()["expanded"], json!(true));
    assert_eq!(entry.snapshot.event(), EventKind::Change);
    assert_eq!(entry.children, before);
    assert_eq!(entry.children.len(), 1);
}

#[test]
fn test_replaced_slot_is_not_merged() {
    let (app, root) = two_children();
    let mut harness = Harness::new(app, InspectorConfig::default());
    harness.start();

    let content = harness.app.component_children(root)[1];
    harness.app.set_state(content, "old", json!(1)).unwrap();
    harness.tick();

    harness.app.unmount(content).unwrap();
    harness.app.mount(root, ComponentSpec::new("Sidebar").state("fresh", json!(true))).unwrap();
    harness.tick();

    let entry = harness.entry("0.1");
    assert_eq!(entry.snapshot.name(), "Sidebar");
    assert_eq!(entry.snapshot.id().to_string(), "0.1");
    assert!(entry.snapshot.state().get("old").is_none());
    assert_eq!(entry.snapshot.state()["fresh"], json!(true));
    assert!(entry.children.is_empty());
}

#[test]
fn test_text_change_is_ignored() {
    let (app, root) = two_children();
    let mut harness = Harness::new(app, InspectorConfig::default());
    let text = harness.app.set_text(root, "before").unwrap();
    harness.start();
    let model = harness.controller.model().clone();
    let published = harness.controller.transport().messages().len();

    harness.app.dom_mut().set_text(text, "after").unwrap();
    assert_eq!(harness.adapter.pump(&mut harness.app), 0);
    assert_eq!(harness.controller.sync(&harness.app), 0);
    assert_eq!(harness.controller.model(), &model);
    assert_eq!(harness.controller.transport().messages().len(), published);
}

#[test]
fn test_insert_and_sibling_unmount_in_one_batch() {
    let mut app = SandboxApp::new();
    let root = app.bootstrap(ComponentSpec::new("App").child(ComponentSpec::new("A")).child(ComponentSpec::new("B"))).unwrap();
    let mut harness = Harness::new(app, InspectorConfig::default());
    harness.start();

    let first = harness.app.component_children(root)[0];
    harness.app.mount(root, ComponentSpec::new("X")).unwrap();
    harness.app.unmount(first).unwrap();
    harness.tick();

    assert_eq!(harness.controller.model().shape(), harness.app.shape());
    assert_eq!(harness.entry("0.0").snapshot.name(), "B");
    assert_eq!(harness.entry("0.1").snapshot.name(), "X");
    assert_eq!(harness.entry("0.1").snapshot.id().to_string(), "0.1");
}

#[test]
fn test_nested_mounts_and_unmounts_in_one_batch() {
    let (app, root) = two_children();
    let mut harness = Harness::new(app, InspectorConfig::default());
    harness.start();

    let children = harness.app.component_children(root);
    let (header, content) = (children[0], children[1]);
    let card = harness.app.component_children(content)[0];
    harness.app.mount(content, ComponentSpec::new("Badge")).unwrap();
    harness.app.unmount(card).unwrap();
    harness.app.unmount(header).unwrap();
    harness.app.mount(root, ComponentSpec::new("Footer").child(ComponentSpec::new("Link"))).unwrap();
    harness.tick();

    assert_eq!(harness.controller.model().shape(), harness.app.shape());
    for (position, node) in harness.controller.model().iter() {
        assert_eq!(node.snapshot.id(), &position);
    }
}

#[test]
fn test_root_unmount_under_default_scope() {
    let mut app = SandboxApp::new();
    let first = app.bootstrap(ComponentSpec::new("A").child(ComponentSpec::new("A1"))).unwrap();
    app.bootstrap(ComponentSpec::new("B")).unwrap();
    let mut harness = Harness::new(app, InspectorConfig::default());
    harness.start();

    harness.app.unmount(first).unwrap();
    harness.tick();

    assert_eq!(harness.controller.model().shape(), harness.app.shape());
    assert_eq!(harness.controller.model().roots().len(), 1);
    assert_eq!(harness.entry("0").snapshot.name(), "B");
    assert!(harness.entry("0").children.is_empty());
}

#[test]
fn test_root_bootstrap_under_default_scope() {
    let (app, _) = two_children();
    let mut harness = Harness::new(app, InspectorConfig::default());
    harness.start();

    let widget = harness.app.bootstrap(ComponentSpec::new("Widget").child(ComponentSpec::new("Icon"))).unwrap();
    harness.tick();
    assert_eq!(harness.controller.model().shape(), harness.app.shape());

    harness.app.set_state(widget, "open", json!(true)).unwrap();
    assert_eq!(harness.tick(), 1);
    assert_eq!(harness.entry("1").snapshot.state()["open"], json!(true));
    assert_eq!(harness.entry("1").children.len(), 1);
}

// ============================================================================
// MODEL PROPERTIES
// ============================================================================

#[test]
fn test_change_reapplied_is_noop_for_children() {
    let (app, root) = two_children();
    let mut reconciler = Reconciler::default();
    let content = app.component_children(root)[1];
    let card = app.component_children(content)[0];
    for event in [AdapterEvent::root(root, None), AdapterEvent::add(content, None), AdapterEvent::add(card, None)] {
        reconciler.try_apply(&app, &event).unwrap();
    }

    let change = AdapterEvent::change(content, None);
    reconciler.try_apply(&app, &change).unwrap();
    let once = reconciler.model().clone();
    reconciler.try_apply(&app, &change).unwrap();

    assert_eq!(reconciler.model(), &once);
    assert_eq!(reconciler.model().get(&"0.1".parse().unwrap()).unwrap().children.len(), 1);
}

#[test]
fn test_root_remove_keeps_sibling_ids() {
    let mut app = SandboxApp::new();
    let roots: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .map(|name| app.bootstrap(ComponentSpec::new(name)).unwrap())
        .collect();
    let config = InspectorConfig::default().with_observe_scope(ObserveScope::Document);
    let mut harness = Harness::new(app, config);
    harness.start();

    // detach without the framework renumbering anything
    let body = harness.app.body();
    harness.app.dom_mut().remove_child(body, roots[1]).unwrap();
    harness.tick();

    let ids: Vec<_> = harness.controller.model()
        .roots()
        .iter()
        .flatten()
        .map(|node| node.snapshot.id().to_string())
        .collect();
    assert_eq!(ids, ["0", "2"]);
}

#[test]
fn test_root_remove_with_renumbering_converges() {
    let mut app = SandboxApp::new();
    let first = app.bootstrap(ComponentSpec::new("A")).unwrap();
    app.bootstrap(ComponentSpec::new("B").child(ComponentSpec::new("B1"))).unwrap();
    let config = InspectorConfig::default().with_observe_scope(ObserveScope::Document);
    let mut harness = Harness::new(app, config);
    harness.start();

    harness.app.unmount(first).unwrap();
    harness.tick();

    assert_eq!(harness.controller.model().roots().len(), 1);
    assert_eq!(harness.entry("0").snapshot.name(), "B");
    assert_eq!(harness.entry("0.0").snapshot.id().to_string(), "0.0");
}

#[test]
fn test_snapshot_then_add_round_trip() {
    let (app, root) = two_children();
    let header = app.component_children(root)[0];
    let config = InspectorConfig::default();
    let mut reconciler = Reconciler::new(config.clone());
    reconciler.try_apply(&app, &AdapterEvent::root(root, None)).unwrap();

    let snap = snapshot(&app, header, EventKind::Add, &config).unwrap();
    reconciler.try_apply(&app, &AdapterEvent::add(header, Some(snap.id().clone()))).unwrap();

    let live = identity_of(app.dom(), header, &config.marker).unwrap();
    assert_eq!(reconciler.model().get(&live).unwrap().snapshot.id(), &live);
    assert_eq!(live, ComponentId::root(0).child(0));
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[test]
fn test_setup_twice_and_after_cleanup() {
    let (app, _) = two_children();
    let mut harness = Harness::new(app, InspectorConfig::default());
    harness.start();

    let err = harness.adapter.setup(&mut harness.app).unwrap_err();
    assert!(matches!(err, InspectorError::InvalidLifecycle { action: "setup", .. }));

    harness.adapter.cleanup(&mut harness.app);
    let err = harness.adapter.setup(&mut harness.app).unwrap_err();
    assert!(matches!(err, InspectorError::InvalidLifecycle { state: AdapterState::Stopped, .. }));
}

#[test]
fn test_cleanup_closes_stream() {
    let (app, root) = two_children();
    let mut harness = Harness::new(app, InspectorConfig::default());
    harness.adapter.setup(&mut harness.app).unwrap();

    harness.app.set_state(root, "title", json!("x")).unwrap();
    harness.adapter.pump(&mut harness.app);
    harness.adapter.cleanup(&mut harness.app);

    // four setup events plus one change, then the stream ends
    let applied = smol::block_on(harness.controller.drain_until_closed(&harness.app));
    assert_eq!(applied, 5);
    assert!(harness.controller.is_closed());

    harness.app.set_state(root, "title", json!("y")).unwrap();
    assert_eq!(harness.tick(), 0);
    assert_eq!(harness.controller.model().len(), 4);
}

#[test]
fn test_unsupported_framework() {
    let (tx, _rx) = event_channel();
    let err = FrameworkAdapter::detect("2.0.0-beta.1", InspectorConfig::default(), tx).unwrap_err();
    assert!(matches!(err, InspectorError::UnsupportedFramework(_)));
}
