//! Property tests - mirrored model convergence
//!
//! Random mount / unmount / state sequences on a sandbox application. The
//! inspector is pumped after every step, or after batches of steps so one
//! notification carries several structural mutations. The model must
//! always have the live tree's shape, and every recorded id must match its
//! position.

use fos_dom::NodeId;
use fos_inspector::{ComponentSpec, InspectorConfig, InspectorSession, MemoryTransport, ObserveScope, SandboxApp};
use proptest::prelude::*;
use serde_json::json;

const NAMES: [&str; 4] = ["Panel", "List", "Item", "Badge"];

#[derive(Debug, Clone)]
enum Op {
    Bootstrap(usize),
    Mount { parent: usize, name: usize, nested: bool },
    Unmount(usize),
    SetState { target: usize, value: i64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => (0..NAMES.len()).prop_map(Op::Bootstrap),
        4 => (any::<usize>(), 0..NAMES.len(), any::<bool>())
            .prop_map(|(parent, name, nested)| Op::Mount { parent, name, nested }),
        2 => any::<usize>().prop_map(Op::Unmount),
        2 => (any::<usize>(), -5i64..5).prop_map(|(target, value)| Op::SetState { target, value }),
    ]
}

/// Live component hosts in pre-order
fn live_nodes(app: &SandboxApp) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = app.roots().iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(app.component_children(node).into_iter().rev());
    }
    out
}

fn pick(app: &SandboxApp, index: usize) -> Option<NodeId> {
    let nodes = live_nodes(app);
    (!nodes.is_empty()).then(|| nodes[index % nodes.len()])
}

fn run(app: &mut SandboxApp, op: &Op) {
    match *op {
        Op::Bootstrap(name) => {
            app.bootstrap(ComponentSpec::new(NAMES[name])).unwrap();
        }
        Op::Mount { parent, name, nested } => {
            let Some(parent) = pick(app, parent) else { return };
            let mut spec = ComponentSpec::new(NAMES[name]);
            if nested {
                spec = spec.child(ComponentSpec::new("Leaf"));
            }
            app.mount(parent, spec).unwrap();
        }
        Op::Unmount(target) => {
            if let Some(node) = pick(app, target) {
                app.unmount(node).unwrap();
            }
        }
        Op::SetState { target, value } => {
            if let Some(node) = pick(app, target) {
                app.set_state(node, "value", json!(value)).unwrap();
            }
        }
    }
}

fn batches_strategy() -> impl Strategy<Value = Vec<Vec<Op>>> {
    prop::collection::vec(prop::collection::vec(op_strategy(), 1..5), 1..16)
}

fn scope_strategy() -> impl Strategy<Value = ObserveScope> {
    prop_oneof![Just(ObserveScope::Roots), Just(ObserveScope::Document)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_model_matches_live_tree(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut app = SandboxApp::new();
        app.bootstrap(ComponentSpec::new("App").child(ComponentSpec::new("Nav"))).unwrap();

        let config = InspectorConfig::default().with_observe_scope(ObserveScope::Document);
        let mut session = InspectorSession::new("2.0.0-alpha.40", config, MemoryTransport::new()).unwrap();
        session.start(&mut app).unwrap();

        for op in &ops {
            run(&mut app, op);
            session.tick(&mut app);

            prop_assert_eq!(session.model().shape(), app.shape(), "after {:?}", op);
            for (position, node) in session.model().iter() {
                prop_assert_eq!(node.snapshot.id(), &position);
            }
        }
    }

    #[test]
    fn prop_resync_matches_incremental(ops in prop::collection::vec(op_strategy(), 1..20)) {
        let mut app = SandboxApp::new();
        app.bootstrap(ComponentSpec::new("App")).unwrap();

        let config = InspectorConfig::default().with_observe_scope(ObserveScope::Document);
        let mut session = InspectorSession::new("2.0.0-alpha.40", config, MemoryTransport::new()).unwrap();
        session.start(&mut app).unwrap();

        for op in &ops {
            run(&mut app, op);
            session.tick(&mut app);
        }
        let incremental = session.model().shape();

        session.resync(&mut app).unwrap();
        prop_assert_eq!(session.model().shape(), incremental);
    }

    #[test]
    fn prop_batched_mutations_converge(batches in batches_strategy(), scope in scope_strategy()) {
        let mut app = SandboxApp::new();
        app.bootstrap(ComponentSpec::new("App").child(ComponentSpec::new("Nav"))).unwrap();

        let config = InspectorConfig::default().with_observe_scope(scope);
        let mut session = InspectorSession::new("2.0.0-alpha.40", config, MemoryTransport::new()).unwrap();
        session.start(&mut app).unwrap();

        for batch in &batches {
            for op in batch {
                run(&mut app, op);
            }
            session.tick(&mut app);

            prop_assert_eq!(session.model().shape(), app.shape(), "after {:?} ({:?})", batch, scope);
            for (position, node) in session.model().iter() {
                prop_assert_eq!(node.snapshot.id(), &position);
            }
        }
    }
}
