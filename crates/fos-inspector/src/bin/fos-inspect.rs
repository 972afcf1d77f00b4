//! fOS Inspect - demo session
//!
//! Boots a small sandbox application, attaches the inspector and streams
//! every model change to stdout as JSON lines.
//!
//! Usage: `fos-inspect [config.json]`

use anyhow::Context;
use fos_inspector::{ComponentSpec, InspectorConfig, InspectorSession, JsonLinesTransport, SandboxApp};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const FRAMEWORK_VERSION: &str = "2.0.0-alpha.40";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
            InspectorConfig::from_json_str(&raw).with_context(|| format!("parsing {}", path))?
        }
        None => InspectorConfig::default(),
    };

    let mut app = SandboxApp::with_marker(config.marker.clone());
    let root = app.bootstrap(
        ComponentSpec::new("TodoApp")
            .state("title", json!("todos"))
            .child(ComponentSpec::new("TodoList").input("filter", json!("all")))
            .child(ComponentSpec::new("TodoFooter").output("cleared", json!("EventEmitter"))),
    )?;

    let stdout = std::io::stdout().lock();
    let mut session = InspectorSession::new(FRAMEWORK_VERSION, config, JsonLinesTransport::new(stdout))?;
    session.start(&mut app)?;

    let list = app.component_children(root).first().copied().context("todo list missing")?;
    for (i, text) in ["write docs", "ship it"].into_iter().enumerate() {
        let item = app.mount(list, ComponentSpec::new("TodoItem").state("text", json!(text)))?;
        app.set_state(item, "done", json!(i == 0))?;
        session.tick(&mut app);
    }

    app.set_state(root, "remaining", json!(1))?;
    session.tick(&mut app);

    let first = app.component_children(list).first().copied().context("no items mounted")?;
    app.unmount(first)?;
    session.tick(&mut app);

    let applied = session.stop(&mut app);
    tracing::info!(applied, components = session.model().len(), "session finished");
    Ok(())
}
