//! Model controller
//!
//! Consumes classified events, applies them through the [`Reconciler`] and
//! publishes the whole model after every change.

use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use crate::adapter::{AdapterState, FrameworkAdapter};
use crate::config::InspectorConfig;
use crate::events::{event_channel, AdapterEvent, EventKind, EventReceiver};
use crate::host::{Introspect, MutationSource};
use crate::identity::ComponentId;
use crate::model::MirroredModel;
use crate::reconciler::Reconciler;
use crate::{InspectorError, Result};

/// Message type tag on every published model
pub const MODEL_CHANGE: &str = "model_change";

/// Published after each applied event
#[derive(Debug, Serialize)]
pub struct ModelMessage<'a> {
    #[serde(rename = "type")]
    pub message_type: &'static str,
    pub event: EventSummary,
    pub payload: &'a MirroredModel,
}

/// Event that triggered a publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub id: Option<ComponentId>,
}

impl From<&AdapterEvent> for EventSummary {
    fn from(event: &AdapterEvent) -> Self {
        Self { kind: event.kind, id: event.id.clone() }
    }
}

/// Outbound channel to the inspector UI
pub trait Transport {
    fn send(&mut self, message: &ModelMessage<'_>) -> Result<()>;
}

/// Newline-delimited JSON
#[derive(Debug)]
pub struct JsonLinesTransport<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesTransport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Transport for JsonLinesTransport<W> {
    fn send(&mut self, message: &ModelMessage<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.writer, message)
            .map_err(|e| InspectorError::Transport(e.to_string()))?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every message as a JSON value
#[derive(Debug, Default)]
pub struct MemoryTransport {
    messages: Vec<Value>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Value] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Value> {
        self.messages.last()
    }

    pub fn take(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.messages)
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, message: &ModelMessage<'_>) -> Result<()> {
        let value = serde_json::to_value(message).map_err(|e| InspectorError::Transport(e.to_string()))?;
        self.messages.push(value);
        Ok(())
    }
}

/// Drives the reconciler from the event channel
#[derive(Debug)]
pub struct DomController<T: Transport> {
    reconciler: Reconciler,
    receiver: EventReceiver,
    transport: T,
}

impl<T: Transport> DomController<T> {
    pub fn new(config: InspectorConfig, receiver: EventReceiver, transport: T) -> Self {
        Self {
            reconciler: Reconciler::new(config),
            receiver,
            transport,
        }
    }

    /// Apply everything queued so far. Returns the number of events applied.
    pub fn sync<H: Introspect + ?Sized>(&mut self, host: &H) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.receiver.try_recv() {
            applied += usize::from(self.handle(host, &event));
        }
        applied
    }

    /// Apply events until the adapter closes the channel
    pub async fn drain_until_closed<H: Introspect + ?Sized>(&mut self, host: &H) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.receiver.recv().await {
            applied += usize::from(self.handle(host, &event));
        }
        tracing::debug!(applied, "event channel closed");
        applied
    }

    /// True once the adapter has dropped its sender and the queue is empty
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed() && self.receiver.is_empty()
    }

    pub fn model(&self) -> &MirroredModel {
        self.reconciler.model()
    }

    pub fn reset(&mut self) {
        self.reconciler.reset();
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn handle<H: Introspect + ?Sized>(&mut self, host: &H, event: &AdapterEvent) -> bool {
        if !self.reconciler.apply(host, event) {
            return false;
        }
        let message = ModelMessage {
            message_type: MODEL_CHANGE,
            event: EventSummary::from(event),
            payload: self.reconciler.model(),
        };
        if let Err(e) = self.transport.send(&message) {
            tracing::warn!(kind = ?event.kind, error = %e, "model publication failed");
        }
        true
    }
}

/// Adapter and controller wired over one channel
#[derive(Debug)]
pub struct InspectorSession<T: Transport> {
    adapter: FrameworkAdapter,
    controller: DomController<T>,
}

impl<T: Transport> InspectorSession<T> {
    /// Select the adapter for `version` and connect it to `transport`
    pub fn new(version: &str, config: InspectorConfig, transport: T) -> Result<Self> {
        let (sender, receiver) = event_channel();
        let adapter = FrameworkAdapter::detect(version, config.clone(), sender)?;
        Ok(Self {
            adapter,
            controller: DomController::new(config, receiver, transport),
        })
    }

    /// Announce the current tree and apply it
    pub fn start<H: Introspect + MutationSource>(&mut self, host: &mut H) -> Result<usize> {
        self.adapter.setup(host)?;
        Ok(self.controller.sync(&*host))
    }

    /// Classify pending mutations and apply the resulting events
    pub fn tick<H: Introspect + MutationSource>(&mut self, host: &mut H) -> usize {
        self.adapter.pump(host);
        self.controller.sync(&*host)
    }

    /// Rebuild the model from a fresh walk
    pub fn resync<H: Introspect + MutationSource>(&mut self, host: &mut H) -> Result<usize> {
        self.adapter.pump(host);
        self.controller.sync(&*host);
        self.controller.reset();
        self.adapter.rescan(&*host)?;
        Ok(self.controller.sync(&*host))
    }

    /// Stop observing and apply whatever was still queued
    pub fn stop<H: Introspect + MutationSource>(&mut self, host: &mut H) -> usize {
        self.adapter.cleanup(host);
        self.controller.sync(&*host)
    }

    pub fn state(&self) -> AdapterState {
        self.adapter.state()
    }

    pub fn adapter(&self) -> &FrameworkAdapter {
        &self.adapter
    }

    pub fn controller(&self) -> &DomController<T> {
        &self.controller
    }

    pub fn model(&self) -> &MirroredModel {
        self.controller.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterKind;
    use crate::sandbox::{ComponentSpec, SandboxApp};
    use serde_json::json;

    const VERSION: &str = "2.0.0-alpha.40";

    #[test]
    fn test_publishes_after_each_applied_event() {
        let mut app = SandboxApp::new();
        app.bootstrap(ComponentSpec::new("App").child(ComponentSpec::new("Nav"))).unwrap();

        let mut session = InspectorSession::new(VERSION, InspectorConfig::default(), MemoryTransport::new()).unwrap();
        assert_eq!(session.start(&mut app).unwrap(), 2);

        let messages = session.controller().transport().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["type"], json!("model_change"));
        assert_eq!(messages[0]["event"], json!({ "type": "ROOT", "id": "0" }));
        assert_eq!(messages[1]["event"]["type"], json!("ADD"));
        assert_eq!(messages[1]["payload"][0]["children"][0]["name"], json!("Nav"));
    }

    #[test]
    fn test_failed_events_are_not_published() {
        let mut app = SandboxApp::new();
        let root = app.bootstrap(ComponentSpec::new("App")).unwrap();
        let mut session = InspectorSession::new(VERSION, InspectorConfig::default(), MemoryTransport::new()).unwrap();
        session.start(&mut app).unwrap();

        app.append_element(root, "br").unwrap();
        assert_eq!(session.tick(&mut app), 0);
        assert_eq!(session.controller().transport().messages().len(), 1);
    }

    #[test]
    fn test_json_lines() {
        let mut app = SandboxApp::new();
        let root = app.bootstrap(ComponentSpec::new("App")).unwrap();
        let (tx, rx) = event_channel();
        tx.try_send(AdapterEvent::root(root, None)).unwrap();

        let mut controller = DomController::new(InspectorConfig::default(), rx, JsonLinesTransport::new(Vec::new()));
        assert_eq!(controller.sync(&app), 1);

        let out = String::from_utf8(controller.transport.into_inner()).unwrap();
        let line: Value = serde_json::from_str(out.trim_end()).unwrap();
        assert!(out.ends_with('\n'));
        assert_eq!(line["payload"][0]["name"], json!("App"));
        assert_eq!(line["event"]["id"], json!(null));
    }

    #[test]
    fn test_drain_until_closed() {
        let mut app = SandboxApp::new();
        let root = app.bootstrap(ComponentSpec::new("App")).unwrap();
        let (tx, rx) = event_channel();
        let mut adapter = FrameworkAdapter::new(AdapterKind::DebugElement, InspectorConfig::default(), tx);
        let mut controller = DomController::new(InspectorConfig::default(), rx, MemoryTransport::new());

        adapter.setup(&mut app).unwrap();
        app.set_state(root, "ready", json!(true)).unwrap();
        adapter.pump(&mut app);
        adapter.cleanup(&mut app);

        let applied = smol::block_on(controller.drain_until_closed(&app));
        assert_eq!(applied, 2);
        assert!(controller.is_closed());
    }

    #[test]
    fn test_resync_rebuilds() {
        let mut app = SandboxApp::new();
        app.bootstrap(ComponentSpec::new("App").child(ComponentSpec::new("Nav"))).unwrap();
        let mut session = InspectorSession::new(VERSION, InspectorConfig::default(), MemoryTransport::new()).unwrap();
        session.start(&mut app).unwrap();
        let before = session.model().clone();

        assert_eq!(session.resync(&mut app).unwrap(), 2);
        assert_eq!(session.model(), &before);
    }

    #[test]
    fn test_unsupported_version() {
        let err = InspectorSession::new("4.0.0", InspectorConfig::default(), MemoryTransport::new()).unwrap_err();
        assert!(matches!(err, InspectorError::UnsupportedFramework(v) if v == "4.0.0"));
    }
}
