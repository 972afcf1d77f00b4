//! fOS Inspector
//!
//! Live component-tree inspection bridge.
//!
//! Features:
//! - Positional component identity read from framework markers
//! - Component snapshots (name, state, inputs, outputs, properties)
//! - Pre-order tree walker
//! - Event adapter classifying mutations into ROOT / ADD / CHANGE / REMOVE
//! - Mirrored model reconciled in place and published as JSON
//! - Sandbox component host for demos and tests

pub mod adapter;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod host;
pub mod identity;
pub mod model;
pub mod reconciler;
pub mod sandbox;
pub mod snapshot;
pub mod walker;

pub use adapter::{AdapterKind, AdapterState, DebugElementAdapter, FrameworkAdapter};
pub use config::{InspectorConfig, MarkerConfig, ObserveScope};
pub use controller::{DomController, InspectorSession, JsonLinesTransport, MemoryTransport, ModelMessage, Transport};
pub use error::{InspectorError, Result};
pub use events::{event_channel, AdapterEvent, EventKind, EventReceiver, EventSender, Extent};
pub use host::{ComponentNode, Introspect, MutationSource, RawMutation, RawMutationKind, Subscription, Watch};
pub use identity::{identity_of, ComponentId};
pub use model::{MirroredModel, ModelNode};
pub use reconciler::Reconciler;
pub use sandbox::{ComponentSpec, SandboxApp};
pub use snapshot::{snapshot, ComponentSnapshot};
pub use walker::{walk, Visit};
