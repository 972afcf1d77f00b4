//! Model reconciler
//!
//! Applies classified events to the [`MirroredModel`] in place. Events are
//! applied independently and in order; a failed event is logged and
//! skipped, the stream carries on.
//!
//! Walked `Root`/`Add` events carry the live counts around their node.
//! Recorded slots past those counts belong to components that are gone
//! and are dropped, which is how a re-walk clears what stale removals
//! left behind. `Change` never truncates.

use crate::config::InspectorConfig;
use crate::events::{AdapterEvent, EventKind, Extent};
use crate::host::Introspect;
use crate::identity::{identity_of, ComponentId};
use crate::model::{MirroredModel, ModelNode, Slots};
use crate::snapshot::{snapshot, ComponentSnapshot};
use crate::{InspectorError, Result};

/// Keeps the mirrored model in step with classified events
#[derive(Debug, Default)]
pub struct Reconciler {
    model: MirroredModel,
    config: InspectorConfig,
}

impl Reconciler {
    pub fn new(config: InspectorConfig) -> Self {
        Self { model: MirroredModel::new(), config }
    }

    pub fn model(&self) -> &MirroredModel {
        &self.model
    }

    /// Forget everything; pair with a rescan to resynchronize
    pub fn reset(&mut self) {
        tracing::debug!(entries = self.model.len(), "model reset");
        self.model.clear();
    }

    /// Apply one event, logging failures. Returns whether the model changed.
    pub fn apply<H: Introspect + ?Sized>(&mut self, host: &H, event: &AdapterEvent) -> bool {
        match self.try_apply(host, event) {
            Ok(()) => {
                tracing::debug!(kind = ?event.kind, id = %event.id_label(), "applied");
                true
            }
            Err(e @ InspectorError::IdentityUnavailable { .. }) => {
                tracing::debug!(kind = ?event.kind, error = %e, "event skipped");
                false
            }
            Err(e) => {
                tracing::warn!(kind = ?event.kind, id = %event.id_label(), error = %e, "event ignored");
                false
            }
        }
    }

    /// Apply one event, reporting why it could not be applied
    pub fn try_apply<H: Introspect + ?Sized>(&mut self, host: &H, event: &AdapterEvent) -> Result<()> {
        match event.kind {
            EventKind::Root | EventKind::Add => {
                let snap = snapshot(host, event.node, event.kind, &self.config)?;
                let id = snap.id().clone();
                self.place(event.kind, snap)?;
                if let Some(extent) = event.extent {
                    self.trim(&id, extent);
                }
                Ok(())
            }
            EventKind::Change => {
                let snap = snapshot(host, event.node, event.kind, &self.config)?;
                let id = snap.id().clone();
                let entry = self.model.get_mut(&id)
                    .ok_or_else(|| out_of_range(event.kind, &id, "no entry to change"))?;
                entry.snapshot = snap;
                Ok(())
            }
            EventKind::Remove => {
                let id = identity_of(host.surface(), event.node, &self.config.marker)
                    .ok()
                    .or_else(|| event.id.clone())
                    .ok_or_else(|| InspectorError::no_identity(event.node, "removed node carries no identity"))?;
                self.remove(&id)
            }
        }
    }

    /// Roots keep their recorded children; children are replaced wholesale
    fn place(&mut self, kind: EventKind, snap: ComponentSnapshot) -> Result<()> {
        let id = snap.id().clone();
        let parent = id.parent();
        let max_gap = self.config.max_index_gap;

        let slots = self.model.slots_mut(parent.as_ref())
            .ok_or_else(|| out_of_range(kind, &id, "parent not recorded"))?;
        let index = id.last_index();
        open_slot(slots, index, max_gap).map_err(|reason| out_of_range(kind, &id, reason))?;

        match (&mut slots[index], id.is_root()) {
            (Some(existing), true) => existing.snapshot = snap,
            (slot, _) => *slot = Some(ModelNode::new(snap)),
        }
        Ok(())
    }

    /// Drop recorded slots past the live counts around `id`
    fn trim(&mut self, id: &ComponentId, extent: Extent) {
        let mut dropped = 0;
        if let Some(siblings) = extent.siblings {
            let keep = siblings.max(id.last_index() + 1);
            if let Some(slots) = self.model.slots_mut(id.parent().as_ref()) {
                dropped += slots.len().saturating_sub(keep);
                slots.truncate(keep);
            }
        }
        if let Some(node) = self.model.get_mut(id) {
            dropped += node.children.len().saturating_sub(extent.children);
            node.children.truncate(extent.children);
        }
        if dropped > 0 {
            tracing::debug!(%id, dropped, "stale slots dropped");
        }
    }

    fn remove(&mut self, id: &ComponentId) -> Result<()> {
        let slots = self.model.slots_mut(id.parent().as_ref())
            .ok_or_else(|| out_of_range(EventKind::Remove, id, "parent not recorded"))?;
        let index = id.last_index();
        if index >= slots.len() {
            return Err(out_of_range(EventKind::Remove, id, "index past end"));
        }
        if slots[index].is_none() {
            return Err(out_of_range(EventKind::Remove, id, "slot is empty"));
        }
        slots.remove(index);
        Ok(())
    }
}

/// Make `index` addressable, padding with holes up to `max_gap`
fn open_slot(slots: &mut Slots, index: usize, max_gap: usize) -> std::result::Result<(), &'static str> {
    if index < slots.len() {
        return Ok(());
    }
    if index - slots.len() > max_gap {
        return Err("index too far past end");
    }
    slots.resize_with(index + 1, || None);
    Ok(())
}

fn out_of_range(kind: EventKind, id: &ComponentId, reason: &str) -> InspectorError {
    InspectorError::ModelIndexOutOfRange { kind, id: id.to_string(), reason: reason.to_string() }
}
