//! Mutation Observers
//!
//! Observers are owned by the [`DomTree`](crate::DomTree) and addressed by
//! [`ObserverId`]. The tree queues a record on every observer whose
//! registration covers the mutated node; callers drain the queue in batches
//! with `take_records`.

use crate::NodeId;

/// Observer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

impl ObserverId {
    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn from_raw(raw: u64) -> Self {
        ObserverId(raw)
    }
}

/// Mutation observer options
#[derive(Debug, Clone, Default)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    /// Everything, including descendants
    pub fn all() -> Self {
        Self {
            child_list: true,
            attributes: true,
            character_data: true,
            subtree: true,
            attribute_old_value: true,
            attribute_filter: None,
        }
    }
}

/// Mutation record
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub fn attributes(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: Some(name.to_string()),
            old_value,
        }
    }

    pub fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes: added,
            removed_nodes: removed,
            attribute_name: None,
            old_value: None,
        }
    }

    pub fn character_data(target: NodeId, old_value: String) -> Self {
        Self {
            mutation_type: MutationType::CharacterData,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: None,
            old_value: Some(old_value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    CharacterData,
    ChildList,
}

/// Mutation observer
#[derive(Debug)]
pub struct MutationObserver {
    id: ObserverId,
    observations: Vec<(NodeId, MutationObserverInit)>,
    records: Vec<MutationRecord>,
}

impl MutationObserver {
    pub(crate) fn new(id: ObserverId) -> Self {
        Self {
            id,
            observations: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Observe a target. Re-observing a target replaces its options.
    pub(crate) fn observe(&mut self, target: NodeId, options: MutationObserverInit) {
        match self.observations.iter_mut().find(|(t, _)| *t == target) {
            Some(entry) => entry.1 = options,
            None => self.observations.push((target, options)),
        }
    }

    /// Stop observing and drop pending records
    pub(crate) fn disconnect(&mut self) {
        self.observations.clear();
        self.records.clear();
    }

    pub(crate) fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    /// Check if observing node
    pub fn is_observing(&self, node: NodeId) -> bool {
        self.observations.iter().any(|(t, _)| *t == node)
    }

    pub fn has_pending(&self) -> bool {
        !self.records.is_empty()
    }

    /// Whether `record` falls under one of the registrations.
    ///
    /// `covers(target)` answers "is `target` an inclusive ancestor of the
    /// record's target", which only the tree can resolve.
    pub(crate) fn wants(&self, record: &MutationRecord, covers: impl Fn(NodeId) -> bool) -> bool {
        self.observations.iter().any(|(target, options)| {
            let matches_type = match record.mutation_type {
                MutationType::Attributes => options.attributes,
                MutationType::CharacterData => options.character_data,
                MutationType::ChildList => options.child_list,
            };
            if !matches_type {
                return false;
            }

            let passes_filter = match (&options.attribute_filter, &record.attribute_name) {
                (Some(filter), Some(attr)) => filter.contains(attr),
                _ => true,
            };
            if !passes_filter {
                return false;
            }

            *target == record.target || (options.subtree && covers(*target))
        })
    }

    pub(crate) fn push_record(&mut self, mut record: MutationRecord, keep_old_value: bool) {
        if !keep_old_value && record.mutation_type == MutationType::Attributes {
            record.old_value = None;
        }
        self.records.push(record);
    }

    /// True if any registration asked for attribute old values
    pub(crate) fn wants_old_values(&self) -> bool {
        self.observations.iter().any(|(_, o)| o.attribute_old_value)
    }
}
