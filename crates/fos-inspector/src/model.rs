//! Mirrored component model
//!
//! Nested ordered sequences mirroring the live component tree. Each slot is
//! either a recorded component or an empty hole left by an out-of-order add.
//! Serializes as a JSON array of roots, holes as `null`, each node's
//! snapshot fields flattened next to its `children`.

use serde::Serialize;

use crate::identity::ComponentId;
use crate::snapshot::ComponentSnapshot;

/// Sequence of slots at one level of the model
pub type Slots = Vec<Option<ModelNode>>;

/// One recorded component with its children
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelNode {
    #[serde(flatten)]
    pub snapshot: ComponentSnapshot,
    pub children: Slots,
}

impl ModelNode {
    pub fn new(snapshot: ComponentSnapshot) -> Self {
        Self { snapshot, children: Vec::new() }
    }
}

/// The mirrored model
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MirroredModel {
    roots: Slots,
}

impl MirroredModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roots(&self) -> &[Option<ModelNode>] {
        &self.roots
    }

    /// Number of recorded components at every depth
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.iter().all(Option::is_none)
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }

    /// Entry at a model position
    pub fn get(&self, position: &ComponentId) -> Option<&ModelNode> {
        let (first, rest) = position.segments().split_first()?;
        let mut node = self.roots.get(*first)?.as_ref()?;
        for &index in rest {
            node = node.children.get(index)?.as_ref()?;
        }
        Some(node)
    }

    pub fn get_mut(&mut self, position: &ComponentId) -> Option<&mut ModelNode> {
        let (first, rest) = position.segments().split_first()?;
        let mut node = self.roots.get_mut(*first)?.as_mut()?;
        for &index in rest {
            node = node.children.get_mut(index)?.as_mut()?;
        }
        Some(node)
    }

    /// Slots holding the children of `parent`, or the roots for `None`
    pub fn slots_mut(&mut self, parent: Option<&ComponentId>) -> Option<&mut Slots> {
        match parent {
            None => Some(&mut self.roots),
            Some(parent) => self.get_mut(parent).map(|node| &mut node.children),
        }
    }

    /// Recorded entries in pre-order, paired with their model position
    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &ModelNode)> {
        let mut stack: Vec<(ComponentId, &ModelNode)> = occupied(&self.roots, None)
            .into_iter()
            .rev()
            .collect();

        std::iter::from_fn(move || {
            let (position, node) = stack.pop()?;
            stack.extend(occupied(&node.children, Some(&position)).into_iter().rev());
            Some((position, node))
        })
    }

    /// Pre-order `(position, name)` pairs; compares structure, not content
    pub fn shape(&self) -> Vec<(ComponentId, String)> {
        self.iter()
            .map(|(position, node)| (position, node.snapshot.name().to_string()))
            .collect()
    }
}

fn occupied<'a>(slots: &'a Slots, parent: Option<&ComponentId>) -> Vec<(ComponentId, &'a ModelNode)> {
    slots.iter()
        .enumerate()
        .filter_map(|(index, slot)| {
            let position = match parent {
                Some(parent) => parent.child(index),
                None => ComponentId::root(index),
            };
            slot.as_ref().map(|node| (position, node))
        })
        .collect()
}
