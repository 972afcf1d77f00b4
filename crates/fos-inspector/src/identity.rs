//! Component identity
//!
//! A component's identity is its position: root index, then the child index
//! inside each ancestor. It is read from the marker attribute the framework
//! writes on the component's host element (`data-ngid="0#2#1"` → `0.2.1`)
//! every time it is needed and never cached, so it goes stale as soon as
//! the framework renumbers siblings. Until the resulting attribute mutations
//! are replayed, two live nodes can briefly map to the same identity.

use std::fmt;
use std::str::FromStr;

use fos_dom::{DomTree, NodeId};
use serde::{Serialize, Serializer};

use crate::config::MarkerConfig;
use crate::{InspectorError, Result};

/// Dotted positional path of a component
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(Vec<usize>);

impl ComponentId {
    /// Identity of the root at `index`
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    /// Build from raw segments; `None` when empty
    pub fn from_segments(segments: Vec<usize>) -> Option<Self> {
        (!segments.is_empty()).then_some(Self(segments))
    }

    /// Parse a raw marker such as `0#2#1`
    pub fn from_marker(marker: &str, separator: char) -> Option<Self> {
        let segments = marker.trim()
            .split(separator)
            .map(|s| s.trim().parse::<usize>().ok())
            .collect::<Option<Vec<_>>>()?;
        Self::from_segments(segments)
    }

    pub fn segments(&self) -> &[usize] {
        &self.0
    }

    pub fn root_index(&self) -> usize {
        self.0[0]
    }

    /// Index within the parent's child list (or among roots)
    pub fn last_index(&self) -> usize {
        self.0[self.0.len() - 1]
    }

    /// Single-segment identities are roots
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// 0 for roots
    pub fn depth(&self) -> usize {
        self.0.len() - 1
    }

    pub fn parent(&self) -> Option<ComponentId> {
        if self.is_root() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn child(&self, index: usize) -> ComponentId {
        let mut segments = self.0.clone();
        segments.push(index);
        Self(segments)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for ComponentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let segments = s.split('.')
            .map(str::parse)
            .collect::<std::result::Result<Vec<usize>, _>>()?;
        // `split` never yields zero items, so segments is non-empty here.
        Ok(Self(segments))
    }
}

impl Serialize for ComponentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Raw marker string on a native handle
pub fn marker_of<'a>(surface: &'a DomTree, node: NodeId, marker: &MarkerConfig) -> Option<&'a str> {
    surface.get_attribute(node, &marker.attribute)
}

/// Derive the current identity of the component rendered at `node`.
///
/// Fails with `IdentityUnavailable` when the framework has not (yet) marked
/// the element or the marker is not a separator-delimited index sequence.
pub fn identity_of(surface: &DomTree, node: NodeId, marker: &MarkerConfig) -> Result<ComponentId> {
    let raw = marker_of(surface, node, marker).ok_or_else(|| {
        InspectorError::no_identity(node, format!("no `{}` attribute", marker.attribute))
    })?;

    ComponentId::from_marker(raw, marker.separator)
        .ok_or_else(|| InspectorError::no_identity(node, format!("malformed marker `{}`", raw)))
}

/// True iff the node's marker path has exactly one segment
pub fn is_root_marker(surface: &DomTree, node: NodeId, marker: &MarkerConfig) -> bool {
    identity_of(surface, node, marker).is_ok_and(|id| id.is_root())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_rewrite() {
        let id = ComponentId::from_marker("0#2#1", '#').unwrap();
        assert_eq!(id.to_string(), "0.2.1");
        assert_eq!(id.root_index(), 0);
        assert_eq!(id.last_index(), 1);
        assert_eq!(id.depth(), 2);
        assert_eq!(id.parent().unwrap().to_string(), "0.2");
        assert_eq!(ComponentId::root(3).child(4).to_string(), "3.4");
    }

    #[test]
    fn test_malformed_markers() {
        assert!(ComponentId::from_marker("", '#').is_none());
        assert!(ComponentId::from_marker("0##1", '#').is_none());
        assert!(ComponentId::from_marker("a#1", '#').is_none());
        assert!(ComponentId::from_marker("0.1", '#').is_none());
    }

    #[test]
    fn test_root_is_single_segment_not_literal_zero() {
        assert!(ComponentId::from_marker("7", '#').unwrap().is_root());
        assert!(!ComponentId::from_marker("1#0", '#').unwrap().is_root());
    }

    #[test]
    fn test_parse_and_serialize() {
        let id: ComponentId = "0.10.2".parse().unwrap();
        assert_eq!(id.segments(), &[0, 10, 2]);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"0.10.2\"");
        assert!("0..1".parse::<ComponentId>().is_err());
    }

    #[test]
    fn test_identity_of_reads_surface() {
        let mut tree = DomTree::new();
        let el = tree.create_element("todo-item");
        let marker = MarkerConfig::default();

        let err = identity_of(&tree, el, &marker).unwrap_err();
        assert!(matches!(err, InspectorError::IdentityUnavailable { .. }));

        tree.set_attribute(el, "data-ngid", "1#3").unwrap();
        assert_eq!(identity_of(&tree, el, &marker).unwrap().to_string(), "1.3");
        assert!(!is_root_marker(&tree, el, &marker));

        tree.set_attribute(el, "data-ngid", "1").unwrap();
        assert!(is_root_marker(&tree, el, &marker));
    }
}
