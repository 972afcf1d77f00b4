//! Component tree walker
//!
//! Pre-order depth-first traversal over live component children, in the
//! order the framework exposes them.
//!
//! There is no cycle detection. The framework keeps its component tree
//! acyclic (and `fos_dom` rejects cyclic insertions); a cycle here would be
//! a framework bug and is left to surface rather than be masked.
//!
//! The walk holds a shared borrow of the host for its whole duration, so a
//! visitor cannot mutate the tree it is walking.

use crate::host::{ComponentNode, Introspect};

/// Node handed to the visitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    pub node: ComponentNode,
    /// 0 for the entry node
    pub depth: usize,
}

impl Visit {
    pub fn is_entry(&self) -> bool {
        self.depth == 0
    }
}

/// Walk `root` and its descendants, calling `visit` once per node
pub fn walk<H, F>(host: &H, root: ComponentNode, mut visit: F)
where
    H: Introspect + ?Sized,
    F: FnMut(Visit),
{
    let mut stack = vec![Visit { node: root, depth: 0 }];

    while let Some(current) = stack.pop() {
        visit(current);

        let children = match host.children(current.node) {
            Ok(children) => children,
            Err(e) => {
                tracing::debug!(node = %current.node.native(), error = %e, "children unavailable, branch ends");
                continue;
            }
        };
        if children.is_empty() {
            continue;
        }

        stack.extend(
            children.into_iter()
                .rev()
                .map(|node| Visit { node, depth: current.depth + 1 }),
        );
    }
}

/// Collect the walk order; handy for full re-scans
pub fn collect<H: Introspect + ?Sized>(host: &H, root: ComponentNode) -> Vec<Visit> {
    let mut out = Vec::new();
    walk(host, root, |visit| out.push(visit));
    out
}
