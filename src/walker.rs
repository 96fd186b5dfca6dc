//! Failure graph walker
//!
//! Visits a root failure and every failure reachable through suppressed
//! sub-failure edges, in pre-order. Uses an explicit work-list so deeply
//! nested aggregation cannot exhaust the stack, and tracks visited node
//! addresses so shared or cyclic edges are followed once.

use crate::failure::{node_identity, Failure};
use std::collections::HashSet;

/// Invoke `visitor` once for every failure reachable from `root` through
/// suppressed edges, root first
pub fn visit_failures<'a, F>(root: &'a dyn Failure, mut visitor: F)
where
    F: FnMut(&'a dyn Failure),
{
    let mut visited: HashSet<*const ()> = HashSet::new();
    let mut pending: Vec<&'a dyn Failure> = vec![root];

    while let Some(node) = pending.pop() {
        if !visited.insert(node_identity(node)) {
            continue;
        }
        visitor(node);

        // Reverse so the first suppressed child is popped next
        for child in node.suppressed().into_iter().rev() {
            if !visited.contains(&node_identity(child)) {
                pending.push(child);
            }
        }
    }
}

/// Flatten the aggregation tree rooted at `root` into visit order
pub fn collect_failures(root: &dyn Failure) -> Vec<&dyn Failure> {
    let mut nodes = Vec::new();
    visit_failures(root, |node| nodes.push(node));
    nodes
}
