//! Frame collection
//!
//! Walks a failure's primary-cause chain and gathers the code unit name of
//! every call frame, keeping first-seen order and dropping repeats.

use crate::failure::{node_identity, Failure};
use std::collections::HashSet;

/// Insertion-ordered set of code unit names
#[derive(Debug, Clone, Default)]
pub struct UnitSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl UnitSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a unit name; returns false if it was already present
    pub fn insert(&mut self, unit: &str) -> bool {
        if self.seen.contains(unit) {
            return false;
        }
        self.seen.insert(unit.to_string());
        self.order.push(unit.to_string());
        true
    }

    /// Append every unit of `other` not already present, keeping this set's
    /// order first
    pub fn merge(&mut self, other: &UnitSet) {
        for unit in other.iter() {
            self.insert(unit);
        }
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.seen.contains(unit)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<'a> IntoIterator for &'a UnitSet {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, String>, fn(&'a String) -> &'a str>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter().map(String::as_str as fn(&'a String) -> &'a str)
    }
}

/// Collect the unit names of `node` and of every failure on its cause chain
///
/// The node's own frames come first. A cause chain that loops back on itself
/// stops at the first repeated node.
pub fn collect_units(node: &dyn Failure) -> UnitSet {
    let mut units = UnitSet::new();
    let mut visited: HashSet<*const ()> = HashSet::new();
    let mut current = Some(node);

    while let Some(failure) = current {
        if !visited.insert(node_identity(failure)) {
            break;
        }
        for frame in failure.frames() {
            units.insert(&frame.unit);
        }
        current = failure.cause();
    }

    units
}
