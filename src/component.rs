//! Installed component (mod) metadata

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// An installed component, identified by `id`
///
/// `name` and `version` are descriptive only; identity comparisons across an
/// attribution run use [`ComponentMetadata::id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentMetadata {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

impl ComponentMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ComponentMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name.is_empty(), self.version.is_empty()) {
            (true, true) => write!(f, "{}", self.id),
            (false, true) => write!(f, "{} ({})", self.id, self.name),
            (true, false) => write!(f, "{} ({})", self.id, self.version),
            (false, false) => write!(f, "{} ({} {})", self.id, self.name, self.version),
        }
    }
}

/// Components in first-seen order, unique by identifier
///
/// A component inserted under an identifier already present is ignored, so
/// the first record seen for an identifier wins.
#[derive(Debug, Clone, Default)]
pub struct ComponentSet {
    components: Vec<ComponentMetadata>,
    ids: HashSet<String>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, component: ComponentMetadata) -> bool {
        if self.ids.contains(&component.id) {
            return false;
        }
        self.ids.insert(component.id.clone());
        self.components.push(component);
        true
    }

    pub fn extend<I: IntoIterator<Item = ComponentMetadata>>(&mut self, components: I) {
        for component in components {
            self.insert(component);
        }
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ComponentMetadata> {
        self.components.iter()
    }

    pub fn into_vec(self) -> Vec<ComponentMetadata> {
        self.components
    }
}
