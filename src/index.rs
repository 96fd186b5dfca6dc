//! Installed component index
//!
//! Maps normalized locations to the components installed there, and component
//! ids back to their metadata. [`ModIndex`] is loaded from a TOML mod list.

use crate::component::ComponentMetadata;
use crate::location::LocationId;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Read-only mapping from code locations to the components installed there
///
/// Populated once at startup by whoever enumerates the installed components;
/// attribution only ever queries it.
pub trait AttributionIndex {
    /// Every component registered at `location`, or `None` if the location is
    /// not known
    fn lookup(&self, location: &LocationId) -> Option<&[ComponentMetadata]>;

    /// Metadata records registered under a raw component identifier
    fn components_by_id(&self, id: &str) -> Vec<ComponentMetadata>;
}

/// Mod index loaded from a TOML listing of installed mods
///
/// # Example TOML
/// ```toml
/// [[mod]]
/// id = "examplemod"
/// name = "Example Mod"
/// version = "1.2.0"
/// location = "mods/example.jar"
/// ```
#[derive(Debug, Default)]
pub struct ModIndex {
    by_location: HashMap<LocationId, Vec<ComponentMetadata>>,
    by_id: HashMap<String, Vec<ComponentMetadata>>,
}

#[derive(Deserialize)]
struct ModFile {
    #[serde(rename = "mod", default)]
    mods: Vec<ModEntry>,
}

#[derive(Deserialize)]
struct ModEntry {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
    location: String,
}

impl ModIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index from a TOML file; relative locations resolve against
    /// the file's directory
    ///
    /// # Errors
    /// Returns error if the file can't be read, isn't valid TOML, or lists a
    /// location that can't be normalized.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read mod index: {}", path.display()))?;
        Self::from_toml_str(&content, path.parent())
    }

    pub fn from_toml_str(content: &str, base: Option<&Path>) -> Result<Self> {
        let file: ModFile =
            toml::from_str(content).context("Failed to parse TOML mod index")?;

        let mut index = Self::new();
        for entry in file.mods {
            if entry.id.is_empty() {
                anyhow::bail!("Mod entry at '{}' has an empty id", entry.location);
            }
            let location = LocationId::parse_flexible(&entry.location, base)
                .with_context(|| format!("Invalid location for mod '{}'", entry.id))?;
            index.insert(
                location,
                ComponentMetadata::new(entry.id, entry.name, entry.version),
            );
        }

        tracing::debug!(
            "Loaded mod index: {} locations, {} mod ids",
            index.by_location.len(),
            index.by_id.len()
        );
        Ok(index)
    }

    /// Register `component` at `location`
    ///
    /// A location may host several components; registering the same id twice
    /// at one location keeps the first record.
    pub fn insert(&mut self, location: LocationId, component: ComponentMetadata) {
        let at_location = self.by_location.entry(location).or_default();
        if !at_location.iter().any(|c| c.id == component.id) {
            at_location.push(component.clone());
        }

        let with_id = self.by_id.entry(component.id.clone()).or_default();
        if !with_id.contains(&component) {
            with_id.push(component);
        }
    }

    pub fn locations(&self) -> impl Iterator<Item = &LocationId> {
        self.by_location.keys()
    }

    pub fn location_count(&self) -> usize {
        self.by_location.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_location.is_empty()
    }
}

impl AttributionIndex for ModIndex {
    fn lookup(&self, location: &LocationId) -> Option<&[ComponentMetadata]> {
        self.by_location.get(location).map(Vec::as_slice)
    }

    fn components_by_id(&self, id: &str) -> Vec<ComponentMetadata> {
        self.by_id.get(id).cloned().unwrap_or_default()
    }
}
