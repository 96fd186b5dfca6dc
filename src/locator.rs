//! Unit introspection: where was a code unit loaded from?
//!
//! Outside the JVM we can't ask a class for its code source, so locators
//! answer from what the host environment exported: a class map written by
//! the launcher, or the classpath directories of a development run.

use crate::error::AttributionError;
use crate::location::{looks_like_url, LocationId};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Package prefixes of units that are part of the runtime itself and never
/// have a code source
pub const RUNTIME_PACKAGE_PREFIXES: &[&str] = &["java.", "javax.", "jdk.", "sun.", "com.sun."];

/// Resolves the location a code unit was defined from
pub trait UnitLocator {
    /// Raw location URL for `unit`, exactly as the runtime reports it
    ///
    /// # Errors
    /// [`AttributionError::UnitNotFound`] if the unit is unknown,
    /// [`AttributionError::LocationUnavailable`] if it is known but has no
    /// defining location.
    fn resolve_defining_location(&self, unit: &str) -> Result<String, AttributionError>;
}

fn is_runtime_unit(unit: &str) -> bool {
    RUNTIME_PACKAGE_PREFIXES
        .iter()
        .any(|prefix| unit.starts_with(prefix))
}

/// URLs are kept as written; filesystem paths become `file:` URLs
fn location_url(raw: &str, base: Option<&Path>) -> Result<String> {
    if raw.trim().is_empty() || looks_like_url(raw) {
        return Ok(raw.to_string());
    }
    let location = LocationId::parse_flexible(raw, base)
        .with_context(|| format!("Invalid class map location: {}", raw))?;
    Ok(location.as_str().to_string())
}

/// Name of the top-level unit enclosing a nested unit (`a.B$C` -> `a.B`)
fn outer_unit(unit: &str) -> Option<&str> {
    unit.split_once('$').map(|(outer, _)| outer)
}

/// Locator backed by an exported class map
///
/// # Example TOML
/// ```toml
/// [[class]]
/// name = "com.x.Foo"
/// location = "jar:file:/opt/mods/x.jar!/com/x/Foo.class"
///
/// [[package]]
/// prefix = "com.y."
/// location = "file:/opt/mods/y.jar"
///
/// # Plain paths are accepted too; relative ones resolve against the file
/// [[package]]
/// prefix = "com.w."
/// location = "mods/w.jar"
///
/// # Known, but loaded without a code source
/// [[class]]
/// name = "com.z.Generated"
/// ```
#[derive(Debug, Default)]
pub struct ClassMapLocator {
    classes: HashMap<String, Option<String>>,
    /// Sorted longest prefix first
    packages: Vec<(String, Option<String>)>,
}

#[derive(Deserialize)]
struct ClassMapFile {
    #[serde(rename = "class", default)]
    classes: Vec<ClassEntry>,
    #[serde(rename = "package", default)]
    packages: Vec<PackageEntry>,
}

#[derive(Deserialize)]
struct ClassEntry {
    name: String,
    location: Option<String>,
}

#[derive(Deserialize)]
struct PackageEntry {
    prefix: String,
    location: Option<String>,
}

impl ClassMapLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read class map: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content, path.as_ref().parent())
    }

    /// Parse a class map; relative path locations resolve against `base`
    pub fn from_toml_str(content: &str, base: Option<&Path>) -> Result<Self> {
        let file: ClassMapFile =
            toml::from_str(content).context("Failed to parse TOML class map")?;

        let mut locator = Self::new();
        for class in file.classes {
            let location = class.location.map(|l| location_url(&l, base)).transpose()?;
            locator.insert_class(class.name, location);
        }
        for package in file.packages {
            if package.prefix.is_empty() {
                anyhow::bail!("Class map package entry has an empty prefix");
            }
            let location = package.location.map(|l| location_url(&l, base)).transpose()?;
            locator.insert_package(package.prefix, location);
        }
        Ok(locator)
    }

    /// Map one unit to a location; `None` records a unit with no code source
    pub fn insert_class(&mut self, name: impl Into<String>, location: Option<String>) {
        self.classes.insert(name.into(), location);
    }

    /// Map every unit under `prefix` to a location
    pub fn insert_package(&mut self, prefix: impl Into<String>, location: Option<String>) {
        self.packages.push((prefix.into(), location));
        self.packages.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    fn lookup(&self, unit: &str) -> Option<&Option<String>> {
        if let Some(entry) = self.classes.get(unit) {
            return Some(entry);
        }
        if let Some(entry) = outer_unit(unit).and_then(|outer| self.classes.get(outer)) {
            return Some(entry);
        }
        self.packages
            .iter()
            .find(|(prefix, _)| unit.starts_with(prefix.as_str()))
            .map(|(_, location)| location)
    }
}

impl UnitLocator for ClassMapLocator {
    fn resolve_defining_location(&self, unit: &str) -> Result<String, AttributionError> {
        match self.lookup(unit) {
            Some(Some(location)) => Ok(location.clone()),
            Some(None) => Err(AttributionError::LocationUnavailable(unit.to_string())),
            None if is_runtime_unit(unit) => {
                Err(AttributionError::LocationUnavailable(unit.to_string()))
            }
            None => Err(AttributionError::UnitNotFound(unit.to_string())),
        }
    }
}

/// Locator that searches classpath directories for compiled class files
///
/// A unit found under a root is reported as defined by that root directory,
/// the way a directory entry on the JVM classpath is.
#[derive(Debug, Default)]
pub struct DirectoryLocator {
    roots: Vec<PathBuf>,
}

impl DirectoryLocator {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn class_file(unit: &str) -> Option<PathBuf> {
        if unit.is_empty() || unit.contains(['/', '\\']) || unit.split('.').any(str::is_empty) {
            return None;
        }
        let mut path: PathBuf = unit.split('.').collect();
        path.set_extension("class");
        Some(path)
    }

    fn root_url(root: &Path) -> Result<String, AttributionError> {
        let absolute = fs::canonicalize(root)?;
        Url::from_directory_path(&absolute)
            .map(String::from)
            .map_err(|()| AttributionError::malformed(absolute.display().to_string(), "not an absolute directory"))
    }
}

impl UnitLocator for DirectoryLocator {
    fn resolve_defining_location(&self, unit: &str) -> Result<String, AttributionError> {
        let candidates: Vec<PathBuf> = std::iter::once(unit)
            .chain(outer_unit(unit))
            .filter_map(Self::class_file)
            .collect();

        for root in &self.roots {
            if candidates.iter().any(|rel| root.join(rel).is_file()) {
                return Self::root_url(root);
            }
        }
        Err(AttributionError::UnitNotFound(unit.to_string()))
    }
}

/// Tries each locator in order; the first location found wins
#[derive(Default)]
pub struct LocatorChain {
    locators: Vec<Box<dyn UnitLocator>>,
}

impl LocatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, locator: Box<dyn UnitLocator>) {
        self.locators.push(locator);
    }

    pub fn with(mut self, locator: impl UnitLocator + 'static) -> Self {
        self.push(Box::new(locator));
        self
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

impl UnitLocator for LocatorChain {
    fn resolve_defining_location(&self, unit: &str) -> Result<String, AttributionError> {
        // "Not found" from one locator says nothing; any other error is more
        // informative and is what we report if nobody finds the unit
        let mut specific: Option<AttributionError> = None;
        for locator in &self.locators {
            match locator.resolve_defining_location(unit) {
                Ok(location) => return Ok(location),
                Err(AttributionError::UnitNotFound(_)) => {}
                Err(e) => {
                    specific.get_or_insert(e);
                }
            }
        }
        Err(specific.unwrap_or_else(|| AttributionError::UnitNotFound(unit.to_string())))
    }
}
