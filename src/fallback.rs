//! Fallback strategies for locations the index doesn't know directly
//!
//! Each strategy covers one environment quirk. The resolver runs them in
//! order after a direct index miss; the first one that claims a location
//! decides the outcome.

use crate::component::ComponentMetadata;
use crate::index::AttributionIndex;
use crate::location::LocationId;

/// Build output fragments and the resource directory fragment that replaces
/// them, applied in order. The first two cover Architectury projects, where
/// code compiles under `common/` but the mod metadata lives in the platform
/// project's resources.
pub const DEV_LAYOUT_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("common/build/classes/java/main", "fabric/build/resources/main"),
    ("common/build/classes/kotlin/main", "fabric/build/resources/main"),
    ("classes/java/main", "resources/main"),
    ("classes/kotlin/main", "resources/main"),
];

/// A strategy for attributing a location after a direct index miss
pub trait LocationFallback {
    /// Short name for diagnostics
    fn name(&self) -> &'static str;

    /// Attribute `location` (normalized from `raw`)
    ///
    /// `None` passes the location to the next strategy. `Some` ends the
    /// search, even when the set is empty.
    fn attribute(
        &self,
        raw: &str,
        location: &LocationId,
        index: &dyn AttributionIndex,
    ) -> Option<Vec<ComponentMetadata>>;
}

/// Locations synthesized by the mod loader as `<prefix><mod id>`, e.g.
/// `modjar://examplemod`
#[derive(Debug, Clone)]
pub struct SyntheticLocationFallback {
    prefix: String,
}

impl SyntheticLocationFallback {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Component id encoded in `raw`, if it uses this scheme
    pub fn component_id<'a>(&self, raw: &'a str) -> Option<&'a str> {
        let id = raw.strip_prefix(self.prefix.as_str())?.trim_end_matches('/');
        (!id.is_empty()).then_some(id)
    }
}

impl LocationFallback for SyntheticLocationFallback {
    fn name(&self) -> &'static str {
        "synthetic-location"
    }

    fn attribute(
        &self,
        raw: &str,
        location: &LocationId,
        index: &dyn AttributionIndex,
    ) -> Option<Vec<ComponentMetadata>> {
        // Archive-wrapped forms (`jar:modjar://id!/...`) only match once unwrapped
        let id = self
            .component_id(raw)
            .or_else(|| self.component_id(location.as_str()))?;
        Some(index.components_by_id(id))
    }
}

/// Local development builds register the resource directory of the mod
/// under test, while its classes load from the build output directory
#[derive(Debug, Clone)]
pub struct DevelopmentLayoutFallback {
    substitutions: Vec<(String, String)>,
}

impl Default for DevelopmentLayoutFallback {
    fn default() -> Self {
        Self {
            substitutions: DEV_LAYOUT_SUBSTITUTIONS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

impl DevelopmentLayoutFallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the resource directory corresponding to `path`
    pub fn rewrite(&self, path: &str) -> String {
        self.substitutions
            .iter()
            .fold(path.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to))
    }
}

impl LocationFallback for DevelopmentLayoutFallback {
    fn name(&self) -> &'static str {
        "development-layout"
    }

    fn attribute(
        &self,
        _raw: &str,
        location: &LocationId,
        index: &dyn AttributionIndex,
    ) -> Option<Vec<ComponentMetadata>> {
        let rewritten = self.rewrite(location.path());
        if rewritten == location.path() {
            return None;
        }
        index
            .lookup(&location.with_path(&rewritten))
            .map(<[ComponentMetadata]>::to_vec)
    }
}
