//! Attribution configuration
//!
//! Everything here is supplied by the host environment (a config file and
//! CLI flags); attribution only reads it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Package prefix of the Mixin bytecode transformation library. Every mod
/// ships its own copy, so frames inside it say nothing about which mod failed.
pub const MIXIN_PACKAGE_PREFIX: &str = "org.spongepowered.asm.mixin.";

/// Location prefix Forge uses for classes served from a mod's in-memory jar
pub const MODJAR_LOCATION_PREFIX: &str = "modjar://";

/// Configuration for failure attribution
///
/// # Example
/// ```
/// use culprit::config::AttributionConfig;
///
/// let config = AttributionConfig::default();
/// assert!(!config.development_mode);
/// assert_eq!(config.synthetic_location_prefix, "modjar://");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    /// Emit per-unit resolution diagnostics at debug level
    pub debug_attribution_logging: bool,

    /// The game runs from a local development build; enables rewriting build
    /// output directories to their resource directories
    pub development_mode: bool,

    /// Units whose name starts with any of these prefixes are never attributed
    pub denylist_prefixes: Vec<String>,

    /// Location prefix followed directly by a component id
    pub synthetic_location_prefix: String,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            debug_attribution_logging: false,
            development_mode: false,
            denylist_prefixes: vec![MIXIN_PACKAGE_PREFIX.to_string()],
            synthetic_location_prefix: MODJAR_LOCATION_PREFIX.to_string(),
        }
    }
}

impl AttributionConfig {
    /// Load configuration from a TOML file; absent keys keep their defaults
    ///
    /// # Example TOML
    /// ```toml
    /// debug_attribution_logging = true
    /// development_mode = false
    /// denylist_prefixes = ["org.spongepowered.asm.mixin.", "kotlin."]
    /// ```
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML attribution config")
    }

    /// Whether `unit` falls under a denylisted prefix
    pub fn is_denylisted(&self, unit: &str) -> bool {
        self.denylist_prefixes
            .iter()
            .any(|prefix| unit.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AttributionConfig::default();
        assert!(!config.debug_attribution_logging);
        assert!(!config.development_mode);
        assert_eq!(config.denylist_prefixes, vec![MIXIN_PACKAGE_PREFIX]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AttributionConfig::from_toml_str("development_mode = true").unwrap();
        assert!(config.development_mode);
        assert!(!config.debug_attribution_logging);
        assert_eq!(config.synthetic_location_prefix, MODJAR_LOCATION_PREFIX);
    }

    #[test]
    fn test_denylist() {
        let config = AttributionConfig::default();
        assert!(config.is_denylisted("org.spongepowered.asm.mixin.transformer.MixinProcessor"));
        assert!(!config.is_denylisted("org.spongepowered.asm.launch.Phase"));
        assert!(!config.is_denylisted("com.x.Foo"));
    }

    #[test]
    fn test_custom_denylist_replaces_default() {
        let config = AttributionConfig::from_toml_str(r#"denylist_prefixes = ["kotlin."]"#).unwrap();
        assert!(config.is_denylisted("kotlin.collections.ArraysKt"));
        assert!(!config.is_denylisted("org.spongepowered.asm.mixin.Mixins"));
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "debug_attribution_logging = true").unwrap();
        let config = AttributionConfig::from_toml(file.path()).unwrap();
        assert!(config.debug_attribution_logging);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(AttributionConfig::from_toml_str("development_mode = \"yes\"").is_err());
        assert!(AttributionConfig::from_toml("/nonexistent/culprit.toml").is_err());
    }
}
