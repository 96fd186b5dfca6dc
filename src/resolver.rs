//! Unit origin resolution
//!
//! Maps one code unit name to the components installed where it was loaded
//! from:
//!
//! 1. denylisted units (shared libraries every mod vendors) are skipped
//! 2. the locator reports the unit's defining location
//! 3. the location is normalized to a [`LocationId`]
//! 4. the index is queried directly
//! 5. fallback strategies get a turn, in order
//!
//! Every failure along the way is contained to the unit being resolved.

use crate::component::ComponentMetadata;
use crate::config::AttributionConfig;
use crate::error::AttributionError;
use crate::fallback::{DevelopmentLayoutFallback, LocationFallback, SyntheticLocationFallback};
use crate::index::AttributionIndex;
use crate::location::LocationId;
use crate::locator::UnitLocator;

/// Debug-level diagnostics, emitted only when attribution debugging is on
macro_rules! attribution_debug {
    ($resolver:expr, $($arg:tt)+) => {
        if $resolver.config.debug_attribution_logging {
            tracing::debug!($($arg)+);
        }
    };
}

/// Resolves code units to the components that supplied them
pub struct UnitOriginResolver<'a> {
    locator: &'a dyn UnitLocator,
    index: &'a dyn AttributionIndex,
    config: AttributionConfig,
    fallbacks: Vec<Box<dyn LocationFallback>>,
}

impl<'a> UnitOriginResolver<'a> {
    /// Resolver with the fallbacks `config` calls for: the synthetic
    /// location scheme always, the development layout rewrite only in
    /// development mode
    pub fn new(
        locator: &'a dyn UnitLocator,
        index: &'a dyn AttributionIndex,
        config: &AttributionConfig,
    ) -> Self {
        let mut fallbacks: Vec<Box<dyn LocationFallback>> = vec![Box::new(
            SyntheticLocationFallback::new(config.synthetic_location_prefix.clone()),
        )];
        if config.development_mode {
            fallbacks.push(Box::new(DevelopmentLayoutFallback::new()));
        }

        Self {
            locator,
            index,
            config: config.clone(),
            fallbacks,
        }
    }

    /// Append a fallback strategy after the built-in ones
    pub fn with_fallback(mut self, fallback: Box<dyn LocationFallback>) -> Self {
        self.fallbacks.push(fallback);
        self
    }

    pub fn fallback_names(&self) -> Vec<&'static str> {
        self.fallbacks.iter().map(|f| f.name()).collect()
    }

    pub fn is_denylisted(&self, unit: &str) -> bool {
        self.config.is_denylisted(unit)
    }

    /// Components that supplied `unit`
    ///
    /// Returns `None` when no attribution is possible. A returned set is
    /// never empty.
    pub fn resolve(&self, unit: &str) -> Option<Vec<ComponentMetadata>> {
        attribution_debug!(self, "Analyzing {}", unit);

        if self.is_denylisted(unit) {
            attribution_debug!(
                self,
                "Ignoring {} for identification: it belongs to a shared library",
                unit
            );
            return None;
        }

        match self.try_resolve(unit) {
            Ok(Some(components)) if !components.is_empty() => {
                attribution_debug!(
                    self,
                    "{} attributed to {}",
                    unit,
                    components.iter().map(|c| c.id.as_str()).collect::<Vec<_>>().join(", ")
                );
                Some(components)
            }
            Ok(_) => {
                attribution_debug!(self, "No component found for {}", unit);
                None
            }
            Err(e) if e.is_unresolvable_unit() => {
                attribution_debug!(
                    self,
                    "Ignoring {} for identification: its code source could not be found ({})",
                    unit,
                    e
                );
                None
            }
            Err(e) => {
                attribution_debug!(
                    self,
                    "Ignoring {} for identification because an error occurred: {}",
                    unit,
                    e
                );
                None
            }
        }
    }

    fn try_resolve(&self, unit: &str) -> Result<Option<Vec<ComponentMetadata>>, AttributionError> {
        let raw = self.locator.resolve_defining_location(unit)?;
        if raw.trim().is_empty() {
            return Err(AttributionError::LocationUnavailable(unit.to_string()));
        }

        let location = LocationId::parse(&raw)?;
        attribution_debug!(self, "{} loaded from {}", unit, location);

        if let Some(components) = self.index.lookup(&location) {
            return Ok(Some(components.to_vec()));
        }

        for fallback in &self.fallbacks {
            if let Some(components) = fallback.attribute(&raw, &location, self.index) {
                attribution_debug!(
                    self,
                    "{} resolved {} by {} fallback",
                    location,
                    unit,
                    fallback.name()
                );
                return Ok(Some(components));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ModIndex;
    use crate::locator::ClassMapLocator;
    use std::sync::{Arc, Mutex};

    fn loc(raw: &str) -> LocationId {
        LocationId::parse(raw).unwrap()
    }

    fn component(id: &str) -> ComponentMetadata {
        ComponentMetadata::new(id, id.to_uppercase(), "1.0")
    }

    fn fixture() -> (ClassMapLocator, ModIndex) {
        let mut locator = ClassMapLocator::new();
        locator.insert_class(
            "com.x.Foo",
            Some("jar:file:/opt/mods/x.jar!/com/x/Foo.class".to_string()),
        );
        locator.insert_class("com.shared.Util", Some("file:/opt/mods/bundle.jar".to_string()));
        locator.insert_class(
            "org.spongepowered.asm.mixin.transformer.Proxy",
            Some("file:/opt/mods/x.jar".to_string()),
        );
        locator.insert_class("net.forge.Loaded", Some("modjar://forgemod".to_string()));
        locator.insert_class(
            "com.dev.Thing",
            Some("file:/dev/proj/build/classes/java/main/".to_string()),
        );
        locator.insert_class("com.bad.Location", Some("jar:file:/opt/mods/broken.jar".to_string()));
        locator.insert_class("com.empty.Location", Some(String::new()));

        let mut index = ModIndex::new();
        index.insert(loc("file:/opt/mods/x.jar"), component("x"));
        index.insert(loc("file:/opt/mods/bundle.jar"), component("a"));
        index.insert(loc("file:/opt/mods/bundle.jar"), component("b"));
        index.insert(loc("file:/opt/mods/forge.jar"), component("forgemod"));
        index.insert(loc("file:/dev/proj/build/resources/main"), component("devmod"));
        (locator, index)
    }

    fn ids(components: Option<Vec<ComponentMetadata>>) -> Option<Vec<String>> {
        components.map(|cs| cs.into_iter().map(|c| c.id).collect())
    }

    #[test]
    fn test_direct_lookup() {
        let (locator, index) = fixture();
        let resolver = UnitOriginResolver::new(&locator, &index, &AttributionConfig::default());
        assert_eq!(ids(resolver.resolve("com.x.Foo")), Some(vec!["x".to_string()]));
    }

    #[test]
    fn test_shared_location_returns_all() {
        let (locator, index) = fixture();
        let resolver = UnitOriginResolver::new(&locator, &index, &AttributionConfig::default());
        assert_eq!(
            ids(resolver.resolve("com.shared.Util")),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_denylisted_unit_skipped_even_if_indexed() {
        let (locator, index) = fixture();
        let resolver = UnitOriginResolver::new(&locator, &index, &AttributionConfig::default());
        assert!(resolver.is_denylisted("org.spongepowered.asm.mixin.transformer.Proxy"));
        assert_eq!(resolver.resolve("org.spongepowered.asm.mixin.transformer.Proxy"), None);
    }

    #[test]
    fn test_synthetic_location() {
        let (locator, index) = fixture();
        let resolver = UnitOriginResolver::new(&locator, &index, &AttributionConfig::default());
        assert_eq!(
            ids(resolver.resolve("net.forge.Loaded")),
            Some(vec!["forgemod".to_string()])
        );
    }

    #[test]
    fn test_synthetic_location_inside_archive_url() {
        let (mut locator, index) = fixture();
        locator.insert_class(
            "net.forge.Wrapped",
            Some("jar:modjar://forgemod!/net/forge/Wrapped.class".to_string()),
        );
        let resolver = UnitOriginResolver::new(&locator, &index, &AttributionConfig::default());
        assert_eq!(
            ids(resolver.resolve("net.forge.Wrapped")),
            Some(vec!["forgemod".to_string()])
        );
    }

    #[test]
    fn test_dev_layout_only_in_development_mode() {
        let (locator, index) = fixture();

        let resolver = UnitOriginResolver::new(&locator, &index, &AttributionConfig::default());
        assert_eq!(resolver.resolve("com.dev.Thing"), None);

        let config = AttributionConfig {
            development_mode: true,
            ..AttributionConfig::default()
        };
        let resolver = UnitOriginResolver::new(&locator, &index, &config);
        assert_eq!(
            resolver.fallback_names(),
            vec!["synthetic-location", "development-layout"]
        );
        assert_eq!(
            ids(resolver.resolve("com.dev.Thing")),
            Some(vec!["devmod".to_string()])
        );
    }

    #[test]
    fn test_failures_are_contained() {
        let (locator, index) = fixture();
        let config = AttributionConfig {
            debug_attribution_logging: true,
            ..AttributionConfig::default()
        };
        let resolver = UnitOriginResolver::new(&locator, &index, &config);

        assert_eq!(resolver.resolve("com.bad.Location"), None);
        assert_eq!(resolver.resolve("com.empty.Location"), None);
        assert_eq!(resolver.resolve("com.never.Seen"), None);
        assert_eq!(resolver.resolve("java.lang.Thread"), None);
        // Still works after failures
        assert!(resolver.resolve("com.x.Foo").is_some());
    }

    #[test]
    fn test_unknown_synthetic_id_is_unattributed() {
        let mut locator = ClassMapLocator::new();
        locator.insert_class("a.B", Some("modjar://ghost".to_string()));
        let index = ModIndex::new();
        let resolver = UnitOriginResolver::new(&locator, &index, &AttributionConfig::default());
        assert_eq!(resolver.resolve("a.B"), None);
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl CapturedLog {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Resolve `units` under a DEBUG-level subscriber and return what it logged
    fn logged_while_resolving(config: &AttributionConfig, units: &[&str]) -> String {
        let (locator, index) = fixture();
        let resolver = UnitOriginResolver::new(&locator, &index, config);
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            for unit in units {
                resolver.resolve(unit);
            }
        });
        log.contents()
    }

    const NOISY_UNITS: &[&str] = &[
        "com.x.Foo",
        "com.bad.Location",
        "com.never.Seen",
        "org.spongepowered.asm.mixin.transformer.Proxy",
    ];

    #[test]
    fn test_diagnostics_silent_by_default() {
        let logged = logged_while_resolving(&AttributionConfig::default(), NOISY_UNITS);
        assert!(logged.is_empty(), "unexpected output: {}", logged);
    }

    #[test]
    fn test_diagnostics_when_enabled() {
        let config = AttributionConfig {
            debug_attribution_logging: true,
            ..AttributionConfig::default()
        };
        let logged = logged_while_resolving(&config, NOISY_UNITS);
        assert!(logged.contains("Analyzing com.x.Foo"));
        assert!(logged.contains("com.x.Foo attributed to x"));
        assert!(logged.contains("Ignoring com.bad.Location for identification because an error occurred"));
        assert!(logged.contains("Ignoring com.never.Seen for identification: its code source could not be found"));
        assert!(logged.contains("belongs to a shared library"));
    }

    struct AlwaysClaims;

    impl LocationFallback for AlwaysClaims {
        fn name(&self) -> &'static str {
            "always"
        }

        fn attribute(
            &self,
            _raw: &str,
            _location: &LocationId,
            _index: &dyn AttributionIndex,
        ) -> Option<Vec<ComponentMetadata>> {
            Some(vec![ComponentMetadata::new("catchall", "", "")])
        }
    }

    #[test]
    fn test_custom_fallback_runs_last() {
        let (locator, index) = fixture();
        let resolver = UnitOriginResolver::new(&locator, &index, &AttributionConfig::default())
            .with_fallback(Box::new(AlwaysClaims));

        // Direct hits and earlier fallbacks are untouched
        assert_eq!(ids(resolver.resolve("com.x.Foo")), Some(vec!["x".to_string()]));
        assert_eq!(
            ids(resolver.resolve("net.forge.Loaded")),
            Some(vec!["forgemod".to_string()])
        );
        // Misses reach the custom strategy
        assert_eq!(
            ids(resolver.resolve("com.dev.Thing")),
            Some(vec!["catchall".to_string()])
        );
        // Unresolvable units never reach any fallback
        assert_eq!(resolver.resolve("com.never.Seen"), None);
    }
}
