//! Failure attribution entry point
//!
//! Walks the suppressed-failure tree, collects the code units on every cause
//! chain into one ordered set, resolves each unit and merges the components
//! found, first seen first.

use crate::component::{ComponentMetadata, ComponentSet};
use crate::failure::Failure;
use crate::frames::{collect_units, UnitSet};
use crate::resolver::UnitOriginResolver;
use crate::walker::visit_failures;
use serde::Serialize;

/// Every code unit involved in `root`, across all cause chains of all
/// suppressed failures, in first-seen order
pub fn involved_units(root: &dyn Failure) -> UnitSet {
    let mut units = UnitSet::new();
    visit_failures(root, |node| units.merge(&collect_units(node)));
    units
}

/// Components responsible for `root`, deduplicated by id in first-seen order
///
/// Never fails: units that can't be resolved contribute nothing, and a
/// failure with no attributable code yields an empty list.
pub fn identify_components(
    root: &dyn Failure,
    resolver: &UnitOriginResolver<'_>,
) -> Vec<ComponentMetadata> {
    identify(root, resolver).components
}

/// Attribution of one failure, with per-unit provenance
#[derive(Debug, Clone, Default, Serialize)]
pub struct Attribution {
    /// Components in first-seen order, unique by id
    pub components: Vec<ComponentMetadata>,
    /// Units that contributed at least one component, with the ids they
    /// resolved to
    pub attributed_units: Vec<UnitAttribution>,
    /// Number of distinct units examined
    pub units_examined: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitAttribution {
    pub unit: String,
    pub components: Vec<String>,
}

/// Like [`identify_components`], additionally recording which units led to
/// which components
pub fn identify(root: &dyn Failure, resolver: &UnitOriginResolver<'_>) -> Attribution {
    let units = involved_units(root);
    let mut found = ComponentSet::new();
    let mut attributed_units = Vec::new();

    for unit in units.iter() {
        let Some(components) = resolver.resolve(unit) else {
            continue;
        };
        attributed_units.push(UnitAttribution {
            unit: unit.to_string(),
            components: components.iter().map(|c| c.id.clone()).collect(),
        });
        found.extend(components);
    }

    tracing::debug!(
        "Examined {} units, attributed {} components",
        units.len(),
        found.len()
    );

    Attribution {
        components: found.into_vec(),
        attributed_units,
        units_examined: units.len(),
    }
}
