//! Attribution report output (text and JSON)

use crate::component::ComponentMetadata;
use crate::failure::Throwable;
use crate::identify::{Attribution, UnitAttribution};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write;

/// JSON document for one analyzed failure
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    /// Root failure header (`type: message`)
    pub failure: String,
    /// Distinct code units examined
    pub units_examined: usize,
    /// Suspected components, most relevant first
    pub components: &'a [ComponentMetadata],
    /// Which units led to which components
    pub attributed_units: &'a [UnitAttribution],
}

impl<'a> JsonReport<'a> {
    pub fn new(failure: &Throwable, attribution: &'a Attribution) -> Self {
        Self {
            failure: failure.header(),
            units_examined: attribution.units_examined,
            components: &attribution.components,
            attributed_units: &attribution.attributed_units,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize attribution report")
    }
}

/// Human-readable summary
pub fn render_text(failure: &Throwable, attribution: &Attribution, verbose: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Failure: {}", failure.header());

    if attribution.components.is_empty() {
        let _ = writeln!(
            out,
            "No suspected mods ({} code units examined)",
            attribution.units_examined
        );
        return out;
    }

    let _ = writeln!(out, "Suspected mods:");
    for component in &attribution.components {
        let _ = writeln!(out, "  {}", component);
    }

    if verbose {
        let _ = writeln!(out);
        let _ = writeln!(out, "Attributed code units:");
        let _ = writeln!(out, "─────────────────────────────────────────");
        for unit in &attribution.attributed_units {
            let _ = writeln!(out, "{} -> {}", unit.unit, unit.components.join(", "));
        }
        let _ = writeln!(out, "─────────────────────────────────────────");
    }
    out
}
