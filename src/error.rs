//! Error taxonomy for unit resolution
//!
//! None of these are fatal to an attribution query: the resolver catches each
//! one, logs it when attribution debugging is on, and moves to the next unit.

use thiserror::Error;

/// Errors that can occur while resolving where a code unit came from
#[derive(Error, Debug)]
pub enum AttributionError {
    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("No defining location available for unit: {0}")]
    LocationUnavailable(String),

    #[error("Malformed location '{location}': {reason}")]
    MalformedLocation { location: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AttributionError {
    pub fn malformed(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedLocation {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the unit itself could not be introspected (as opposed to a
    /// bad location string)
    pub fn is_unresolvable_unit(&self) -> bool {
        matches!(self, Self::UnitNotFound(_) | Self::LocationUnavailable(_))
    }
}
