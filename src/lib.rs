//! culprit - attribute JVM failures to the installed mods that caused them
//!
//! Given a failure (with its causes and suppressed sub-failures), this crate
//! collects every code unit on the recorded call trails, finds the location
//! each unit was loaded from, and maps those locations to installed mods.
//!
//! ```
//! use culprit::component::ComponentMetadata;
//! use culprit::config::AttributionConfig;
//! use culprit::failure::{CallFrame, Throwable};
//! use culprit::identify::identify_components;
//! use culprit::index::ModIndex;
//! use culprit::location::LocationId;
//! use culprit::locator::ClassMapLocator;
//! use culprit::resolver::UnitOriginResolver;
//!
//! let mut locator = ClassMapLocator::new();
//! locator.insert_class("com.x.Foo", Some("jar:file:/mods/x.jar!/com/x/Foo.class".into()));
//!
//! let mut index = ModIndex::new();
//! index.insert(
//!     LocationId::parse("file:/mods/x.jar").unwrap(),
//!     ComponentMetadata::new("x", "X Mod", "1.0"),
//! );
//!
//! let failure = Throwable::new("java.lang.Error").with_frame(CallFrame::new("com.x.Foo"));
//! let resolver = UnitOriginResolver::new(&locator, &index, &AttributionConfig::default());
//! let mods = identify_components(&failure, &resolver);
//! assert_eq!(mods[0].id, "x");
//! ```

pub mod cli;
pub mod component;
pub mod config;
pub mod crash_report;
pub mod error;
pub mod failure;
pub mod fallback;
pub mod frames;
pub mod identify;
pub mod index;
pub mod location;
pub mod locator;
pub mod report;
pub mod resolver;
pub mod walker;
