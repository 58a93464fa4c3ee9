//! Layered UnrealScript source merger.
//!
//! This crate merges a vanilla source tree and an ordered list of mod trees
//! into one tree of compilable scripts. It supports:
//!
//! - **Conditional compilation**: `#ifdef`/`#ifndef`/`#elseif`/`#else`/`#endif`
//!   blocks, `#compileif`/`#dontcompileif` file gates and inline `#var`,
//!   `#defined`, `#bool` and `#switch` macros, all line-count preserving
//! - **Layer system**: later layers replace earlier classes with the same
//!   qualified id (`namespace.classname`)
//! - **Mod-layer operators**: `injects`, `overwrites`, `merges` and `shims`
//!   headers are indexed by the class they target, and `injects` is demoted to
//!   `extends` unless the `injections` flag is defined
//! - **Subclass index**: every `extends` edge of the run, queryable transitively
//!
//! # Example
//!
//! ```no_run
//! use ucm_merge::{write_merged, DefinitionSet, MergeBuilder};
//! use camino::Utf8Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let definitions = DefinitionSet::new().with("vanilla", "true");
//!
//! let outcome = MergeBuilder::new(definitions)
//!     .with_vanilla("C:/DeusEx/Source")
//!     .with_mod("C:/mods/Randomizer")
//!     .build()?;
//!
//! for subclass in outcome.index.get_subclasses("ScriptedPawn") {
//!     println!("{subclass}");
//! }
//! write_merged(&outcome.index, Utf8Path::new("C:/DeusEx/Build"))?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod classify;
pub mod condition;
pub mod decode;
pub mod definitions;
pub mod error;
pub mod header;
pub mod index;
pub mod preprocessor;
pub mod reader;
pub mod unit;
pub mod writer;

// Re-export main types
pub use builder::{LayerReport, MergeBuilder, MergeOutcome, MergeStats, SkippedFile};
pub use classify::{Classification, Location, PathClassifier};
pub use definitions::DefinitionSet;
pub use error::{Error, Result};
pub use header::{parse_header, ClassHeader, InheritanceOperator};
pub use index::MergeIndex;
pub use preprocessor::{preprocess, Preprocessed, SkipReason};
pub use reader::{read_ancillary_unit, read_source_unit, ReadOutcome};
pub use unit::{AncillaryUnit, AssetPayload, Layer, MergeUnit, SourceUnit};
pub use writer::write_merged;
