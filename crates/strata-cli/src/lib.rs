//! Strata command-line front end
//!
//! Loads class-graph manifests and drives the engine for the `strata` binary.

pub mod commands;
pub mod manifest;

pub use manifest::{ClassSpec, Manifest, ManifestError};
