//! Build options
//!
//! Options are plain data with serde defaults so they can be embedded in a
//! TOML file (an `[options]` table of a class-graph manifest, or a standalone
//! file).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading options
#[derive(Debug, Error)]
pub enum OptionsError {
    /// Failed to read the options file
    #[error("Failed to read options file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse options: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid options: {0}")]
    ValidationError(String),
}

/// Options governing how classes are built and finalized
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuildOptions {
    /// Name of the implicit root class
    pub root_class: String,

    /// Inject the root class as a base of every class that does not opt out
    pub inject_root: bool,

    /// Check that constructors and destructors run on instances of their own class tree
    pub validate_constructor_self: bool,

    /// Seal member tables at finalize (classes marked `no_freeze` are never sealed)
    pub seal_classes: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            root_class: "Object".to_string(),
            inject_root: true,
            validate_constructor_self: true,
            seal_classes: true,
        }
    }
}

impl BuildOptions {
    /// Parse options from a file
    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse options from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, OptionsError> {
        let options: BuildOptions = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    /// Validate the options
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.root_class.trim().is_empty() {
            return Err(OptionsError::ValidationError(
                "root_class cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
