//! Class-graph manifest parsing
//!
//! A manifest describes a class graph in TOML so it can be checked without
//! writing Rust. Methods listed in a manifest are synthetic: calling one
//! returns the string `"<Class>.<member>"`.
//!
//! ```toml
//! [options]
//! root_class = "Object"
//!
//! [[class]]
//! name = "Animal"
//! methods = ["speak"]
//! virtual = ["speak"]
//! declare = ["sound"]
//!
//! [[class]]
//! name = "Dog"
//! bases = ["Animal"]
//! methods = ["speak"]
//! constants = { legs = 4 }
//!
//! [implement]
//! Animal = ["sound"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_engine::{
    method, AttributeDirective, AttributeKind, BuildDirector, BuildOptions, ClassBlueprint,
    ClassError, ClassResult, Method, Value,
};
use thiserror::Error;

/// Errors that can occur while loading a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read manifest file
    #[error("Failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid manifest: {0}")]
    ValidationError(String),

    /// The engine rejected a class or implementation
    #[error("{0}")]
    Class(#[from] ClassError),
}

/// Class-graph manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    /// Build options
    #[serde(default)]
    pub options: BuildOptions,

    /// Classes in registration order
    #[serde(default, rename = "class")]
    pub classes: Vec<ClassSpec>,

    /// Class name → members implemented against that class
    #[serde(default)]
    pub implement: BTreeMap<String, Vec<String>>,
}

/// One `[[class]]` entry
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassSpec {
    /// Class name
    pub name: String,
    /// Direct bases, by name
    pub bases: Vec<String>,
    /// Concrete methods
    pub methods: Vec<String>,
    /// Members marked virtual
    #[serde(rename = "virtual")]
    pub virtual_members: Vec<String>,
    /// Abstract members
    pub pure_virtual: Vec<String>,
    /// Forward-declared members
    pub declare: Vec<String>,
    /// Class constants
    pub constants: BTreeMap<String, Value>,
    /// Give the class a constructor
    pub constructor: bool,
    /// Give the class a destructor
    pub destructor: bool,
    /// Keep the member table writable after finalize
    pub no_freeze: bool,
    /// Do not inherit from the root class
    pub without_root: bool,
}

impl Manifest {
    /// Load manifest from file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse manifest from string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest shape. Graph rules are left to the engine.
    pub fn validate(&self) -> Result<(), ManifestError> {
        self.options
            .validate()
            .map_err(|e| ManifestError::ValidationError(e.to_string()))?;

        for (i, class) in self.classes.iter().enumerate() {
            if class.name.trim().is_empty() {
                return Err(ManifestError::ValidationError(format!(
                    "class #{} has no name",
                    i + 1
                )));
            }
        }

        for name in self.implement.keys() {
            if !self.classes.iter().any(|c| &c.name == name) {
                return Err(ManifestError::ValidationError(format!(
                    "[implement] names unknown class '{}'",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Build every class and register every implementation.
    ///
    /// The returned director is still open; call `finalize_all` on it.
    pub fn build(&self) -> Result<BuildDirector, ManifestError> {
        let mut director = BuildDirector::with_options(self.options.clone())?;

        for class in &self.classes {
            director.add_class(class.blueprint(), [])?;
        }

        for (class_name, members) in &self.implement {
            let class = director
                .class(class_name)
                .cloned()
                .ok_or_else(|| ClassError::UnknownClass(class_name.clone()))?;
            let implementations: Vec<(String, Method)> = members
                .iter()
                .map(|member| (member.clone(), synthetic(class_name, member)))
                .collect();
            director.implement(&class, implementations)?;
        }

        tracing::debug!(
            classes = self.classes.len(),
            implemented = self.implement.values().map(Vec::len).sum::<usize>(),
            "manifest loaded"
        );
        Ok(director)
    }
}

impl ClassSpec {
    /// Convert to an engine blueprint.
    ///
    /// Attributes are written as raw `@kind:member` keys, the same form a
    /// hand-written member table would carry.
    pub fn blueprint(&self) -> ClassBlueprint {
        let mut blueprint = ClassBlueprint::new(self.name.clone());
        if self.without_root {
            blueprint = blueprint.without_root();
        }
        for base in &self.bases {
            blueprint = blueprint.with_base(base.as_str());
        }

        for name in &self.methods {
            blueprint.insert(name.clone(), synthetic(&self.name, name));
        }
        for (name, value) in &self.constants {
            blueprint.insert(name.clone(), value.clone());
        }

        let member_directives = [
            (AttributeKind::Virtual, &self.virtual_members),
            (AttributeKind::PureVirtual, &self.pure_virtual),
            (AttributeKind::Declaration, &self.declare),
        ];
        for (kind, targets) in member_directives {
            for target in targets {
                let key = AttributeDirective::member(kind, target.clone()).key();
                blueprint.insert(key, Value::Bool(true));
            }
        }
        if self.no_freeze {
            let key = AttributeDirective::class(AttributeKind::NoFreeze).key();
            blueprint.insert(key, Value::Bool(true));
        }

        if self.constructor {
            let class = self.name.clone();
            blueprint = blueprint.constructor(move |this, args| {
                this.set("constructed_by", class.as_str());
                this.set("args", Value::List(args.to_vec()));
                Ok(Value::Null)
            });
        }
        if self.destructor {
            blueprint = blueprint.destructor(|_, _| Ok(Value::Null));
        }
        blueprint
    }
}

/// Method returning `"<Class>.<member>"`
pub fn synthetic(class: &str, member: &str) -> Method {
    let label = format!("{}.{}", class, member);
    method(move |_, _| -> ClassResult<Value> { Ok(Value::from(label.as_str())) })
}
