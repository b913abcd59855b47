//! Build director: the process-wide class registry
//!
//! The director owns every class builder and runs the global two-phase
//! commit. While `Open` it accepts classes and implementations; a single
//! successful [`BuildDirector::finalize_all`] seals the whole graph and
//! enables instance creation. Nothing may be added afterwards.
//!
//! There is no ambient singleton: construct one director at start-up and pass
//! it by reference. Registration is expected to run on one thread; wrap the
//! director in a [`SharedDirector`] if several threads register classes.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::blueprint::{BaseRef, ClassBlueprint, Method};
use crate::builder::{BuildScope, ClassBuilder};
use crate::class::{ClassHandle, ClassId, ClassRecord};
use crate::error::{ClassError, ClassResult, UnresolvedMembers};
use crate::options::BuildOptions;
use crate::registry::ClassIndex;
use crate::root::root_blueprint;

/// Director lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepting classes and implementations
    Open,
    /// Sealed; terminal
    Finalized,
}

/// Director shared between registering threads
pub type SharedDirector = Arc<Mutex<BuildDirector>>;

/// Process-wide class registry and finalize orchestrator
pub struct BuildDirector {
    options: BuildOptions,
    phase: Phase,
    index: ClassIndex,
    /// One builder per class, indexed by class ID
    builders: Vec<ClassBuilder>,
    root: Option<ClassHandle>,
}

impl BuildDirector {
    /// Create a director with default options
    pub fn new() -> Self {
        // Building the root fails only on an empty or taken name; the
        // default name is valid and the index starts empty.
        Self::with_options(BuildOptions::default())
            .expect("default root class always builds")
    }

    /// Create a director; builds the root class immediately
    pub fn with_options(options: BuildOptions) -> ClassResult<Self> {
        let mut director = Self {
            options,
            phase: Phase::Open,
            index: ClassIndex::new(),
            builders: Vec::new(),
            root: None,
        };
        let root = director.add_class(root_blueprint(&director.options.root_class), [])?;
        director.root = Some(root);
        Ok(director)
    }

    /// Wrap into a [`SharedDirector`]
    pub fn into_shared(self) -> SharedDirector {
        Arc::new(Mutex::new(self))
    }

    /// Options in effect
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the global barrier has been passed
    pub fn is_finalized(&self) -> bool {
        self.phase == Phase::Finalized
    }

    /// The implicit root class
    pub fn root(&self) -> Option<&ClassHandle> {
        self.root.as_ref()
    }

    /// Look up a class by name
    pub fn class(&self, name: &str) -> Option<&ClassHandle> {
        self.index.get_by_name(name)
    }

    /// Look up a class by ID
    pub fn class_by_id(&self, id: ClassId) -> Option<&ClassHandle> {
        self.index.get(id)
    }

    /// All classes in registration order, root first
    pub fn classes(&self) -> impl Iterator<Item = &ClassHandle> {
        self.index.iter()
    }

    /// Number of registered classes, root included
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if no class is registered
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Build and register a class.
    ///
    /// `bases` are added to any bases the blueprint already lists. The
    /// returned class cannot create instances until [`finalize_all`](Self::finalize_all).
    pub fn add_class(
        &mut self,
        blueprint: ClassBlueprint,
        bases: impl IntoIterator<Item = BaseRef>,
    ) -> ClassResult<ClassHandle> {
        self.ensure_open()?;

        let scope = BuildScope {
            index: &self.index,
            root: self.root.as_ref(),
            options: &self.options,
        };
        let builder = ClassBuilder::build(blueprint, bases.into_iter().collect(), &scope)?;

        let record = builder.record().clone();
        self.index.register(record.clone());
        self.builders.push(builder);
        Ok(record)
    }

    /// Bind an implementation to a declared or pure-virtual member of `class`
    pub fn register_implementation(
        &mut self,
        class: &ClassRecord,
        member: &str,
        implementation: Method,
    ) -> ClassResult<()> {
        self.ensure_open()?;
        self.builder_mut(class)?
            .register_implementation(member, implementation)
    }

    /// Bind a whole name → implementation mapping.
    ///
    /// Every name is validated before any is bound.
    pub fn implement<N: Into<String>>(
        &mut self,
        class: &ClassRecord,
        implementations: impl IntoIterator<Item = (N, Method)>,
    ) -> ClassResult<()> {
        self.ensure_open()?;
        let implementations: Vec<(String, Method)> = implementations
            .into_iter()
            .map(|(name, m)| (name.into(), m))
            .collect();

        let builder = self.builder_mut(class)?;
        let mut seen = FxHashSet::default();
        for (name, _) in &implementations {
            builder.check_implementation(name)?;
            if !seen.insert(name.as_str()) {
                return Err(ClassError::DuplicateImplementation {
                    class: class.type_name().to_string(),
                    member: name.clone(),
                });
            }
        }
        for (name, m) in implementations {
            builder.register_implementation(&name, m)?;
        }
        Ok(())
    }

    /// Seal the whole class graph.
    ///
    /// Propagates implementations down derived lists, then checks every class
    /// for unresolved declarations. If any remain, fails once listing all of
    /// them and stays `Open` so the missing implementations can be supplied.
    pub fn finalize_all(&mut self) -> ClassResult<()> {
        self.ensure_open()?;

        for builder in &mut self.builders {
            builder.clear_inherited();
        }
        self.propagate_implementations();

        let mut unresolved = Vec::new();
        for builder in &self.builders {
            builder.collect_unresolved(&mut unresolved);
        }
        if !unresolved.is_empty() {
            for member in &unresolved {
                tracing::warn!(
                    class = %member.class,
                    member = %member.member,
                    declared_by = %member.declared_by,
                    "unresolved abstract member"
                );
            }
            return Err(ClassError::UnresolvedAbstractMember(UnresolvedMembers(
                unresolved,
            )));
        }

        let options = &self.options;
        for builder in self.builders.iter_mut() {
            builder.finalize(options);
        }
        self.phase = Phase::Finalized;
        tracing::info!(classes = self.builders.len(), "class graph finalized");
        Ok(())
    }

    fn ensure_open(&self) -> ClassResult<()> {
        match self.phase {
            Phase::Open => Ok(()),
            Phase::Finalized => Err(ClassError::AlreadyFinalized),
        }
    }

    fn builder_mut(&mut self, class: &ClassRecord) -> ClassResult<&mut ClassBuilder> {
        if !self.index.owns(class) {
            return Err(ClassError::UnknownClass(class.type_name().to_string()));
        }
        self.builders
            .get_mut(class.class_id().index())
            .ok_or_else(|| ClassError::UnknownClass(class.type_name().to_string()))
    }

    /// Push every registered implementation to descendants still pending on
    /// that member. Classes are processed in ID order, so a nearer ancestor
    /// (always registered later) overwrites a farther one.
    fn propagate_implementations(&mut self) {
        for idx in 0..self.builders.len() {
            let source = self.builders[idx].record().clone();
            for (member, method) in self.builders[idx].own_implementations() {
                self.propagate(&source, &member, &method);
            }
        }
    }

    fn propagate(&mut self, source: &ClassHandle, member: &str, method: &Method) {
        let mut seen = FxHashSet::default();
        let mut stack = source.derived();
        while let Some(class) = stack.pop() {
            if !seen.insert(class.class_id()) {
                continue;
            }
            let pending = class
                .entry(member)
                .map(|entry| entry.is_pending())
                .unwrap_or(false);
            if !pending {
                continue;
            }
            let Some(builder) = self.builders.get_mut(class.class_id().index()) else {
                continue;
            };
            // Classes with their own implementation propagate it themselves.
            if builder.has_own_implementation(member) {
                continue;
            }
            builder.inherit_implementation(member, method.clone(), source.type_name());
            stack.extend(class.derived());
        }
    }
}

impl Default for BuildDirector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BuildDirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildDirector")
            .field("phase", &self.phase)
            .field("classes", &self.index.len())
            .field("options", &self.options)
            .finish()
    }
}
