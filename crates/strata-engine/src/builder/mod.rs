//! Per-class build pipeline
//!
//! [`ClassBuilder::build`] turns a blueprint into a registered-but-guarded
//! [`ClassRecord`]:
//!
//! 1. apply attribute directives
//! 2. check identity (name unused)
//! 3. reject reserved entry points
//! 4. resolve bases, injecting the root class
//! 5. linearize ancestry
//! 6. merge members with override checks, collect destructors
//! 7. link the class into its bases' derived lists
//! 8. install guarded factory stand-ins
//!
//! Implementations registered later are held by the builder until
//! [`ClassBuilder::finalize`] binds them, assembles the instance factory and
//! seals the record.

mod linearize;
mod merge;

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::attribute::{AttributeDirective, AttributeKind, ClassAttributes, MemberAttributes};
use crate::blueprint::{
    BaseRef, ClassBlueprint, Member, Method, CONSTRUCTOR, DESTRUCTOR, RESERVED_MEMBERS,
};
use crate::class::{ClassHandle, ClassRecord, MemberEntry, MemberTable};
use crate::error::{ClassError, ClassResult, UnresolvedMember};
use crate::instance::InstanceFactory;
use crate::options::BuildOptions;
use crate::registry::ClassIndex;

pub(crate) use linearize::linearize;

/// What a build can see of the surrounding registry
pub(crate) struct BuildScope<'a> {
    pub(crate) index: &'a ClassIndex,
    pub(crate) root: Option<&'a ClassHandle>,
    pub(crate) options: &'a BuildOptions,
}

/// Build state of one class
pub struct ClassBuilder {
    record: ClassHandle,
    constructor: Option<Method>,
    /// Destructor chain in collection order (root-most first)
    destructors: Vec<Method>,
    /// Implementations registered against this class
    implementations: IndexMap<String, Method>,
    /// Implementations propagated from ancestors: member → (method, ancestor name)
    inherited: FxHashMap<String, (Method, String)>,
    finalized: bool,
}

impl ClassBuilder {
    pub(crate) fn build(
        mut blueprint: ClassBlueprint,
        explicit_bases: Vec<BaseRef>,
        scope: &BuildScope<'_>,
    ) -> ClassResult<Self> {
        let type_name = blueprint.type_name.clone();

        let (member_attributes, class_attributes) = apply_directives(&mut blueprint)?;

        if type_name.trim().is_empty() || AttributeDirective::is_directive(&type_name) {
            return Err(ClassError::InvalidClassName(type_name));
        }
        if scope.index.contains_name(&type_name) {
            return Err(ClassError::DuplicateClass(type_name));
        }
        let class_id = scope.index.next_class_id();

        for reserved in RESERVED_MEMBERS {
            if blueprint.members.contains_key(*reserved) {
                return Err(ClassError::ReservedMemberDeclaration {
                    class: type_name,
                    member: reserved.to_string(),
                });
            }
        }

        let mut base_refs = std::mem::take(&mut blueprint.bases);
        base_refs.extend(explicit_bases);
        let bases = resolve_bases(&type_name, base_refs, blueprint.inherit_root, scope)?;

        let mut constructor = None;
        let mut own_destructor = None;
        let mut own = MemberTable::new();
        for (name, member) in blueprint.members {
            if name == CONSTRUCTOR || name == DESTRUCTOR {
                let Member::Method(m) = member else {
                    return Err(ClassError::InvalidAttribute {
                        class: type_name,
                        directive: name,
                        reason: "must be a method".to_string(),
                    });
                };
                if name == CONSTRUCTOR {
                    constructor = Some(m);
                } else {
                    own_destructor = Some(m);
                }
                continue;
            }

            let attributes = member_attributes.get(&name).copied().unwrap_or_default();
            // A body given for a declared member is only its signature stub.
            let member = (!attributes.awaits_implementation()).then_some(member);
            own.insert(
                name,
                MemberEntry {
                    member,
                    origin: type_name.clone(),
                    attributes,
                },
            );
        }

        for (name, attributes) in &member_attributes {
            if own.contains_key(name) {
                continue;
            }
            if !attributes.awaits_implementation() {
                return Err(ClassError::InvalidAttribute {
                    class: type_name,
                    directive: name.clone(),
                    reason: "virtual attribute on a member the class does not define".to_string(),
                });
            }
            own.insert(
                name.clone(),
                MemberEntry {
                    member: None,
                    origin: type_name.clone(),
                    attributes: *attributes,
                },
            );
        }

        let lineage = linearize(&bases);
        let members = merge::merge(&type_name, &lineage, &own)?;

        let mut destructors: Vec<Method> = lineage
            .iter()
            .filter_map(|ancestor| ancestor.own_destructor().cloned())
            .collect();
        destructors.extend(own_destructor.clone());

        let record = Arc::new(ClassRecord::new(
            type_name,
            class_id,
            bases,
            own,
            own_destructor,
            class_attributes,
            members,
        ));
        for base in record.bases() {
            base.add_derived(&record);
        }

        tracing::debug!(
            class = record.type_name(),
            id = %record.class_id(),
            bases = ?record.bases().iter().map(|b| b.type_name()).collect::<Vec<_>>(),
            members = record.member_names().len(),
            "class built"
        );

        Ok(Self {
            record,
            constructor,
            destructors,
            implementations: IndexMap::new(),
            inherited: FxHashMap::default(),
            finalized: false,
        })
    }

    /// The record this builder produced
    pub fn record(&self) -> &ClassHandle {
        &self.record
    }

    /// Whether finalize has run
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Names with an implementation registered against this class
    pub fn implemented_members(&self) -> impl Iterator<Item = &str> {
        self.implementations.keys().map(String::as_str)
    }

    /// Check that `member` may receive an implementation on this class
    pub(crate) fn check_implementation(&self, member: &str) -> ClassResult<()> {
        let class = self.record.type_name();
        let entry = self
            .record
            .entry(member)
            .filter(MemberEntry::is_pending)
            .ok_or_else(|| ClassError::UndeclaredImplementation {
                class: class.to_string(),
                member: member.to_string(),
            })?;

        // A non-virtual declaration is implemented where it was declared.
        if entry.origin != class && !entry.attributes.is_overridable() {
            return Err(ClassError::IllegalOverride {
                member: member.to_string(),
                defined_by: entry.origin,
                redefined_by: class.to_string(),
            });
        }

        if self.implementations.contains_key(member) {
            return Err(ClassError::DuplicateImplementation {
                class: class.to_string(),
                member: member.to_string(),
            });
        }
        Ok(())
    }

    /// Bind an implementation to a pending declaration
    pub(crate) fn register_implementation(&mut self, member: &str, method: Method) -> ClassResult<()> {
        self.check_implementation(member)?;
        self.implementations.insert(member.to_string(), method);
        tracing::debug!(
            class = self.record.type_name(),
            member,
            "implementation registered"
        );
        Ok(())
    }

    pub(crate) fn own_implementations(&self) -> Vec<(String, Method)> {
        self.implementations
            .iter()
            .map(|(name, m)| (name.clone(), m.clone()))
            .collect()
    }

    pub(crate) fn has_own_implementation(&self, member: &str) -> bool {
        self.implementations.contains_key(member)
    }

    /// Accept an implementation propagated from `ancestor`; a nearer ancestor
    /// processed later replaces a farther one.
    pub(crate) fn inherit_implementation(&mut self, member: &str, method: Method, ancestor: &str) {
        tracing::debug!(
            class = self.record.type_name(),
            member,
            from = ancestor,
            "implementation propagated"
        );
        self.inherited
            .insert(member.to_string(), (method, ancestor.to_string()));
    }

    pub(crate) fn clear_inherited(&mut self) {
        self.inherited.clear();
    }

    /// Report pending members that have no implementation
    pub(crate) fn collect_unresolved(&self, out: &mut Vec<UnresolvedMember>) {
        let body = self.record.body().read();
        for (name, entry) in &body.members {
            if entry.is_pending()
                && !self.implementations.contains_key(name)
                && !self.inherited.contains_key(name)
            {
                out.push(UnresolvedMember {
                    class: self.record.type_name().to_string(),
                    member: name.clone(),
                    declared_by: entry.origin.clone(),
                });
            }
        }
    }

    /// Bind implementations, install the real factory and seal.
    ///
    /// Callers must have checked `collect_unresolved` first.
    pub(crate) fn finalize(&mut self, options: &BuildOptions) {
        let class_name = self.record.type_name().to_string();
        let no_freeze = self
            .record
            .attributes()
            .contains(ClassAttributes::NO_FREEZE);

        let mut body = self.record.body().write();
        for (name, entry) in body.members.iter_mut() {
            if !entry.is_pending() {
                continue;
            }
            if let Some(m) = self.implementations.get(name) {
                entry.member = Some(Member::Method(m.clone()));
                entry.origin = class_name.clone();
            } else if let Some((m, ancestor)) = self.inherited.get(name) {
                entry.member = Some(Member::Method(m.clone()));
                entry.origin = ancestor.clone();
            }
        }

        let destructors = self.destructors.iter().rev().cloned().collect();
        body.factory = InstanceFactory::assemble(
            self.constructor.clone(),
            destructors,
            options.validate_constructor_self,
        );
        body.sealed = options.seal_classes && !no_freeze;
        body.finalized = true;
        self.finalized = true;
    }
}

/// Consume raw directive keys and structured directives
fn apply_directives(
    blueprint: &mut ClassBlueprint,
) -> ClassResult<(FxHashMap<String, MemberAttributes>, ClassAttributes)> {
    let class = blueprint.type_name.clone();
    let mut directives = std::mem::take(&mut blueprint.directives);

    let keys: Vec<String> = blueprint
        .members
        .keys()
        .filter(|key| AttributeDirective::is_directive(key))
        .cloned()
        .collect();
    for key in keys {
        let Some(payload) = blueprint.members.shift_remove(&key) else {
            continue;
        };
        let Member::Constant(value) = payload else {
            return Err(ClassError::InvalidAttribute {
                class,
                directive: key,
                reason: "payload must be a boolean, got a method".to_string(),
            });
        };
        if let Some(directive) = AttributeDirective::parse(&class, &key, &value)? {
            directives.push(directive);
        }
    }

    let mut member_attributes: FxHashMap<String, MemberAttributes> = FxHashMap::default();
    let mut class_attributes = ClassAttributes::empty();
    for directive in directives {
        directive.validate(&class)?;
        if !directive.enabled {
            continue;
        }
        match (&directive.target, directive.kind) {
            (None, AttributeKind::NoFreeze) => class_attributes |= ClassAttributes::NO_FREEZE,
            (Some(target), kind) => {
                *member_attributes.entry(target.clone()).or_default() |= kind.member_flags();
            }
            // validate() rejects member kinds without a target
            (None, _) => {}
        }
    }

    Ok((member_attributes, class_attributes))
}

/// Resolve base references, reject self-inheritance, inject the root
fn resolve_bases(
    class: &str,
    refs: Vec<BaseRef>,
    inherit_root: bool,
    scope: &BuildScope<'_>,
) -> ClassResult<Vec<ClassHandle>> {
    let mut bases: Vec<ClassHandle> = Vec::new();

    for base_ref in refs {
        let base = match base_ref {
            BaseRef::Class(handle) => {
                if handle.type_name() == class {
                    return Err(recursive(class, class));
                }
                if !scope.index.owns(&handle) {
                    return Err(ClassError::UnknownBase {
                        class: class.to_string(),
                        base: handle.type_name().to_string(),
                    });
                }
                handle
            }
            BaseRef::Named(name) => {
                if name == class {
                    return Err(recursive(class, class));
                }
                scope
                    .index
                    .get_by_name(&name)
                    .cloned()
                    .ok_or_else(|| ClassError::UnknownBase {
                        class: class.to_string(),
                        base: name.clone(),
                    })?
            }
        };

        if base.descends_from_name(class) {
            return Err(recursive(class, base.type_name()));
        }
        if !bases.iter().any(|b| b.class_id() == base.class_id()) {
            bases.push(base);
        }
    }

    if scope.options.inject_root && inherit_root {
        if let Some(root) = scope.root {
            if !bases.iter().any(|b| b.descends_from(root.class_id())) {
                bases.insert(0, root.clone());
            }
        }
    }

    Ok(bases)
}

fn recursive(class: &str, via: &str) -> ClassError {
    ClassError::RecursiveInheritance {
        class: class.to_string(),
        via: via.to_string(),
    }
}
