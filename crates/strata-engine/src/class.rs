//! Class records
//!
//! A [`ClassRecord`] is the linked, externally visible result of building a
//! blueprint. Identity (name, id, bases, ancestors, own members) is fixed when
//! the record is created. The merged member table, the derived list and the
//! instance factory live behind a lock because finalize rewrites them; after
//! finalize the table is sealed unless the class opted out.

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use crate::attribute::{ClassAttributes, MemberAttributes};
use crate::blueprint::{Member, Method};
use crate::error::{ClassError, ClassResult};
use crate::instance::{Instance, InstanceFactory};
use crate::value::Value;

/// Shared handle to a class record
pub type ClassHandle = Arc<ClassRecord>;

/// Class identifier, assigned in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    /// Create a class ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw value
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Index into the registry's class vector
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One slot of a merged member table
#[derive(Debug, Clone)]
pub struct MemberEntry {
    /// Bound member, or None while a declaration awaits its implementation
    pub member: Option<Member>,
    /// Class whose blueprint (or implementation) supplied this entry
    pub origin: String,
    /// Effective attributes, including virtual-ness inherited from overridden entries
    pub attributes: MemberAttributes,
}

impl MemberEntry {
    /// Check if the entry still awaits an implementation
    pub fn is_pending(&self) -> bool {
        self.member.is_none()
    }
}

/// Ordered member table
pub type MemberTable = IndexMap<String, MemberEntry>;

/// Mutable part of a class
pub(crate) struct ClassBody {
    pub(crate) members: MemberTable,
    pub(crate) derived: Vec<Weak<ClassRecord>>,
    pub(crate) factory: InstanceFactory,
    pub(crate) sealed: bool,
    pub(crate) finalized: bool,
}

/// A built class
pub struct ClassRecord {
    type_name: String,
    class_id: ClassId,
    bases: Vec<ClassHandle>,
    /// Strict ancestors by id
    ancestors: FxHashSet<ClassId>,
    /// Strict ancestors by name
    ancestor_names: FxHashSet<String>,
    /// Members the blueprint itself defined (dunder names included)
    own_members: MemberTable,
    own_destructor: Option<Method>,
    attributes: ClassAttributes,
    body: RwLock<ClassBody>,
}

impl ClassRecord {
    pub(crate) fn new(
        type_name: String,
        class_id: ClassId,
        bases: Vec<ClassHandle>,
        own_members: MemberTable,
        own_destructor: Option<Method>,
        attributes: ClassAttributes,
        members: MemberTable,
    ) -> Self {
        let mut ancestors = FxHashSet::default();
        let mut ancestor_names = FxHashSet::default();
        for base in &bases {
            ancestors.insert(base.class_id);
            ancestors.extend(base.ancestors.iter().copied());
            ancestor_names.insert(base.type_name.clone());
            ancestor_names.extend(base.ancestor_names.iter().cloned());
        }

        let factory = InstanceFactory::guarded(&type_name);
        Self {
            type_name,
            class_id,
            bases,
            ancestors,
            ancestor_names,
            own_members,
            own_destructor,
            attributes,
            body: RwLock::new(ClassBody {
                members,
                derived: Vec::new(),
                factory,
                sealed: false,
                finalized: false,
            }),
        }
    }

    /// Class name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Class ID
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    /// Direct bases in declaration order
    pub fn bases(&self) -> &[ClassHandle] {
        &self.bases
    }

    /// Class-level attributes
    pub fn attributes(&self) -> ClassAttributes {
        self.attributes
    }

    /// Check if this class is `other` or derives from it
    pub fn is_subclass_of(&self, other: &ClassRecord) -> bool {
        self.descends_from(other.class_id)
    }

    /// Check if this class is `class_id` or derives from it
    pub fn descends_from(&self, class_id: ClassId) -> bool {
        self.class_id == class_id || self.ancestors.contains(&class_id)
    }

    /// Check if this class is named `name` or derives from a class named `name`
    pub fn descends_from_name(&self, name: &str) -> bool {
        self.type_name == name || self.ancestor_names.contains(name)
    }

    /// Classes that list this one as a direct base (still alive)
    pub fn derived(&self) -> Vec<ClassHandle> {
        self.body
            .read()
            .derived
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Look up a bound member of the merged table
    pub fn member(&self, name: &str) -> Option<Member> {
        self.body
            .read()
            .members
            .get(name)
            .and_then(|entry| entry.member.clone())
    }

    /// Look up a merged table entry
    pub fn entry(&self, name: &str) -> Option<MemberEntry> {
        self.body.read().members.get(name).cloned()
    }

    /// Check if the merged table has an entry named `name`
    pub fn has_member(&self, name: &str) -> bool {
        self.body.read().members.contains_key(name)
    }

    /// Names in the merged table, in merge order
    pub fn member_names(&self) -> Vec<String> {
        self.body.read().members.keys().cloned().collect()
    }

    /// Snapshot of the merged table
    pub fn members(&self) -> MemberTable {
        self.body.read().members.clone()
    }

    /// Effective attributes of a merged member
    pub fn member_attributes(&self, name: &str) -> MemberAttributes {
        self.body
            .read()
            .members
            .get(name)
            .map(|entry| entry.attributes)
            .unwrap_or_default()
    }

    /// Whether finalize has run for this class
    pub fn is_finalized(&self) -> bool {
        self.body.read().finalized
    }

    /// Whether the member table rejects writes
    pub fn is_sealed(&self) -> bool {
        self.body.read().sealed
    }

    /// Write a member into a class that was not sealed
    pub fn set_member(&self, name: impl Into<String>, member: impl Into<Member>) -> ClassResult<()> {
        let name = name.into();
        let mut body = self.body.write();
        if !body.finalized {
            return Err(ClassError::NotFinalized(self.type_name.clone()));
        }
        if body.sealed {
            return Err(ClassError::SealedClass {
                class: self.type_name.clone(),
                member: name,
            });
        }
        let attributes = body
            .members
            .get(&name)
            .map(|entry| entry.attributes)
            .unwrap_or_default();
        body.members.insert(
            name,
            MemberEntry {
                member: Some(member.into()),
                origin: self.type_name.clone(),
                attributes,
            },
        );
        Ok(())
    }

    /// Create an instance, running the constructor with `args`
    pub fn instantiate(self: &Arc<Self>, args: &[Value]) -> ClassResult<Instance> {
        let create = self.body.read().factory.create.clone();
        create(self, args)
    }

    /// Run this class's constructor body on an existing instance.
    ///
    /// Used by derived constructors to initialize their base part.
    pub fn construct(&self, instance: &mut Instance, args: &[Value]) -> ClassResult<()> {
        let init = self.body.read().factory.init.clone();
        init(self, instance, args)
    }

    /// Destroy an instance, running the destructor chain derived-first.
    ///
    /// An instance of a derived class is torn down through its own class so
    /// the derived destructors run before this one.
    pub fn destroy(&self, instance: Instance) -> ClassResult<()> {
        if instance.class().class_id() != self.class_id && instance.is_a(self) {
            let class = instance.class().clone();
            return class.destroy(instance);
        }
        let destroy = self.body.read().factory.destroy.clone();
        destroy(self, instance)
    }

    pub(crate) fn own_members(&self) -> &MemberTable {
        &self.own_members
    }

    pub(crate) fn own_destructor(&self) -> Option<&Method> {
        self.own_destructor.as_ref()
    }

    pub(crate) fn body(&self) -> &RwLock<ClassBody> {
        &self.body
    }

    pub(crate) fn add_derived(&self, derived: &ClassHandle) {
        self.body.write().derived.push(Arc::downgrade(derived));
    }
}

impl fmt::Debug for ClassRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bases: Vec<&str> = self.bases.iter().map(|b| b.type_name()).collect();
        f.debug_struct("ClassRecord")
            .field("type_name", &self.type_name)
            .field("class_id", &self.class_id)
            .field("bases", &bases)
            .field("attributes", &self.attributes)
            .finish()
    }
}
