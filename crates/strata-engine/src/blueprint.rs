//! Class blueprints
//!
//! A [`ClassBlueprint`] is the raw, unmerged input for one class: its name,
//! its own members in insertion order, attribute directives and direct bases.
//! Ownership moves into the builder when the blueprint is handed to
//! [`BuildDirector::add_class`](crate::BuildDirector::add_class).

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::attribute::{AttributeDirective, AttributeKind};
use crate::class::ClassHandle;
use crate::error::ClassResult;
use crate::instance::Instance;
use crate::value::Value;

/// Name of the constructor member
pub const CONSTRUCTOR: &str = "constructor";

/// Name of the destructor member
pub const DESTRUCTOR: &str = "destructor";

/// Entry points the engine synthesizes; blueprints may not define them
pub const RESERVED_MEMBERS: &[&str] = &["new", "destroy"];

/// Dunder names are class-private and never inherited
pub fn is_dunder(name: &str) -> bool {
    name.starts_with("__")
}

/// A callable member: receives the instance and the call arguments
pub type Method = Arc<dyn Fn(&mut Instance, &[Value]) -> ClassResult<Value> + Send + Sync>;

/// Wrap a closure as a [`Method`]
pub fn method(
    f: impl Fn(&mut Instance, &[Value]) -> ClassResult<Value> + Send + Sync + 'static,
) -> Method {
    Arc::new(f)
}

/// A blueprint member
#[derive(Clone)]
pub enum Member {
    /// Callable
    Method(Method),
    /// Class-level constant
    Constant(Value),
}

impl Member {
    /// Check if this member is callable
    pub fn is_method(&self) -> bool {
        matches!(self, Member::Method(_))
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Method(_) => write!(f, "Method(<fn>)"),
            Member::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
        }
    }
}

impl From<Value> for Member {
    fn from(v: Value) -> Self {
        Member::Constant(v)
    }
}

impl From<Method> for Member {
    fn from(m: Method) -> Self {
        Member::Method(m)
    }
}

/// Reference to a base class
#[derive(Debug, Clone)]
pub enum BaseRef {
    /// Already-built class
    Class(ClassHandle),
    /// Registered class looked up by name at build time
    Named(String),
}

impl From<ClassHandle> for BaseRef {
    fn from(class: ClassHandle) -> Self {
        BaseRef::Class(class)
    }
}

impl From<&ClassHandle> for BaseRef {
    fn from(class: &ClassHandle) -> Self {
        BaseRef::Class(class.clone())
    }
}

impl From<&str> for BaseRef {
    fn from(name: &str) -> Self {
        BaseRef::Named(name.to_string())
    }
}

impl From<String> for BaseRef {
    fn from(name: String) -> Self {
        BaseRef::Named(name)
    }
}

/// Raw input record for one class
#[derive(Debug, Clone)]
pub struct ClassBlueprint {
    pub(crate) type_name: String,
    pub(crate) members: IndexMap<String, Member>,
    pub(crate) directives: Vec<AttributeDirective>,
    pub(crate) bases: Vec<BaseRef>,
    pub(crate) inherit_root: bool,
}

impl ClassBlueprint {
    /// Create an empty blueprint
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            members: IndexMap::new(),
            directives: Vec::new(),
            bases: Vec::new(),
            inherit_root: true,
        }
    }

    /// Class name this blueprint will register under
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Members in insertion order (directive keys included until build)
    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Structured directives attached so far
    pub fn directives(&self) -> &[AttributeDirective] {
        &self.directives
    }

    /// Insert a raw member. Keys starting with `@` are attribute directives
    /// and are interpreted at build time.
    pub fn insert(&mut self, key: impl Into<String>, member: impl Into<Member>) -> Option<Member> {
        self.members.insert(key.into(), member.into())
    }

    /// Remove a member
    pub fn remove(&mut self, key: &str) -> Option<Member> {
        self.members.shift_remove(key)
    }

    /// Add a direct base
    pub fn with_base(mut self, base: impl Into<BaseRef>) -> Self {
        self.bases.push(base.into());
        self
    }

    /// Add a non-virtual method
    pub fn method(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&mut Instance, &[Value]) -> ClassResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.members.insert(name.into(), Member::Method(method(f)));
        self
    }

    /// Add a method derived classes may override
    pub fn virtual_method(
        self,
        name: impl Into<String>,
        f: impl Fn(&mut Instance, &[Value]) -> ClassResult<Value> + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        self.method(name.clone(), f)
            .attribute(AttributeKind::Virtual, name)
    }

    /// Add a class-level constant
    pub fn constant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members
            .insert(name.into(), Member::Constant(value.into()));
        self
    }

    /// Declare an abstract member every concrete class must implement
    pub fn pure_virtual(self, name: impl Into<String>) -> Self {
        self.attribute(AttributeKind::PureVirtual, name)
    }

    /// Forward-declare a member that receives exactly one implementation later
    pub fn declare(self, name: impl Into<String>) -> Self {
        self.attribute(AttributeKind::Declaration, name)
    }

    /// Set the constructor
    pub fn constructor(
        self,
        f: impl Fn(&mut Instance, &[Value]) -> ClassResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.method(CONSTRUCTOR, f)
    }

    /// Set the destructor
    pub fn destructor(
        self,
        f: impl Fn(&mut Instance, &[Value]) -> ClassResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.method(DESTRUCTOR, f)
    }

    /// Keep the member table writable after finalize
    pub fn no_freeze(mut self) -> Self {
        self.directives
            .push(AttributeDirective::class(AttributeKind::NoFreeze));
        self
    }

    /// Do not inject the root class as an implicit base
    pub fn without_root(mut self) -> Self {
        self.inherit_root = false;
        self
    }

    /// Attach a member-level directive
    pub fn attribute(mut self, kind: AttributeKind, target: impl Into<String>) -> Self {
        self.directives
            .push(AttributeDirective::member(kind, target));
        self
    }
}
