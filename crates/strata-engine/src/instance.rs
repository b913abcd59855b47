//! Instances and the per-class instance factory
//!
//! An [`Instance`] is an ordered keyed record with its class attached as the
//! dispatch table. Instances are produced by the factory closures each class
//! receives at finalize; before that the factory is a set of guarded
//! stand-ins that refuse to run.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::blueprint::{Member, Method};
use crate::class::{ClassHandle, ClassRecord};
use crate::error::{ClassError, ClassResult};
use crate::value::Value;

/// An object created by a finalized class
pub struct Instance {
    class: ClassHandle,
    fields: IndexMap<String, Value>,
}

impl Instance {
    pub(crate) fn new(class: ClassHandle) -> Self {
        Self {
            class,
            fields: IndexMap::new(),
        }
    }

    /// The class this instance dispatches through
    pub fn class(&self) -> &ClassHandle {
        &self.class
    }

    /// Name of the instance's class
    pub fn type_name(&self) -> &str {
        self.class.type_name()
    }

    /// Check if the instance's class is `class` or derives from it
    pub fn is_a(&self, class: &ClassRecord) -> bool {
        self.class.is_subclass_of(class)
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a field value, returning the previous one
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Remove a field
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    /// Fields in insertion order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Invoke a member through the class's merged table
    pub fn call(&mut self, name: &str, args: &[Value]) -> ClassResult<Value> {
        let class = self.class.clone();
        self.call_as(&class, name, args)
    }

    /// Invoke the member as `class` sees it.
    ///
    /// Lets an override reach the definition of one of its bases.
    pub fn call_as(&mut self, class: &ClassRecord, name: &str, args: &[Value]) -> ClassResult<Value> {
        if !self.is_a(class) {
            return Err(ClassError::Runtime(format!(
                "instance of '{}' is not a '{}'",
                self.type_name(),
                class.type_name()
            )));
        }
        // The entry is cloned out so the lock is released before the call.
        match class.entry(name) {
            Some(entry) => match entry.member {
                Some(Member::Method(m)) => m(self, args),
                Some(Member::Constant(v)) => Ok(v),
                None => Err(ClassError::NotFinalized(class.type_name().to_string())),
            },
            None => Err(ClassError::UnknownMember {
                class: class.type_name().to_string(),
                member: name.to_string(),
            }),
        }
    }

    /// Run the destructor chain and drop the instance
    pub fn destroy(self) -> ClassResult<()> {
        let class = self.class.clone();
        class.destroy(self)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.type_name());
        for (name, value) in &self.fields {
            s.field(name, value);
        }
        s.finish()
    }
}

pub(crate) type CreateFn =
    Arc<dyn Fn(&ClassHandle, &[Value]) -> ClassResult<Instance> + Send + Sync>;
pub(crate) type InitFn =
    Arc<dyn Fn(&ClassRecord, &mut Instance, &[Value]) -> ClassResult<()> + Send + Sync>;
pub(crate) type DestroyFn = Arc<dyn Fn(&ClassRecord, Instance) -> ClassResult<()> + Send + Sync>;

/// Creation and destruction entry points of one class
#[derive(Clone)]
pub(crate) struct InstanceFactory {
    pub(crate) create: CreateFn,
    pub(crate) init: InitFn,
    pub(crate) destroy: DestroyFn,
}

impl InstanceFactory {
    /// Stand-ins installed at build time; every entry point fails until finalize.
    pub(crate) fn guarded(type_name: &str) -> Self {
        let name: Arc<str> = Arc::from(type_name);
        let create_name = name.clone();
        let init_name = name.clone();
        Self {
            create: Arc::new(move |_, _| Err(ClassError::NotFinalized(create_name.to_string()))),
            init: Arc::new(move |_, _, _| Err(ClassError::NotFinalized(init_name.to_string()))),
            destroy: Arc::new(move |_, _| Err(ClassError::NotFinalized(name.to_string()))),
        }
    }

    /// Real entry points.
    ///
    /// `destructors` must already be in execution order (most derived first).
    pub(crate) fn assemble(
        constructor: Option<Method>,
        destructors: Vec<Method>,
        validate_self: bool,
    ) -> Self {
        let init: InitFn = Arc::new(move |class, instance, args| {
            if validate_self {
                check_self(class, instance)?;
            }
            let Some(ctor) = &constructor else {
                return Ok(());
            };
            let returned = ctor(instance, args)?;
            if !returned.is_null() {
                return Err(ClassError::ConstructorReturnedValue {
                    class: class.type_name().to_string(),
                    value: returned.to_string(),
                });
            }
            Ok(())
        });

        let create_init = init.clone();
        let create: CreateFn = Arc::new(move |class, args| {
            let mut instance = Instance::new(class.clone());
            create_init(class, &mut instance, args)?;
            Ok(instance)
        });

        let destroy: DestroyFn = Arc::new(move |class, mut instance| {
            if validate_self {
                check_self(class, &instance)?;
            }
            for dtor in &destructors {
                dtor(&mut instance, &[])?;
            }
            Ok(())
        });

        Self {
            create,
            init,
            destroy,
        }
    }
}

fn check_self(class: &ClassRecord, instance: &Instance) -> ClassResult<()> {
    if instance.is_a(class) {
        Ok(())
    } else {
        Err(ClassError::ForeignConstructorSelf {
            class: class.type_name().to_string(),
            instance_class: instance.type_name().to_string(),
        })
    }
}
