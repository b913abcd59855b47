//! Strata class composition engine
//!
//! Builds fully linked class records from raw member tables at run time:
//! - Attribute directives (virtual, pure virtual, declaration, no-freeze)
//! - Multiple inheritance with depth-first linearization
//! - Member merge with override legality checks
//! - Declare-then-implement method resolution
//! - Ordered constructor/destructor entry points
//!
//! Classes are added to a [`BuildDirector`] one at a time and become usable
//! after a single global [`BuildDirector::finalize_all`].
//!
//! ```ignore
//! let mut director = BuildDirector::new();
//! let animal = director.add_class(
//!     ClassBlueprint::new("Animal").virtual_method("speak", |_, _| Ok("...".into())),
//!     [],
//! )?;
//! let dog = director.add_class(
//!     ClassBlueprint::new("Dog").method("speak", |_, _| Ok("Woof".into())),
//!     [BaseRef::from(&animal)],
//! )?;
//! director.finalize_all()?;
//!
//! let mut rex = dog.instantiate(&[])?;
//! assert_eq!(rex.call("speak", &[])?, Value::from("Woof"));
//! rex.destroy()?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod attribute;
pub mod blueprint;
pub mod builder;
pub mod class;
pub mod director;
pub mod error;
pub mod instance;
pub mod options;
pub mod registry;
pub mod value;

mod root;

pub use attribute::{
    AttributeDirective, AttributeKind, ClassAttributes, MemberAttributes, ATTRIBUTE_DELIMITER,
    ATTRIBUTE_PREFIX,
};
pub use blueprint::{
    method, BaseRef, ClassBlueprint, Member, Method, CONSTRUCTOR, DESTRUCTOR, RESERVED_MEMBERS,
};
pub use builder::ClassBuilder;
pub use class::{ClassHandle, ClassId, ClassRecord, MemberEntry, MemberTable};
pub use director::{BuildDirector, Phase, SharedDirector};
pub use error::{ClassError, ClassResult, UnresolvedMember, UnresolvedMembers};
pub use instance::Instance;
pub use options::{BuildOptions, OptionsError};
pub use registry::ClassIndex;
pub use value::Value;
