//! Class building errors
//!
//! Every failure the engine can raise lives in [`ClassError`]. All of them are
//! fatal for the call that produced them: class building is a one-shot startup
//! process, so there is no retry path inside the engine.

use std::fmt;

use thiserror::Error;

/// Errors raised while building, finalizing or instantiating classes
#[derive(Debug, Error)]
pub enum ClassError {
    /// Class name already registered
    #[error("Class '{0}' is already registered")]
    DuplicateClass(String),

    /// Class name is empty or otherwise unusable
    #[error("Invalid class name: '{0}'")]
    InvalidClassName(String),

    /// A class lists itself as an ancestor
    #[error("Class '{class}' inherits from itself through '{via}'")]
    RecursiveInheritance {
        /// Class being built
        class: String,
        /// Base through which the cycle was found
        via: String,
    },

    /// Non-virtual member redefined by a derived class
    #[error(
        "Illegal override of non-virtual member '{member}': defined by '{defined_by}', redefined by '{redefined_by}'"
    )]
    IllegalOverride {
        /// Member name
        member: String,
        /// Class holding the existing definition
        defined_by: String,
        /// Class attempting the redefinition
        redefined_by: String,
    },

    /// Blueprint defines a reserved entry point directly
    #[error("Class '{class}' may not define reserved member '{member}'")]
    ReservedMemberDeclaration {
        /// Class name
        class: String,
        /// Reserved member name
        member: String,
    },

    /// Unrecognized or malformed attribute directive
    #[error("Invalid attribute '{directive}' on class '{class}': {reason}")]
    InvalidAttribute {
        /// Class name
        class: String,
        /// Offending directive or member
        directive: String,
        /// What is wrong with it
        reason: String,
    },

    /// Named base class is not registered
    #[error("Class '{class}' names unknown base class '{base}'")]
    UnknownBase {
        /// Class being built
        class: String,
        /// Unresolved base name
        base: String,
    },

    /// Class handle does not belong to this director
    #[error("Class '{0}' is not registered with this director")]
    UnknownClass(String),

    /// Implementation registered with no matching declaration
    #[error("Class '{class}' has no pending declaration for '{member}'")]
    UndeclaredImplementation {
        /// Class name
        class: String,
        /// Member name
        member: String,
    },

    /// Implementation registered twice for the same declaration
    #[error("Member '{member}' of class '{class}' already has an implementation")]
    DuplicateImplementation {
        /// Class name
        class: String,
        /// Member name
        member: String,
    },

    /// Declared or pure-virtual members left without an implementation at finalize
    #[error("Unresolved abstract members:\n{0}")]
    UnresolvedAbstractMember(UnresolvedMembers),

    /// Mutation attempted after the global finalize barrier
    #[error("Class graph is already finalized")]
    AlreadyFinalized,

    /// Operation that requires the global finalize attempted before it
    #[error("Class '{0}' is not finalized")]
    NotFinalized(String),

    /// Constructor returned data instead of mutating the instance
    #[error("Constructor of '{class}' returned a value: {value}")]
    ConstructorReturnedValue {
        /// Class name
        class: String,
        /// Rendered return value
        value: String,
    },

    /// Constructor or destructor body invoked on an unrelated instance
    #[error("Constructor of '{class}' invoked on an instance of unrelated class '{instance_class}'")]
    ForeignConstructorSelf {
        /// Class whose constructor was called
        class: String,
        /// Class of the instance it was called on
        instance_class: String,
    },

    /// Member lookup failed on an instance
    #[error("Class '{class}' has no member '{member}'")]
    UnknownMember {
        /// Class name
        class: String,
        /// Member name
        member: String,
    },

    /// Write attempted on a sealed member table
    #[error("Class '{class}' is sealed; cannot set member '{member}'")]
    SealedClass {
        /// Class name
        class: String,
        /// Member name
        member: String,
    },

    /// Failure raised by a user method
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Class building result
pub type ClassResult<T> = Result<T, ClassError>;

/// A declared member that never received an implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedMember {
    /// Class whose merged table holds the pending member
    pub class: String,
    /// Member name
    pub member: String,
    /// Class that declared it
    pub declared_by: String,
}

impl fmt::Display for UnresolvedMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.class == self.declared_by {
            write!(f, "{}.{}", self.class, self.member)
        } else {
            write!(
                f,
                "{}.{} (declared by {})",
                self.class, self.member, self.declared_by
            )
        }
    }
}

/// Every unresolved member found across the class graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnresolvedMembers(pub Vec<UnresolvedMember>);

impl UnresolvedMembers {
    /// Number of unresolved members
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if nothing is unresolved
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check whether `class.member` is listed
    pub fn contains(&self, class: &str, member: &str) -> bool {
        self.0
            .iter()
            .any(|m| m.class == class && m.member == member)
    }

    /// Iterate over the listed members
    pub fn iter(&self) -> impl Iterator<Item = &UnresolvedMember> {
        self.0.iter()
    }
}

impl fmt::Display for UnresolvedMembers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, member) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {}", member)?;
        }
        Ok(())
    }
}
