//! Attribute directives
//!
//! Attributes mark blueprint members as overridable, abstract or forward
//! declared, and mark whole classes as mutable after finalize. They reach the
//! builder either as structured [`AttributeDirective`]s or as prefixed
//! member keys such as `@virtual:speak` whose value is the boolean payload.
//! Both routes go through the same validation.

use bitflags::bitflags;

use crate::blueprint::{is_dunder, CONSTRUCTOR, DESTRUCTOR, RESERVED_MEMBERS};
use crate::error::{ClassError, ClassResult};
use crate::value::Value;

/// Prefix that turns a member key into an attribute directive
pub const ATTRIBUTE_PREFIX: &str = "@";

/// Separates the directive kind from its target member
pub const ATTRIBUTE_DELIMITER: char = ':';

/// The closed set of directive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// Member may be overridden by derived classes
    Virtual,
    /// Member must be implemented before finalize; implies `Virtual`
    PureVirtual,
    /// Forward declaration awaiting exactly one implementation
    Declaration,
    /// Class keeps a mutable member table after finalize
    NoFreeze,
}

impl AttributeKind {
    /// Parse a directive keyword
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "virtual" => Some(AttributeKind::Virtual),
            "pure_virtual" => Some(AttributeKind::PureVirtual),
            "declaration" => Some(AttributeKind::Declaration),
            "no_freeze" => Some(AttributeKind::NoFreeze),
            _ => None,
        }
    }

    /// Keyword used in prefixed member keys
    pub fn keyword(&self) -> &'static str {
        match self {
            AttributeKind::Virtual => "virtual",
            AttributeKind::PureVirtual => "pure_virtual",
            AttributeKind::Declaration => "declaration",
            AttributeKind::NoFreeze => "no_freeze",
        }
    }

    /// Whether the directive applies to the class rather than a member
    pub fn is_class_level(&self) -> bool {
        matches!(self, AttributeKind::NoFreeze)
    }

    /// Member flags this kind sets
    pub fn member_flags(&self) -> MemberAttributes {
        match self {
            AttributeKind::Virtual => MemberAttributes::VIRTUAL,
            AttributeKind::PureVirtual => {
                MemberAttributes::VIRTUAL | MemberAttributes::PURE_VIRTUAL
            }
            AttributeKind::Declaration => MemberAttributes::DECLARATION,
            AttributeKind::NoFreeze => MemberAttributes::empty(),
        }
    }
}

bitflags! {
    /// Per-member attribute set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemberAttributes: u8 {
        /// Overridable
        const VIRTUAL = 1 << 0;
        /// Abstract, implementation required
        const PURE_VIRTUAL = 1 << 1;
        /// Forward declared, implementation required
        const DECLARATION = 1 << 2;
    }
}

impl MemberAttributes {
    /// Whether a derived class may replace this member
    pub fn is_overridable(&self) -> bool {
        self.intersects(MemberAttributes::VIRTUAL | MemberAttributes::PURE_VIRTUAL)
    }

    /// Whether the member is declared without a body
    pub fn awaits_implementation(&self) -> bool {
        self.intersects(MemberAttributes::PURE_VIRTUAL | MemberAttributes::DECLARATION)
    }

    /// Short human-readable list, e.g. `virtual, declaration`
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.contains(MemberAttributes::PURE_VIRTUAL) {
            parts.push("pure_virtual");
        } else if self.contains(MemberAttributes::VIRTUAL) {
            parts.push("virtual");
        }
        if self.contains(MemberAttributes::DECLARATION) {
            parts.push("declaration");
        }
        parts.join(", ")
    }
}

bitflags! {
    /// Per-class attribute set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassAttributes: u8 {
        /// Member table stays writable after finalize
        const NO_FREEZE = 1 << 0;
    }
}

/// A parsed attribute directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDirective {
    /// Directive kind
    pub kind: AttributeKind,
    /// Target member (None for class-level directives)
    pub target: Option<String>,
    /// Payload; a disabled directive is validated but has no effect
    pub enabled: bool,
}

impl AttributeDirective {
    /// Directive on a member
    pub fn member(kind: AttributeKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: Some(target.into()),
            enabled: true,
        }
    }

    /// Class-level directive
    pub fn class(kind: AttributeKind) -> Self {
        Self {
            kind,
            target: None,
            enabled: true,
        }
    }

    /// Check whether a member key is a directive key
    pub fn is_directive(key: &str) -> bool {
        key.starts_with(ATTRIBUTE_PREFIX)
    }

    /// Parse a blueprint key and its payload.
    ///
    /// Returns `Ok(None)` for ordinary member names.
    pub fn parse(class: &str, key: &str, payload: &Value) -> ClassResult<Option<Self>> {
        let Some(body) = key.strip_prefix(ATTRIBUTE_PREFIX) else {
            return Ok(None);
        };

        let (keyword, target) = match body.split_once(ATTRIBUTE_DELIMITER) {
            Some((keyword, target)) => (keyword, Some(target.to_string())),
            None => (body, None),
        };

        let kind = AttributeKind::from_keyword(keyword)
            .ok_or_else(|| invalid(class, key, format!("unknown attribute kind '{}'", keyword)))?;

        let enabled = payload
            .as_bool()
            .ok_or_else(|| invalid(class, key, format!("payload must be a boolean, got {}", payload.type_name())))?;

        let directive = Self {
            kind,
            target,
            enabled,
        };
        directive.validate(class)?;
        Ok(Some(directive))
    }

    /// Check target shape against the directive kind
    pub fn validate(&self, class: &str) -> ClassResult<()> {
        let key = self.key();
        match (&self.target, self.kind.is_class_level()) {
            (Some(_), true) => Err(invalid(class, &key, "class-level attribute takes no member")),
            (None, false) => Err(invalid(class, &key, "attribute requires a target member")),
            (Some(target), false) => {
                if target.is_empty() {
                    return Err(invalid(class, &key, "attribute requires a target member"));
                }
                if target == CONSTRUCTOR
                    || target == DESTRUCTOR
                    || RESERVED_MEMBERS.contains(&target.as_str())
                    || is_dunder(target)
                {
                    return Err(invalid(
                        class,
                        &key,
                        format!("'{}' cannot carry member attributes", target),
                    ));
                }
                Ok(())
            }
            (None, true) => Ok(()),
        }
    }

    /// Render back to the prefixed key form
    pub fn key(&self) -> String {
        match &self.target {
            Some(target) => format!(
                "{}{}{}{}",
                ATTRIBUTE_PREFIX,
                self.kind.keyword(),
                ATTRIBUTE_DELIMITER,
                target
            ),
            None => format!("{}{}", ATTRIBUTE_PREFIX, self.kind.keyword()),
        }
    }
}

fn invalid(class: &str, directive: &str, reason: impl Into<String>) -> ClassError {
    ClassError::InvalidAttribute {
        class: class.to_string(),
        directive: directive.to_string(),
        reason: reason.into(),
    }
}
