//! The implicit root class
//!
//! Every class that does not opt out inherits these members, giving the whole
//! graph a common debugging surface.

use crate::blueprint::ClassBlueprint;
use crate::error::ClassError;
use crate::value::Value;

/// Blueprint of the root class
pub(crate) fn root_blueprint(name: &str) -> ClassBlueprint {
    ClassBlueprint::new(name)
        .without_root()
        .method("type_name", |this, _| Ok(Value::from(this.type_name())))
        .method("class_id", |this, _| {
            Ok(Value::Int(this.class().class_id().as_u32() as i64))
        })
        .method("is_a", |this, args| {
            let name = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| ClassError::Runtime("is_a expects a class name".to_string()))?;
            Ok(Value::Bool(this.class().descends_from_name(name)))
        })
        .virtual_method("dump", |this, _| Ok(Value::from(format!("{:?}", this))))
}
