//! Inheritance linearization

use rustc_hash::FxHashSet;

use crate::class::{ClassHandle, ClassId};

/// Flatten the ancestry of `bases` into base-to-derived order.
///
/// Depth-first over each base in declaration order, parents before children.
/// A class reached twice (diamond) keeps the position of its first visit.
pub(crate) fn linearize(bases: &[ClassHandle]) -> Vec<ClassHandle> {
    let mut visited = FxHashSet::default();
    let mut order = Vec::new();
    for base in bases {
        visit(base, &mut visited, &mut order);
    }
    order
}

fn visit(class: &ClassHandle, visited: &mut FxHashSet<ClassId>, order: &mut Vec<ClassHandle>) {
    if !visited.insert(class.class_id()) {
        return;
    }
    for base in class.bases() {
        visit(base, visited, order);
    }
    order.push(class.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::ClassAttributes;
    use crate::class::{ClassRecord, MemberTable};
    use std::sync::Arc;

    fn class(name: &str, id: u32, bases: Vec<ClassHandle>) -> ClassHandle {
        Arc::new(ClassRecord::new(
            name.to_string(),
            ClassId::new(id),
            bases,
            MemberTable::new(),
            None,
            ClassAttributes::empty(),
            MemberTable::new(),
        ))
    }

    fn names(order: &[ClassHandle]) -> Vec<&str> {
        order.iter().map(|c| c.type_name()).collect()
    }

    #[test]
    fn test_chain() {
        let root = class("Root", 0, vec![]);
        let mid = class("Mid", 1, vec![root.clone()]);
        assert_eq!(names(&linearize(&[mid])), vec!["Root", "Mid"]);
    }

    #[test]
    fn test_diamond_visits_shared_base_once() {
        let a = class("A", 0, vec![]);
        let b = class("B", 1, vec![a.clone()]);
        let c = class("C", 2, vec![a.clone()]);
        assert_eq!(names(&linearize(&[b, c])), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_repeated_direct_base() {
        let a = class("A", 0, vec![]);
        let b = class("B", 1, vec![a.clone()]);
        assert_eq!(names(&linearize(&[a.clone(), b])), vec!["A", "B"]);
    }
}
