//! Member merge with override legality

use crate::attribute::MemberAttributes;
use crate::blueprint::is_dunder;
use crate::class::{ClassHandle, MemberEntry, MemberTable};
use crate::error::{ClassError, ClassResult};

/// Merge the own members of every class in `lineage`, then `own`, into one table.
///
/// An entry may only replace an earlier one that is virtual. When the two
/// come from unrelated branches the incoming entry must be virtual as well;
/// along an ancestor chain the replacement inherits virtual-ness. Dunder
/// names of ancestors are not inherited.
pub(crate) fn merge(class: &str, lineage: &[ClassHandle], own: &MemberTable) -> ClassResult<MemberTable> {
    let mut table = MemberTable::new();

    for ancestor in lineage {
        for (name, entry) in ancestor.own_members() {
            if is_dunder(name) {
                continue;
            }
            let mut entry = entry.clone();
            // An override in the ancestor is virtual in its merged table only.
            entry.attributes |= ancestor.member_attributes(name);
            let related = table
                .get(name)
                .map_or(true, |existing| ancestor.descends_from_name(&existing.origin));
            place(&mut table, name, entry, ancestor.type_name(), related)?;
        }
    }

    // The class being built descends from every contributor.
    for (name, entry) in own {
        place(&mut table, name, entry.clone(), class, true)?;
    }

    Ok(table)
}

fn place(
    table: &mut MemberTable,
    name: &str,
    mut entry: MemberEntry,
    redefined_by: &str,
    related: bool,
) -> ClassResult<()> {
    if let Some(existing) = table.get(name) {
        let legal = existing.attributes.is_overridable()
            && (related || entry.attributes.is_overridable());
        if !legal {
            return Err(ClassError::IllegalOverride {
                member: name.to_string(),
                defined_by: existing.origin.clone(),
                redefined_by: redefined_by.to_string(),
            });
        }
        entry.attributes |= MemberAttributes::VIRTUAL;
    }
    // IndexMap keeps the slot of an overridden name at its first position.
    table.insert(name.to_string(), entry);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::Member;
    use crate::value::Value;

    fn entry(origin: &str, value: i64, attributes: MemberAttributes) -> MemberEntry {
        MemberEntry {
            member: Some(Member::Constant(Value::Int(value))),
            origin: origin.to_string(),
            attributes,
        }
    }

    fn constant(table: &MemberTable, name: &str) -> Option<i64> {
        match table.get(name)?.member.as_ref()? {
            Member::Constant(v) => v.as_int(),
            Member::Method(_) => None,
        }
    }

    #[test]
    fn test_virtual_entry_can_be_replaced() {
        let mut table = MemberTable::new();
        place(&mut table, "speak", entry("Animal", 1, MemberAttributes::VIRTUAL), "Animal", true).unwrap();
        place(&mut table, "speak", entry("Dog", 2, MemberAttributes::empty()), "Dog", true).unwrap();

        assert_eq!(constant(&table, "speak"), Some(2));
        let merged = table.get("speak").unwrap();
        assert_eq!(merged.origin, "Dog");
        assert!(merged.attributes.contains(MemberAttributes::VIRTUAL));
    }

    #[test]
    fn test_non_virtual_entry_is_protected() {
        let mut table = MemberTable::new();
        place(&mut table, "bark", entry("Animal", 1, MemberAttributes::empty()), "Animal", true).unwrap();
        let err = place(&mut table, "bark", entry("Dog", 2, MemberAttributes::empty()), "Dog", true).unwrap_err();

        match err {
            ClassError::IllegalOverride {
                member,
                defined_by,
                redefined_by,
            } => {
                assert_eq!(member, "bark");
                assert_eq!(defined_by, "Animal");
                assert_eq!(redefined_by, "Dog");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(constant(&table, "bark"), Some(1));
    }

    #[test]
    fn test_override_keeps_first_position() {
        let mut table = MemberTable::new();
        place(&mut table, "a", entry("Base", 1, MemberAttributes::VIRTUAL), "Base", true).unwrap();
        place(&mut table, "b", entry("Base", 2, MemberAttributes::empty()), "Base", true).unwrap();
        place(&mut table, "a", entry("Derived", 3, MemberAttributes::empty()), "Derived", true).unwrap();

        let names: Vec<_> = table.keys().cloned().collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_unrelated_non_virtual_cannot_replace_virtual() {
        let mut table = MemberTable::new();
        place(&mut table, "draw", entry("V", 1, MemberAttributes::VIRTUAL), "V", true).unwrap();
        let err = place(&mut table, "draw", entry("N", 2, MemberAttributes::empty()), "N", false).unwrap_err();
        assert!(matches!(err, ClassError::IllegalOverride { ref defined_by, .. } if defined_by == "V"));

        // Both virtual: the later branch wins.
        place(&mut table, "draw", entry("W", 3, MemberAttributes::VIRTUAL), "W", false).unwrap();
        assert_eq!(table.get("draw").unwrap().origin, "W");
    }
}
