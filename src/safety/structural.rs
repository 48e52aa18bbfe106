//! Whole-definition checks
//!
//! - The scope of a definition can never change
//! - A version objects were stored under must stay declared
//! - Fields of a version cannot be removed

use super::error::{Comparison, Violation};
use crate::schema::{StructuredDefinition, flatten};

/// A named check over an (old, new) definition pair
#[derive(Clone, Copy, Debug)]
pub struct StructuralCheck {
    pub name: &'static str,
    pub check: fn(&StructuredDefinition, &StructuredDefinition) -> Vec<Violation>,
}

/// The structural checks, in evaluation order
pub fn structural_checks() -> Vec<StructuralCheck> {
    vec![
        StructuralCheck {
            name: "NoScopeChange",
            check: no_scope_change,
        },
        StructuralCheck {
            name: "NoStoredVersionRemoved",
            check: no_stored_version_removed,
        },
        StructuralCheck {
            name: "NoExistingFieldRemoved",
            check: no_existing_field_removed,
        },
    ]
}

/// Scope is fixed once the definition exists
pub fn no_scope_change(old: &StructuredDefinition, new: &StructuredDefinition) -> Vec<Violation> {
    if old.scope == new.scope {
        return Vec::new();
    }
    vec![Violation::ScopeChanged {
        old: old.scope,
        new: new.scope,
    }]
}

/// Every stored version must still be declared, or its objects become unreadable
pub fn no_stored_version_removed(
    old: &StructuredDefinition,
    new: &StructuredDefinition,
) -> Vec<Violation> {
    old.stored_versions
        .iter()
        .filter(|version| !new.declares(version))
        .map(|version| Violation::StoredVersionRemoved(version.clone()))
        .collect()
}

/// Every field of a version kept by the new definition must still exist
///
/// Versions dropped altogether are left to [`no_stored_version_removed`].
pub fn no_existing_field_removed(
    old: &StructuredDefinition,
    new: &StructuredDefinition,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for old_version in &old.versions {
        let Some(new_version) = new.version(&old_version.name) else {
            continue;
        };
        let old_fields = flatten(&old_version.schema);
        let new_fields = flatten(&new_version.schema);
        for field in old_fields.keys() {
            if !new_fields.contains_key(field) {
                violations.push(Violation::FieldRemoved {
                    comparison: Comparison::Upgrade {
                        version: old_version.name.clone(),
                    },
                    field: field.clone(),
                });
            }
        }
    }
    violations
}
