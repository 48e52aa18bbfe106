//! Field-level comparison of two flattened schemas

use std::collections::BTreeMap;

use super::flatten::{FieldDescriptor, FieldPath, FlatSchema};

/// The change of one field between two schemas
///
/// At least one side is always present: the constructors are the only way to
/// build a diff.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDiff {
    pub(crate) old: Option<FieldDescriptor>,
    pub(crate) new: Option<FieldDescriptor>,
    /// The enclosing object did not exist on the old side either
    pub(crate) parent_added: bool,
}

impl FieldDiff {
    /// Field that only exists in the new schema
    pub fn added(new: FieldDescriptor) -> Self {
        Self {
            old: None,
            new: Some(new),
            parent_added: false,
        }
    }

    /// Field that only exists in the new schema, inside a parent that is new too
    pub fn added_with_parent(new: FieldDescriptor) -> Self {
        Self {
            parent_added: true,
            ..Self::added(new)
        }
    }

    /// Field that only exists in the old schema
    pub fn removed(old: FieldDescriptor) -> Self {
        Self {
            old: Some(old),
            new: None,
            parent_added: false,
        }
    }

    /// Field present on both sides
    pub fn changed(old: FieldDescriptor, new: FieldDescriptor) -> Self {
        Self {
            old: Some(old),
            new: Some(new),
            parent_added: false,
        }
    }

    pub fn before(&self) -> Option<&FieldDescriptor> {
        self.old.as_ref()
    }

    pub fn after(&self) -> Option<&FieldDescriptor> {
        self.new.as_ref()
    }

    pub fn is_addition(&self) -> bool {
        self.old.is_none()
    }

    pub fn is_removal(&self) -> bool {
        self.new.is_none()
    }

    /// Whether the field's parent was added along with it
    pub fn is_parent_added(&self) -> bool {
        self.parent_added
    }

    /// Both sides, when the field exists in both schemas
    pub(crate) fn both_mut(&mut self) -> Option<(&mut FieldDescriptor, &mut FieldDescriptor)> {
        match (&mut self.old, &mut self.new) {
            (Some(old), Some(new)) => Some((old, new)),
            _ => None,
        }
    }

    /// Whether nothing is left to judge
    pub(crate) fn is_settled(&self) -> bool {
        self.old == self.new
    }
}

/// Compute the per-field changes between two flattened schemas
///
/// Walks the union of both key sets. Fields whose descriptors are identical
/// are left out. Added fields remember whether their parent is new as well.
pub fn diff(old: &FlatSchema, new: &FlatSchema) -> BTreeMap<FieldPath, FieldDiff> {
    let mut diffs = BTreeMap::new();

    for (path, old_field) in old {
        match new.get(path) {
            Some(new_field) if new_field == old_field => {}
            Some(new_field) => {
                diffs.insert(
                    path.clone(),
                    FieldDiff::changed(old_field.clone(), new_field.clone()),
                );
            }
            None => {
                diffs.insert(path.clone(), FieldDiff::removed(old_field.clone()));
            }
        }
    }

    for (path, new_field) in new {
        if old.contains_key(path) {
            continue;
        }
        let parent_existed = path.parent().is_none_or(|parent| old.contains_key(&parent));
        let added = if parent_existed {
            FieldDiff::added(new_field.clone())
        } else {
            FieldDiff::added_with_parent(new_field.clone())
        };
        diffs.insert(path.clone(), added);
    }

    diffs
}
