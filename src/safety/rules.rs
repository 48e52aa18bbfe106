//! Change rules
//!
//! Each rule recognizes one kind of attribute change on a single field and
//! judges whether it is safe. Rules run in a fixed order against a residual
//! copy of the [`FieldDiff`]: a rule judges its attribute and then clears it
//! on both sides. The field counts as handled once nothing is left to
//! compare. Whatever no rule clears is an unknown change and fails closed.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

use super::error::{ChangeError, Constraint};
use crate::schema::{FieldDescriptor, FieldDiff};

/// Result of running one rule against one field
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    /// The rule settled the field; no further rules run
    pub handled: bool,
    pub error: Option<ChangeError>,
}

impl ValidationOutcome {
    /// The rule does not apply, or did not settle the field alone
    pub fn declined() -> Self {
        Self {
            handled: false,
            error: None,
        }
    }

    pub fn approved() -> Self {
        Self {
            handled: true,
            error: None,
        }
    }

    pub fn rejected(error: ChangeError) -> Self {
        Self {
            handled: true,
            error: Some(error),
        }
    }

    fn judged(handled: bool, result: Result<(), ChangeError>) -> Self {
        Self {
            handled,
            error: result.err(),
        }
    }
}

/// A named rule in the ordered rule set
#[derive(Clone, Copy)]
pub struct ChangeRule {
    name: &'static str,
    apply: fn(&mut FieldDiff) -> ValidationOutcome,
}

impl fmt::Debug for ChangeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChangeRule").field(&self.name).finish()
    }
}

impl ChangeRule {
    pub const fn new(name: &'static str, apply: fn(&mut FieldDiff) -> ValidationOutcome) -> Self {
        Self { name, apply }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Judge the residual diff and clear what this rule recognized
    pub fn apply(&self, residual: &mut FieldDiff) -> ValidationOutcome {
        (self.apply)(residual)
    }

    /// Judge a diff in isolation, leaving it untouched
    pub fn evaluate(&self, diff: &FieldDiff) -> ValidationOutcome {
        let mut residual = diff.clone();
        self.apply(&mut residual)
    }
}

pub const FIELD_ADDITION: ChangeRule = ChangeRule::new("FieldAddition", field_addition);
pub const FIELD_REMOVAL: ChangeRule = ChangeRule::new("FieldRemoval", field_removal);
pub const ENUM_CHANGE: ChangeRule = ChangeRule::new("EnumChange", enum_change);
pub const REQUIRED_CHANGE: ChangeRule = ChangeRule::new("RequiredFieldChange", required_change);
pub const MAXIMUM_CHANGE: ChangeRule = ChangeRule::new("MaximumChange", maximum_change);
pub const MAX_ITEMS_CHANGE: ChangeRule = ChangeRule::new("MaximumItemsChange", max_items_change);
pub const MAX_LENGTH_CHANGE: ChangeRule =
    ChangeRule::new("MaximumLengthChange", max_length_change);
pub const MAX_PROPERTIES_CHANGE: ChangeRule =
    ChangeRule::new("MaximumPropertiesChange", max_properties_change);
pub const MINIMUM_CHANGE: ChangeRule = ChangeRule::new("MinimumChange", minimum_change);
pub const MIN_ITEMS_CHANGE: ChangeRule = ChangeRule::new("MinimumItemsChange", min_items_change);
pub const MIN_LENGTH_CHANGE: ChangeRule =
    ChangeRule::new("MinimumLengthChange", min_length_change);
pub const MIN_PROPERTIES_CHANGE: ChangeRule =
    ChangeRule::new("MinimumPropertiesChange", min_properties_change);
pub const DEFAULT_VALUE_CHANGE: ChangeRule =
    ChangeRule::new("DefaultValueChange", default_value_change);

/// The canonical rule set, in evaluation order
pub fn default_change_rules() -> Vec<ChangeRule> {
    vec![
        FIELD_ADDITION,
        FIELD_REMOVAL,
        ENUM_CHANGE,
        REQUIRED_CHANGE,
        MAXIMUM_CHANGE,
        MAX_ITEMS_CHANGE,
        MAX_LENGTH_CHANGE,
        MAX_PROPERTIES_CHANGE,
        MINIMUM_CHANGE,
        MIN_ITEMS_CHANGE,
        MIN_LENGTH_CHANGE,
        MIN_PROPERTIES_CHANGE,
        DEFAULT_VALUE_CHANGE,
    ]
}

/// Run the rules over one field diff in order
///
/// Returns every error raised along the way, and whether some rule settled
/// the field. An unsettled field is an unknown change.
pub fn evaluate_rules(rules: &[ChangeRule], diff: &FieldDiff) -> (bool, Vec<ChangeError>) {
    let mut residual = diff.clone();
    let mut errors = Vec::new();
    for rule in rules {
        let outcome = rule.apply(&mut residual);
        if let Some(err) = outcome.error {
            errors.push(err);
        }
        if outcome.handled {
            return (true, errors);
        }
    }
    (false, errors)
}

/// Judge one attribute present on both sides, then clear it
fn attribute_rule(
    diff: &mut FieldDiff,
    judge: impl FnOnce(&FieldDescriptor, &FieldDescriptor) -> Result<(), ChangeError>,
    reset: impl Fn(&mut FieldDescriptor),
) -> ValidationOutcome {
    let Some((old, new)) = diff.both_mut() else {
        return ValidationOutcome::declined();
    };
    let result = judge(old, new);
    reset(old);
    reset(new);
    ValidationOutcome::judged(diff.is_settled(), result)
}

/// A new field may not be required of objects that already exist
///
/// When its parent is new as well, no existing object can hold the parent,
/// so the field is free to be required.
fn field_addition(diff: &mut FieldDiff) -> ValidationOutcome {
    match (diff.before(), diff.after()) {
        (None, Some(new))
            if new.required_in_parent && new.default.is_none() && !diff.is_parent_added() =>
        {
            ValidationOutcome::rejected(ChangeError::RequiredFieldAdded)
        }
        (None, Some(_)) => ValidationOutcome::approved(),
        _ => ValidationOutcome::declined(),
    }
}

fn field_removal(diff: &mut FieldDiff) -> ValidationOutcome {
    match (diff.before(), diff.after()) {
        (Some(_), None) => ValidationOutcome::rejected(ChangeError::FieldRemoved),
        _ => ValidationOutcome::declined(),
    }
}

fn enum_set(values: &[Value]) -> BTreeSet<String> {
    values.iter().map(Value::to_string).collect()
}

fn render_set(values: &BTreeSet<String>) -> String {
    let joined: Vec<&str> = values.iter().map(String::as_str).collect();
    format!("[{}]", joined.join(", "))
}

fn enum_change(diff: &mut FieldDiff) -> ValidationOutcome {
    attribute_rule(
        diff,
        |old, new| {
            let old_values = enum_set(&old.enum_values);
            let new_values = enum_set(&new.enum_values);
            // An empty enum places no restriction on the value
            if new_values.is_empty() {
                return Ok(());
            }
            if old_values.is_empty() {
                return Err(ChangeError::EnumAdded(render_set(&new_values)));
            }
            let removed: BTreeSet<String> = old_values.difference(&new_values).cloned().collect();
            if removed.is_empty() {
                Ok(())
            } else {
                Err(ChangeError::EnumValuesRemoved(render_set(&removed)))
            }
        },
        |d| d.enum_values.clear(),
    )
}

fn required_change(diff: &mut FieldDiff) -> ValidationOutcome {
    attribute_rule(
        diff,
        |old, new| {
            if !old.required_in_parent && new.required_in_parent && new.default.is_none() {
                Err(ChangeError::BecameRequired)
            } else {
                Ok(())
            }
        },
        |d| d.required_in_parent = false,
    )
}

/// An upper bound may be dropped or raised, never introduced or lowered
fn upper_bound<T>(constraint: Constraint, old: Option<T>, new: Option<T>) -> Result<(), ChangeError>
where
    T: PartialOrd + fmt::Display + Copy,
{
    match (old, new) {
        (None, Some(value)) => Err(ChangeError::ConstraintAdded {
            constraint,
            value: value.to_string(),
        }),
        (Some(old), Some(new)) if new < old => Err(ChangeError::ConstraintDecreased {
            constraint,
            old: old.to_string(),
            new: new.to_string(),
        }),
        _ => Ok(()),
    }
}

/// A lower bound may be dropped or lowered, never introduced or raised
fn lower_bound<T>(constraint: Constraint, old: Option<T>, new: Option<T>) -> Result<(), ChangeError>
where
    T: PartialOrd + fmt::Display + Copy,
{
    match (old, new) {
        (None, Some(value)) => Err(ChangeError::ConstraintAdded {
            constraint,
            value: value.to_string(),
        }),
        (Some(old), Some(new)) if new > old => Err(ChangeError::ConstraintIncreased {
            constraint,
            old: old.to_string(),
            new: new.to_string(),
        }),
        _ => Ok(()),
    }
}

fn maximum_change(diff: &mut FieldDiff) -> ValidationOutcome {
    attribute_rule(
        diff,
        |old, new| upper_bound(Constraint::Maximum, old.maximum, new.maximum),
        |d| d.maximum = None,
    )
}

fn max_items_change(diff: &mut FieldDiff) -> ValidationOutcome {
    attribute_rule(
        diff,
        |old, new| upper_bound(Constraint::MaxItems, old.max_items, new.max_items),
        |d| d.max_items = None,
    )
}

fn max_length_change(diff: &mut FieldDiff) -> ValidationOutcome {
    attribute_rule(
        diff,
        |old, new| upper_bound(Constraint::MaxLength, old.max_length, new.max_length),
        |d| d.max_length = None,
    )
}

fn max_properties_change(diff: &mut FieldDiff) -> ValidationOutcome {
    attribute_rule(
        diff,
        |old, new| upper_bound(Constraint::MaxProperties, old.max_properties, new.max_properties),
        |d| d.max_properties = None,
    )
}

fn minimum_change(diff: &mut FieldDiff) -> ValidationOutcome {
    attribute_rule(
        diff,
        |old, new| lower_bound(Constraint::Minimum, old.minimum, new.minimum),
        |d| d.minimum = None,
    )
}

fn min_items_change(diff: &mut FieldDiff) -> ValidationOutcome {
    attribute_rule(
        diff,
        |old, new| lower_bound(Constraint::MinItems, old.min_items, new.min_items),
        |d| d.min_items = None,
    )
}

fn min_length_change(diff: &mut FieldDiff) -> ValidationOutcome {
    attribute_rule(
        diff,
        |old, new| lower_bound(Constraint::MinLength, old.min_length, new.min_length),
        |d| d.min_length = None,
    )
}

fn min_properties_change(diff: &mut FieldDiff) -> ValidationOutcome {
    attribute_rule(
        diff,
        |old, new| lower_bound(Constraint::MinProperties, old.min_properties, new.min_properties),
        |d| d.min_properties = None,
    )
}

fn default_value_change(diff: &mut FieldDiff) -> ValidationOutcome {
    attribute_rule(
        diff,
        |old, new| match (&old.default, &new.default) {
            (Some(old), None) => Err(ChangeError::DefaultRemoved(old.to_string())),
            (Some(old), Some(new)) if old != new => Err(ChangeError::DefaultChanged {
                old: old.to_string(),
                new: new.to_string(),
            }),
            // Adding a default only fills in values that were previously unset
            _ => Ok(()),
        },
        |d| d.default = None,
    )
}
