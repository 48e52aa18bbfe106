//! Upgrade and cross-version validators
//!
//! [`Validator`] compares the active definition with the proposed one.
//! [`CrossVersionValidator`] compares every pair of versions the proposed
//! definition serves at the same time. Neither stops at the first failure.

use std::collections::BTreeMap;

use super::error::{Comparison, Violation, Violations};
use super::rules::{ChangeRule, default_change_rules, evaluate_rules};
use super::structural::{StructuralCheck, structural_checks};
use crate::schema::{FieldDiff, FieldPath, SchemaNode, StructuredDefinition, diff, flatten};

/// Run the change rules over a set of field diffs, recording every failure
fn check_changes(
    rules: &[ChangeRule],
    comparison: &Comparison,
    diffs: &BTreeMap<FieldPath, FieldDiff>,
    violations: &mut Violations,
) {
    for (field, field_diff) in diffs {
        let (handled, errors) = evaluate_rules(rules, field_diff);
        for source in errors {
            violations.push(Violation::UnsafeChange {
                comparison: comparison.clone(),
                field: field.clone(),
                source,
            });
        }
        if !handled {
            violations.push(Violation::UnknownChange {
                comparison: comparison.clone(),
                field: field.clone(),
            });
        }
    }
}

fn schema_diff(old: &SchemaNode, new: &SchemaNode) -> BTreeMap<FieldPath, FieldDiff> {
    diff(&flatten(old), &flatten(new))
}

/// Validates an upgrade from the active definition to the proposed one
#[derive(Clone, Debug)]
pub struct Validator {
    structural: Vec<StructuralCheck>,
    change_rules: Vec<ChangeRule>,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            structural: structural_checks(),
            change_rules: default_change_rules(),
        }
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the change rule set
    pub fn with_change_rules(mut self, rules: Vec<ChangeRule>) -> Self {
        self.change_rules = rules;
        self
    }

    pub fn change_rules(&self) -> &[ChangeRule] {
        &self.change_rules
    }

    /// Validate the (active, proposed) pair
    ///
    /// Runs every structural check, then the change rules for every version
    /// declared by both definitions.
    pub fn validate(
        &self,
        old: &StructuredDefinition,
        new: &StructuredDefinition,
    ) -> Result<(), Violations> {
        let mut violations = Violations::new();

        for check in &self.structural {
            let found = (check.check)(old, new);
            if !found.is_empty() {
                tracing::debug!(
                    crd = %new.name,
                    check = check.name,
                    count = found.len(),
                    "Structural check failed"
                );
            }
            violations.extend(found);
        }

        for old_version in &old.versions {
            let Some(new_version) = new.version(&old_version.name) else {
                continue;
            };
            let mut diffs = schema_diff(&old_version.schema, &new_version.schema);
            // Removed fields are reported by the field retention check
            diffs.retain(|_, d| !d.is_removal());

            let comparison = Comparison::Upgrade {
                version: old_version.name.clone(),
            };
            check_changes(&self.change_rules, &comparison, &diffs, &mut violations);
        }

        violations.into_result()
    }
}

/// Validates that all versions of one definition are mutually convertible
#[derive(Clone, Debug)]
pub struct CrossVersionValidator {
    change_rules: Vec<ChangeRule>,
}

impl Default for CrossVersionValidator {
    fn default() -> Self {
        Self {
            change_rules: default_change_rules(),
        }
    }
}

impl CrossVersionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_change_rules(mut self, rules: Vec<ChangeRule>) -> Self {
        self.change_rules = rules;
        self
    }

    /// Compare every ordered pair of distinct versions
    pub fn validate(&self, definition: &StructuredDefinition) -> Result<(), Violations> {
        let mut violations = Violations::new();

        for from in &definition.versions {
            for to in &definition.versions {
                if from.name == to.name {
                    continue;
                }
                let diffs = schema_diff(&from.schema, &to.schema);
                let comparison = Comparison::CrossVersion {
                    from: from.name.clone(),
                    to: to.name.clone(),
                };
                check_changes(&self.change_rules, &comparison, &diffs, &mut violations);
            }
        }

        violations.into_result()
    }
}
