//! Error types for upgrade-safety validation
//!
//! A single validation run never stops at the first problem. Every failing
//! check becomes one [`Violation`], and the run returns them together as
//! [`Violations`].

use std::fmt;

use thiserror::Error;

use crate::schema::{FieldPath, Scope};

/// The bound a constraint rule looks at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Constraint {
    Maximum,
    MaxItems,
    MaxLength,
    MaxProperties,
    Minimum,
    MinItems,
    MinLength,
    MinProperties,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Constraint::Maximum => "maximum",
            Constraint::MaxItems => "maxItems",
            Constraint::MaxLength => "maxLength",
            Constraint::MaxProperties => "maxProperties",
            Constraint::Minimum => "minimum",
            Constraint::MinItems => "minItems",
            Constraint::MinLength => "minLength",
            Constraint::MinProperties => "minProperties",
        };
        write!(f, "{}", name)
    }
}

/// Why a change rule judged a field change unsafe
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChangeError {
    #[error("enum constraints {0} added when there were no restrictions")]
    EnumAdded(String),

    #[error("enums {0} removed from the set of previously allowed values")]
    EnumValuesRemoved(String),

    #[error("field became required without a default value")]
    BecameRequired,

    #[error("field added as required without a default value")]
    RequiredFieldAdded,

    #[error("field removed")]
    FieldRemoved,

    #[error("{constraint} constraint {value} added when there were no restrictions")]
    ConstraintAdded { constraint: Constraint, value: String },

    #[error("{constraint} constraint decreased from {old} to {new}")]
    ConstraintDecreased {
        constraint: Constraint,
        old: String,
        new: String,
    },

    #[error("{constraint} constraint increased from {old} to {new}")]
    ConstraintIncreased {
        constraint: Constraint,
        old: String,
        new: String,
    },

    #[error("default value {0} removed")]
    DefaultRemoved(String),

    #[error("default value changed from {old} to {new}")]
    DefaultChanged { old: String, new: String },
}

/// Which two schemas a field-level violation was found between
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Comparison {
    /// The same version in the active and the proposed definition
    Upgrade { version: String },
    /// Two versions served side by side by the proposed definition
    CrossVersion { from: String, to: String },
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Upgrade { version } => write!(f, "version {:?}", version),
            Comparison::CrossVersion { from, to } => {
                write!(f, "version {:?} compared to version {:?}", from, to)
            }
        }
    }
}

/// A single failed check
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("scope changed from {old} to {new}")]
    ScopeChanged { old: Scope, new: Scope },

    #[error("stored version {0:?} removed")]
    StoredVersionRemoved(String),

    #[error("{comparison}, field \"{field}\" removed")]
    FieldRemoved {
        comparison: Comparison,
        field: FieldPath,
    },

    #[error("{comparison}, field \"{field}\": {source}")]
    UnsafeChange {
        comparison: Comparison,
        field: FieldPath,
        #[source]
        source: ChangeError,
    },

    #[error(
        "{comparison}, field \"{field}\" has unknown change, refusing to determine that change is safe"
    )]
    UnknownChange {
        comparison: Comparison,
        field: FieldPath,
    },
}

impl Violation {
    /// Short machine-readable reason, one per kind of check
    pub fn reason(&self) -> &'static str {
        match self {
            Violation::ScopeChanged { .. } => "NoScopeChange",
            Violation::StoredVersionRemoved(_) => "NoStoredVersionRemoved",
            Violation::FieldRemoved { .. } => "NoExistingFieldRemoved",
            Violation::UnsafeChange { .. } => "UnsafeChange",
            Violation::UnknownChange { .. } => "UnknownChange",
        }
    }

    /// The field the violation refers to, if it is field-level
    pub fn field(&self) -> Option<&FieldPath> {
        match self {
            Violation::FieldRemoved { field, .. }
            | Violation::UnsafeChange { field, .. }
            | Violation::UnknownChange { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// All violations of one validation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        self.0.push(violation);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    /// `Ok(())` when nothing failed
    pub fn into_result(self) -> Result<(), Violations> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl Extend<Violation> for Violations {
    fn extend<T: IntoIterator<Item = Violation>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl FromIterator<Violation> for Violations {
    fn from_iter<T: IntoIterator<Item = Violation>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for Violations {}
