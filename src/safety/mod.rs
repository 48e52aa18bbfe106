//! CRD upgrade-safety validation
//!
//! Decides whether a proposed CustomResourceDefinition is backward compatible
//! with the active one, and whether its versions are mutually convertible.
//!
//! Checks come in two groups:
//! - Structural checks on the whole definition (scope, stored versions, field removal)
//! - Change rules on each field diff, deny-by-default for anything unrecognized

pub mod error;
pub mod rules;
pub mod structural;
mod validator;

pub use error::{ChangeError, Comparison, Constraint, Violation, Violations};
pub use rules::{ChangeRule, ValidationOutcome, default_change_rules, evaluate_rules};
pub use structural::{StructuralCheck, structural_checks};
pub use validator::{CrossVersionValidator, Validator};
