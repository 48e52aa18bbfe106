pub mod crd;
pub mod preflight;
pub mod safety;
pub mod schema;

pub use crd::ClusterExtension;
pub use preflight::{
    CrdUpgradeSafety, DefinitionSource, Preflight, PreflightError, PreflightKind, Release,
    ReleaseState, Result, run_preflight,
};
pub use safety::{CrossVersionValidator, Validator, Violation, Violations};
pub use schema::{Scope, StructuredDefinition};
