//! Error types for the preflight checks

use std::fmt;

use thiserror::Error;

use crate::safety::Violations;
use crate::schema::DefinitionError;

/// Why a preflight could not approve a release
///
/// `UnsafeUpgradeError` carries the full validation report; every other variant
/// means the check itself could not run to completion.
#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum PreflightError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("parsing release {release:?} objects: document {index}: {source}")]
    ManifestError {
        release: String,
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("converting object {name:?} to CustomResourceDefinition: {source}")]
    ConversionError {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid definition: {0}")]
    DefinitionError(#[from] DefinitionError),

    #[error("getting existing resource for CRD {0:?}: not found")]
    DefinitionNotFound(String),

    #[error("{0}")]
    UnsafeUpgradeError(UpgradeSafetyReport),
}

impl PreflightError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            PreflightError::KubeError(e) => match e {
                kube::Error::Api(api_err) => {
                    // 4xx errors (except 409 Conflict, 429 TooManyRequests) are usually not retryable
                    let code = api_err.code;
                    if (400..500).contains(&code) {
                        return code == 409 || code == 429;
                    }
                    true
                }
                _ => true,
            },
            // The active definition might appear later
            PreflightError::DefinitionNotFound(_) => true,
            // The release content itself is the problem
            PreflightError::ManifestError { .. } => false,
            PreflightError::ConversionError { .. } => false,
            PreflightError::DefinitionError(_) => false,
            PreflightError::UnsafeUpgradeError(_) => false,
        }
    }
}

pub type Result<T, E = PreflightError> = std::result::Result<T, E>;

/// Which validator produced a failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationStage {
    /// Active definition compared with the proposed one
    Upgrade,
    /// Versions of the proposed definition compared with each other
    CrossVersion,
}

/// All violations one validator found for one definition
#[derive(Clone, Debug, PartialEq)]
pub struct DefinitionFailure {
    pub definition: String,
    pub stage: ValidationStage,
    pub violations: Violations,
}

impl fmt::Display for DefinitionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            ValidationStage::Upgrade => write!(
                f,
                "validating upgrade for CRD {:?} failed: {}",
                self.definition, self.violations
            ),
            ValidationStage::CrossVersion => write!(
                f,
                "cross version validation for CRD {:?} failed: {}",
                self.definition, self.violations
            ),
        }
    }
}

/// Every failure across all definitions of a release
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpgradeSafetyReport {
    failures: Vec<DefinitionFailure>,
}

impl UpgradeSafetyReport {
    pub fn push(&mut self, failure: DefinitionFailure) {
        self.failures.push(failure);
    }

    pub fn failures(&self) -> &[DefinitionFailure] {
        &self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total number of violations across all definitions
    pub fn violation_count(&self) -> usize {
        self.failures.iter().map(|f| f.violations.len()).sum()
    }

    pub fn into_result(self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(PreflightError::UnsafeUpgradeError(self))
        }
    }
}

impl fmt::Display for UpgradeSafetyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}
