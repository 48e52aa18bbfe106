//! Preflight checks run before a release is installed or upgraded
//!
//! A preflight exposes one check per release lifecycle phase. The release
//! applier decides which phase applies and calls [`run_preflight`], which also
//! honors per-extension opt-outs.

mod crd_upgrade_safety;
mod error;
mod release;
mod source;

pub use crd_upgrade_safety::CrdUpgradeSafety;
pub use error::{
    DefinitionFailure, PreflightError, Result, UpgradeSafetyReport, ValidationStage,
};
pub use release::{Release, is_custom_resource_definition, to_custom_resource_definition};
pub use source::DefinitionSource;

use std::future::Future;

use kube::ResourceExt;

use crate::crd::ClusterExtension;

/// Kinds of preflight checks an extension can opt out of
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreflightKind {
    CrdUpgradeSafety,
}

/// What the release applier is about to do with a release
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseState {
    NeedsInstall,
    NeedsUpgrade,
    Unchanged,
}

/// A check that must pass before the cluster is changed
pub trait Preflight {
    fn kind(&self) -> PreflightKind;

    /// Runs before the release is first installed
    fn install(&self, release: &Release) -> impl Future<Output = Result<()>> + Send;

    /// Runs before an existing release is upgraded
    fn upgrade(&self, release: &Release) -> impl Future<Output = Result<()>> + Send;
}

/// Run a preflight for the phase the release is in
///
/// Skipped entirely when the extension disabled this kind of preflight.
pub async fn run_preflight<P: Preflight>(
    preflight: &P,
    extension: &ClusterExtension,
    state: ReleaseState,
    desired: &Release,
) -> Result<()> {
    if extension.spec.preflight_disabled(preflight.kind()) {
        tracing::debug!(
            extension = %extension.name_any(),
            preflight = ?preflight.kind(),
            "Preflight disabled for extension, skipping"
        );
        return Ok(());
    }

    match state {
        ReleaseState::NeedsInstall => preflight.install(desired).await,
        ReleaseState::NeedsUpgrade => preflight.upgrade(desired).await,
        ReleaseState::Unchanged => Ok(()),
    }
}
