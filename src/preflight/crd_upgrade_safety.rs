//! CRD upgrade safety preflight
//!
//! Before a release is upgraded, every CustomResourceDefinition it carries is
//! compared with the definition currently active in the cluster, and its
//! versions are compared with each other. All failures across all
//! definitions are reported together.

use super::error::{DefinitionFailure, Result, UpgradeSafetyReport, ValidationStage};
use super::release::{Release, is_custom_resource_definition, to_custom_resource_definition};
use super::source::DefinitionSource;
use super::{Preflight, PreflightKind};
use crate::safety::{CrossVersionValidator, Validator};
use crate::schema::StructuredDefinition;

pub struct CrdUpgradeSafety<S> {
    source: S,
    validator: Validator,
    cross_version_validator: CrossVersionValidator,
}

impl<S> CrdUpgradeSafety<S>
where
    S: DefinitionSource + Sync,
{
    pub fn new(source: S) -> Self {
        Self {
            source,
            validator: Validator::default(),
            cross_version_validator: CrossVersionValidator::default(),
        }
    }

    /// Override the upgrade validator
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Override the cross-version validator
    pub fn with_cross_version_validator(mut self, validator: CrossVersionValidator) -> Self {
        self.cross_version_validator = validator;
        self
    }

    /// Extract the definitions a release would apply
    pub fn proposed_definitions(release: &Release) -> Result<Vec<StructuredDefinition>> {
        let mut definitions = Vec::new();
        for object in release.objects()? {
            if !is_custom_resource_definition(&object) {
                continue;
            }
            let crd = to_custom_resource_definition(&object)?;
            definitions.push(StructuredDefinition::try_from(&crd)?);
        }
        Ok(definitions)
    }

    /// Validate one proposed definition against the active one
    fn check(
        &self,
        active: &StructuredDefinition,
        proposed: &StructuredDefinition,
        report: &mut UpgradeSafetyReport,
    ) {
        if let Err(violations) = self.validator.validate(active, proposed) {
            report.push(DefinitionFailure {
                definition: proposed.name.clone(),
                stage: ValidationStage::Upgrade,
                violations,
            });
        }

        if let Err(violations) = self.cross_version_validator.validate(proposed) {
            report.push(DefinitionFailure {
                definition: proposed.name.clone(),
                stage: ValidationStage::CrossVersion,
                violations,
            });
        }
    }
}

impl<S> Preflight for CrdUpgradeSafety<S>
where
    S: DefinitionSource + Sync,
{
    fn kind(&self) -> PreflightKind {
        PreflightKind::CrdUpgradeSafety
    }

    /// Nothing exists yet to compare against; only the content is decoded
    async fn install(&self, release: &Release) -> Result<()> {
        Self::proposed_definitions(release)?;
        Ok(())
    }

    async fn upgrade(&self, release: &Release) -> Result<()> {
        let proposed = Self::proposed_definitions(release)?;
        tracing::info!(
            release = %release.name,
            definitions = proposed.len(),
            "Checking CRD upgrade safety"
        );

        let mut report = UpgradeSafetyReport::default();
        for definition in &proposed {
            let active = self.source.fetch(&definition.name).await?;
            self.check(&active, definition, &mut report);
        }

        if report.is_empty() {
            tracing::info!(release = %release.name, "CRD upgrade safety check passed");
        } else {
            tracing::warn!(
                release = %release.name,
                failures = report.failures().len(),
                violations = report.violation_count(),
                "CRD upgrade safety check failed"
            );
        }
        report.into_result()
    }
}
