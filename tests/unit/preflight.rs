//! Unit tests for the preflight orchestration
//!
//! These run the CRD upgrade safety preflight against rendered release
//! manifests, with an in-memory source standing in for the cluster.

use std::sync::atomic::{AtomicUsize, Ordering};

use crd_upgrade_safety::crd::{
    ClusterExtension, ClusterExtensionSpec, CrdUpgradeSafetyPreflightConfig, PreflightConfig,
};
use crd_upgrade_safety::preflight::{
    CrdUpgradeSafety, Preflight, PreflightError, PreflightKind, Release, ReleaseState,
    ValidationStage, run_preflight,
};
use crd_upgrade_safety::schema::{SchemaNode, Scope, VersionSchema};

use crate::common::*;

fn gadgets(schema: SchemaNode) -> crd_upgrade_safety::StructuredDefinition {
    definition(
        "gadgets.example.com",
        Scope::Cluster,
        vec![VersionSchema::new("v1", schema)],
        &["v1"],
    )
}

#[tokio::test]
async fn test_unchanged_release_passes() {
    let active = widgets(Scope::Namespaced, widget_schema());
    let preflight = CrdUpgradeSafety::new(StaticDefinitions::with(&[&active]));

    let release = release_with(&[&active]);
    assert!(preflight.upgrade(&release).await.is_ok());
}

#[tokio::test]
async fn test_proposed_definitions_extracted() {
    let def = widgets(Scope::Namespaced, widget_schema());
    let release = release_with(&[&def]);

    let proposed = CrdUpgradeSafety::<StaticDefinitions>::proposed_definitions(&release).unwrap();
    assert_eq!(proposed.len(), 1);
    assert_eq!(proposed[0].name, WIDGETS);
    assert_eq!(proposed[0].scope, Scope::Namespaced);
    assert_eq!(proposed[0].versions[0].schema, widget_schema());
}

#[tokio::test]
async fn test_install_is_noop() {
    let preflight = CrdUpgradeSafety::new(StaticDefinitions::default());
    let def = widgets(Scope::Namespaced, widget_schema());
    // Nothing is active yet, which is fine for an install
    assert!(preflight.install(&release_with(&[&def])).await.is_ok());
}

#[tokio::test]
async fn test_install_rejects_undecodable_content() {
    let preflight = CrdUpgradeSafety::new(StaticDefinitions::default());
    let release = Release::new("broken", "- just\n- a list\n");
    let err = preflight.install(&release).await.unwrap_err();
    assert!(matches!(err, PreflightError::ManifestError { index: 0, .. }));
}

#[tokio::test]
async fn test_missing_active_definition_is_fatal() {
    let preflight = CrdUpgradeSafety::new(StaticDefinitions::default());
    let def = widgets(Scope::Namespaced, widget_schema());

    let err = preflight.upgrade(&release_with(&[&def])).await.unwrap_err();
    match err {
        PreflightError::DefinitionNotFound(name) => assert_eq!(name, WIDGETS),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_release_without_crds_passes() {
    let preflight = CrdUpgradeSafety::new(StaticDefinitions::default());
    assert!(preflight.upgrade(&release_with(&[])).await.is_ok());
}

#[tokio::test]
async fn test_failures_aggregated_across_definitions() {
    let active_widgets = widgets(Scope::Namespaced, widget_schema());
    let active_gadgets = gadgets(widget_schema());
    let preflight =
        CrdUpgradeSafety::new(StaticDefinitions::with(&[&active_widgets, &active_gadgets]));

    // widgets changes scope; gadgets serves a second, incompatible version
    let proposed_widgets = widgets(Scope::Cluster, widget_schema());
    let proposed_gadgets = definition(
        "gadgets.example.com",
        Scope::Cluster,
        vec![
            VersionSchema::new("v1", widget_schema()),
            VersionSchema::new(
                "v2",
                with_spec_field(widget_schema(), "size", integer_field()),
            ),
        ],
        &["v1"],
    );

    let err = preflight
        .upgrade(&release_with(&[&proposed_widgets, &proposed_gadgets]))
        .await
        .unwrap_err();

    let PreflightError::UnsafeUpgradeError(report) = err else {
        panic!("expected an unsafe upgrade report");
    };
    let failures: Vec<(&str, ValidationStage)> = report
        .failures()
        .iter()
        .map(|f| (f.definition.as_str(), f.stage))
        .collect();
    assert_eq!(
        failures,
        vec![
            (WIDGETS, ValidationStage::Upgrade),
            ("gadgets.example.com", ValidationStage::CrossVersion),
        ]
    );

    let message = report.to_string();
    assert!(message.contains(
        "validating upgrade for CRD \"widgets.example.com\" failed: scope changed from Namespaced to Cluster"
    ));
    assert!(message.contains("cross version validation for CRD \"gadgets.example.com\" failed"));
    assert!(message.contains(
        "version \"v1\" compared to version \"v2\", field \"spec.size\" has unknown change"
    ));
    assert!(!err_is_retryable(&report));
}

fn err_is_retryable(report: &crd_upgrade_safety::preflight::UpgradeSafetyReport) -> bool {
    PreflightError::UnsafeUpgradeError(report.clone()).is_retryable()
}

// =============================================================================
// Runner and per-extension opt-out
// =============================================================================

/// Counts how often each phase is invoked
#[derive(Default)]
struct CountingPreflight {
    installs: AtomicUsize,
    upgrades: AtomicUsize,
}

impl Preflight for CountingPreflight {
    fn kind(&self) -> PreflightKind {
        PreflightKind::CrdUpgradeSafety
    }

    async fn install(&self, _release: &Release) -> Result<(), PreflightError> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn upgrade(&self, _release: &Release) -> Result<(), PreflightError> {
        self.upgrades.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn extension(disabled: Option<bool>) -> ClusterExtension {
    ClusterExtension::new(
        "widgets",
        ClusterExtensionSpec {
            package_name: "widgets".to_string(),
            install_namespace: "widgets-system".to_string(),
            preflight: disabled.map(|disabled| PreflightConfig {
                crd_upgrade_safety: Some(CrdUpgradeSafetyPreflightConfig { disabled }),
            }),
        },
    )
}

#[tokio::test]
async fn test_runner_dispatches_on_state() {
    let preflight = CountingPreflight::default();
    let release = release_with(&[]);
    let ext = extension(None);

    run_preflight(&preflight, &ext, ReleaseState::NeedsInstall, &release)
        .await
        .unwrap();
    run_preflight(&preflight, &ext, ReleaseState::NeedsUpgrade, &release)
        .await
        .unwrap();
    run_preflight(&preflight, &ext, ReleaseState::Unchanged, &release)
        .await
        .unwrap();

    assert_eq!(preflight.installs.load(Ordering::SeqCst), 1);
    assert_eq!(preflight.upgrades.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disabled_preflight_never_invoked() {
    let preflight = CountingPreflight::default();
    let release = release_with(&[]);
    let ext = extension(Some(true));

    run_preflight(&preflight, &ext, ReleaseState::NeedsInstall, &release)
        .await
        .unwrap();
    run_preflight(&preflight, &ext, ReleaseState::NeedsUpgrade, &release)
        .await
        .unwrap();

    assert_eq!(preflight.installs.load(Ordering::SeqCst), 0);
    assert_eq!(preflight.upgrades.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_explicitly_enabled_preflight_runs() {
    let preflight = CountingPreflight::default();
    let ext = extension(Some(false));

    run_preflight(&preflight, &ext, ReleaseState::NeedsUpgrade, &release_with(&[]))
        .await
        .unwrap();
    assert_eq!(preflight.upgrades.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disabled_extension_skips_unsafe_upgrade() {
    let active = widgets(Scope::Namespaced, widget_schema());
    let proposed = widgets(Scope::Cluster, widget_schema());
    let preflight = CrdUpgradeSafety::new(StaticDefinitions::with(&[&active]));
    let release = release_with(&[&proposed]);

    let enabled = run_preflight(&preflight, &extension(None), ReleaseState::NeedsUpgrade, &release).await;
    assert!(matches!(enabled, Err(PreflightError::UnsafeUpgradeError(_))));

    let disabled =
        run_preflight(&preflight, &extension(Some(true)), ReleaseState::NeedsUpgrade, &release).await;
    assert!(disabled.is_ok());
}
