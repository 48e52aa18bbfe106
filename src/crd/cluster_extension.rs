use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::preflight::PreflightKind;

/// ClusterExtension is the Schema for the clusterextensions API
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "olm.operatorframework.io",
    version = "v1alpha1",
    kind = "ClusterExtension",
    plural = "clusterextensions",
    printcolumn = r#"{"name":"Package", "type":"string", "jsonPath":".spec.packageName"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterExtensionSpec {
    /// Name of the package to install
    pub package_name: String,

    /// Namespace the package's namespaced resources are installed into
    pub install_namespace: String,

    /// Checks to run before installing or upgrading the package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preflight: Option<PreflightConfig>,
}

/// Preflight check configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreflightConfig {
    /// CRD upgrade safety check settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crd_upgrade_safety: Option<CrdUpgradeSafetyPreflightConfig>,
}

/// CRD upgrade safety preflight settings
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrdUpgradeSafetyPreflightConfig {
    /// Skip the check entirely for this extension
    #[serde(default)]
    pub disabled: bool,
}

impl ClusterExtensionSpec {
    /// Whether the extension opted out of the given preflight
    pub fn preflight_disabled(&self, kind: PreflightKind) -> bool {
        match kind {
            PreflightKind::CrdUpgradeSafety => self
                .preflight
                .as_ref()
                .and_then(|p| p.crd_upgrade_safety.as_ref())
                .is_some_and(|c| c.disabled),
        }
    }
}
