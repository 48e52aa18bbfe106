//! Rendered release content
//!
//! A release manifest is a multi-document YAML stream. Only the
//! CustomResourceDefinition objects in it matter to the upgrade-safety check.

use k8s_openapi::Resource;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::ResourceExt;
use kube::api::DynamicObject;
use serde::Deserialize;

use super::error::{PreflightError, Result};

/// A rendered release, as handed over by the release applier
#[derive(Clone, Debug, PartialEq)]
pub struct Release {
    pub name: String,
    pub manifest: String,
}

impl Release {
    pub fn new(name: impl Into<String>, manifest: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            manifest: manifest.into(),
        }
    }

    /// Decode every non-empty document of the manifest
    pub fn objects(&self) -> Result<Vec<DynamicObject>> {
        let mut objects = Vec::new();
        for (index, document) in serde_yaml::Deserializer::from_str(&self.manifest).enumerate() {
            let value = serde_yaml::Value::deserialize(document)
                .map_err(|source| self.manifest_error(index, source))?;
            if value.is_null() {
                continue;
            }
            let object: DynamicObject = serde_yaml::from_value(value)
                .map_err(|source| self.manifest_error(index, source))?;
            objects.push(object);
        }
        Ok(objects)
    }

    fn manifest_error(&self, index: usize, source: serde_yaml::Error) -> PreflightError {
        PreflightError::ManifestError {
            release: self.name.clone(),
            index,
            source,
        }
    }
}

/// Check whether the object is an apiextensions.k8s.io/v1 CustomResourceDefinition
pub fn is_custom_resource_definition(object: &DynamicObject) -> bool {
    object.types.as_ref().is_some_and(|t| {
        t.api_version == CustomResourceDefinition::API_VERSION
            && t.kind == CustomResourceDefinition::KIND
    })
}

/// Convert a decoded object into the typed CustomResourceDefinition
pub fn to_custom_resource_definition(object: &DynamicObject) -> Result<CustomResourceDefinition> {
    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .map_err(|source| PreflightError::ConversionError {
            name: object.name_any(),
            source,
        })
}
