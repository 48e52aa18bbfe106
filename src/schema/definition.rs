//! Structured definition snapshot used by the upgrade-safety checks
//!
//! A [`StructuredDefinition`] is a trimmed, validation-oriented view of a
//! CustomResourceDefinition: its scope, the schema of every declared version
//! and the versions the cluster has already persisted objects under.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while converting a CustomResourceDefinition
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Missing object key: {0}")]
    MissingObjectKey(&'static str),

    #[error("CRD {name:?} has unsupported scope {scope:?}")]
    UnsupportedScope { name: String, scope: String },

    #[error("CRD {name:?} version {version:?} has an unreadable schema: {source}")]
    InvalidSchema {
        name: String,
        version: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Scope of the resources a definition declares
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Namespaced,
    Cluster,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Namespaced => write!(f, "Namespaced"),
            Scope::Cluster => write!(f, "Cluster"),
        }
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Namespaced" => Ok(Scope::Namespaced),
            "Cluster" => Ok(Scope::Cluster),
            other => Err(other.to_string()),
        }
    }
}

/// One node of an OpenAPI v3 schema tree
///
/// The attributes the change rules understand get their own fields. Every
/// other key of the source document (`nullable`, `multipleOf`,
/// `x-kubernetes-validations`, `allOf`, ...) is kept verbatim in
/// `other_attributes` so that a change to it is still noticed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,

    /// Names of the properties that must be set on this object
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<i64>,

    #[serde(flatten)]
    pub other_attributes: BTreeMap<String, Value>,
}

/// Value of `additionalProperties`: a flag, or the schema of every map value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaNode>),
}

/// A named version of a definition together with its schema
#[derive(Clone, Debug, PartialEq)]
pub struct VersionSchema {
    pub name: String,
    pub schema: SchemaNode,
}

impl VersionSchema {
    pub fn new(name: impl Into<String>, schema: SchemaNode) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// Immutable snapshot of one CustomResourceDefinition
#[derive(Clone, Debug, PartialEq)]
pub struct StructuredDefinition {
    pub name: String,
    pub scope: Scope,
    pub versions: Vec<VersionSchema>,
    /// Versions objects have ever been persisted under, declared or not
    pub stored_versions: BTreeSet<String>,
}

impl StructuredDefinition {
    /// Look up a declared version by name
    pub fn version(&self, name: &str) -> Option<&VersionSchema> {
        self.versions.iter().find(|v| v.name == name)
    }

    /// Check whether a version with this name is declared
    pub fn declares(&self, name: &str) -> bool {
        self.version(name).is_some()
    }
}

impl TryFrom<&CustomResourceDefinition> for StructuredDefinition {
    type Error = DefinitionError;

    fn try_from(crd: &CustomResourceDefinition) -> Result<Self, Self::Error> {
        let name = crd
            .metadata
            .name
            .clone()
            .ok_or(DefinitionError::MissingObjectKey("metadata.name"))?;

        let scope = crd
            .spec
            .scope
            .parse()
            .map_err(|scope| DefinitionError::UnsupportedScope {
                name: name.clone(),
                scope,
            })?;

        let versions = crd
            .spec
            .versions
            .iter()
            .map(|version| {
                let schema = match version
                    .schema
                    .as_ref()
                    .and_then(|s| s.open_api_v3_schema.as_ref())
                {
                    Some(props) => serde_json::to_value(props)
                        .and_then(serde_json::from_value)
                        .map_err(|source| DefinitionError::InvalidSchema {
                            name: name.clone(),
                            version: version.name.clone(),
                            source,
                        })?,
                    None => SchemaNode::default(),
                };
                Ok(VersionSchema::new(version.name.clone(), schema))
            })
            .collect::<Result<Vec<_>, DefinitionError>>()?;

        let stored_versions = crd
            .status
            .as_ref()
            .and_then(|s| s.stored_versions.as_ref())
            .map(|v| v.iter().cloned().collect())
            .unwrap_or_default();

        Ok(Self {
            name,
            scope,
            versions,
            stored_versions,
        })
    }
}
