//! Read access to the definitions currently active in the cluster

use std::future::Future;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::Api;

use super::error::{PreflightError, Result};
use crate::schema::StructuredDefinition;

/// Source of the currently active definitions
pub trait DefinitionSource {
    /// Fetch the active definition with this name
    ///
    /// Fails with [`PreflightError::DefinitionNotFound`] when it does not exist.
    fn fetch(&self, name: &str) -> impl Future<Output = Result<StructuredDefinition>> + Send;
}

impl DefinitionSource for Api<CustomResourceDefinition> {
    async fn fetch(&self, name: &str) -> Result<StructuredDefinition> {
        let crd = self
            .get_opt(name)
            .await?
            .ok_or_else(|| PreflightError::DefinitionNotFound(name.to_string()))?;
        Ok(StructuredDefinition::try_from(&crd)?)
    }
}
