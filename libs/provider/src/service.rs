//! The `mackerel_service` resource: the parent entity metadata attaches to.

use mkr_client::{ApiClient, CreateServiceRequest, Service, ServiceApi};
use mkr_id::ServiceName;
use mkr_reconcile::{Managed, SpecHash};
use serde::{Deserialize, Serialize};

use crate::error::ResourceError;
use crate::schema::{Attribute, AttributeType, Mutability, Schema};

/// Schema of the service resource. Mackerel has no service update endpoint,
/// so every configurable attribute forces replacement.
pub const SCHEMA: Schema = Schema {
    type_name: "mackerel_service",
    attributes: &[
        Attribute {
            name: "name",
            ty: AttributeType::String,
            mutability: Mutability::ForceReplacement,
            description: "Service name.",
        },
        Attribute {
            name: "memo",
            ty: AttributeType::String,
            mutability: Mutability::ForceReplacement,
            description: "Free-form notes about the service.",
        },
    ],
};

/// Desired configuration of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: ServiceName,
    #[serde(default)]
    pub memo: String,
}

impl Managed for ServiceConfig {
    type Key = (ServiceName, String);

    fn key(&self) -> Self::Key {
        (self.name.clone(), self.memo.clone())
    }

    fn spec_hash(&self) -> SpecHash {
        SpecHash::from_json(&serde_json::Value::Null)
    }
}

impl From<Service> for ServiceConfig {
    fn from(service: Service) -> Self {
        Self {
            name: service.name,
            memo: service.memo,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceResource<C = ApiClient> {
    client: C,
}

impl<C> ServiceResource<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn schema(&self) -> &'static Schema {
        &SCHEMA
    }
}

impl<C: ServiceApi> ServiceResource<C> {
    pub async fn create(&self, desired: &ServiceConfig) -> Result<Service, ResourceError> {
        let service = self
            .client
            .create_service(&CreateServiceRequest {
                name: desired.name.clone(),
                memo: desired.memo.clone(),
            })
            .await?;

        tracing::info!(service = %service.name, "created service");
        Ok(service)
    }

    /// Look the service up by name. `None` means it no longer exists.
    pub async fn read(&self, name: &ServiceName) -> Result<Option<Service>, ResourceError> {
        let services = self.client.list_services().await?;
        let found = services.into_iter().find(|s| &s.name == name);
        if found.is_none() {
            tracing::warn!(service = %name, "service not found, removing from state");
        }
        Ok(found)
    }

    /// List all services.
    pub async fn list(&self) -> Result<Vec<Service>, ResourceError> {
        let mut services = self.client.list_services().await?;
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    /// Delete the service and, remotely, every metadata document under it.
    /// Deleting an absent service succeeds.
    pub async fn delete(&self, name: &ServiceName) -> Result<(), ResourceError> {
        match self.client.delete_service(name).await {
            Ok(_) => {
                tracing::info!(service = %name, "deleted service");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(service = %name, "service already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
