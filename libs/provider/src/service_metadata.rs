//! The `mackerel_service_metadata` resource and data source.

use mkr_client::{ApiClient, MetadataApi};
use mkr_id::{Namespace, ServiceMetadataId, ServiceName};
use mkr_reconcile::{Managed, SpecHash};
use serde::{Deserialize, Serialize};

use crate::document::MetadataDocument;
use crate::error::ResourceError;
use crate::schema::{Attribute, AttributeType, Mutability, Schema};

const KIND: &str = "service metadata";

/// Schema of the service metadata resource.
pub const SCHEMA: Schema = Schema {
    type_name: "mackerel_service_metadata",
    attributes: &[
        Attribute {
            name: "service",
            ty: AttributeType::String,
            mutability: Mutability::ForceReplacement,
            description: "Name of the service the metadata is attached to.",
        },
        Attribute {
            name: "namespace",
            ty: AttributeType::String,
            mutability: Mutability::ForceReplacement,
            description: "Namespace of the metadata under the service.",
        },
        Attribute {
            name: "metadata_json",
            ty: AttributeType::JsonString,
            mutability: Mutability::Updatable,
            description: "Metadata document as a JSON object string.",
        },
        Attribute {
            name: "id",
            ty: AttributeType::String,
            mutability: Mutability::Computed,
            description: "Composite ID `<service>/<namespace>`.",
        },
    ],
};

/// One metadata document and its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    pub service: ServiceName,
    pub namespace: Namespace,
    pub metadata_json: MetadataDocument,
}

impl ServiceMetadata {
    pub fn new(service: ServiceName, namespace: Namespace, metadata_json: MetadataDocument) -> Self {
        Self {
            service,
            namespace,
            metadata_json,
        }
    }

    /// Build from raw attribute strings, validating each.
    pub fn parse(service: &str, namespace: &str, metadata_json: &str) -> Result<Self, ResourceError> {
        Ok(Self {
            service: ServiceName::parse(service)?,
            namespace: Namespace::parse(namespace)?,
            metadata_json: MetadataDocument::parse(metadata_json)?,
        })
    }

    /// The composite ID `service/namespace`.
    pub fn id(&self) -> ServiceMetadataId {
        ServiceMetadataId::new(self.service.clone(), self.namespace.clone())
    }
}

impl Managed for ServiceMetadata {
    type Key = ServiceMetadataId;

    fn key(&self) -> Self::Key {
        self.id()
    }

    fn spec_hash(&self) -> SpecHash {
        self.metadata_json.spec_hash()
    }
}

/// Returns true if moving from `old` to `new` must replace the document.
pub fn needs_replacement(old: &ServiceMetadata, new: &ServiceMetadata) -> bool {
    old.service != new.service || old.namespace != new.namespace
}

/// First force-replacement field that differs, if any.
fn replaced_field(old: &ServiceMetadata, new: &ServiceMetadata) -> Option<&'static str> {
    if old.service != new.service {
        Some("service")
    } else if old.namespace != new.namespace {
        Some("namespace")
    } else {
        None
    }
}

/// Parse an import ID of the form `<service>/<namespace>`.
pub fn parse_import_id(raw: &str) -> Result<ServiceMetadataId, ResourceError> {
    Ok(ServiceMetadataId::parse(raw)?)
}

/// Binds the service metadata lifecycle to a metadata API.
///
/// Holds only the injected client, so clones can drive distinct keys
/// concurrently.
#[derive(Debug, Clone)]
pub struct ServiceMetadataResource<C = ApiClient> {
    client: C,
}

impl<C> ServiceMetadataResource<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn schema(&self) -> &'static Schema {
        &SCHEMA
    }
}

impl<C: MetadataApi> ServiceMetadataResource<C> {
    /// Store the document under its key and return the composite ID.
    pub async fn create(&self, desired: &ServiceMetadata) -> Result<ServiceMetadataId, ResourceError> {
        let id = desired.id();
        self.client
            .put_service_metadata(
                &desired.service,
                &desired.namespace,
                &desired.metadata_json.to_value(),
            )
            .await?;

        tracing::info!(id = %id, "created service metadata");
        Ok(id)
    }

    /// Fetch the current document. `None` means it was deleted out of band.
    pub async fn read(&self, id: &ServiceMetadataId) -> Result<Option<ServiceMetadata>, ResourceError> {
        let value = match self
            .client
            .get_service_metadata(id.service(), id.namespace())
            .await
        {
            Ok(value) => value,
            Err(e) if e.is_not_found() => {
                tracing::warn!(id = %id, "service metadata not found, removing from state");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let metadata_json = MetadataDocument::from_value(value)?;
        Ok(Some(ServiceMetadata::new(
            id.service().clone(),
            id.namespace().clone(),
            metadata_json,
        )))
    }

    /// Overwrite the document in full.
    ///
    /// Fails with [`ResourceError::RequiresReplacement`] without calling the
    /// API if `service` or `namespace` differ between `prior` and `desired`.
    pub async fn update(
        &self,
        prior: &ServiceMetadata,
        desired: &ServiceMetadata,
    ) -> Result<(), ResourceError> {
        if let Some(field) = replaced_field(prior, desired) {
            return Err(ResourceError::RequiresReplacement {
                id: prior.id().to_string(),
                field,
            });
        }

        self.client
            .put_service_metadata(
                &desired.service,
                &desired.namespace,
                &desired.metadata_json.to_value(),
            )
            .await?;

        tracing::info!(id = %desired.id(), "updated service metadata");
        Ok(())
    }

    /// Delete the document. Deleting an absent key succeeds.
    pub async fn delete(&self, id: &ServiceMetadataId) -> Result<(), ResourceError> {
        match self
            .client
            .delete_service_metadata(id.service(), id.namespace())
            .await
        {
            Ok(()) => {
                tracing::info!(id = %id, "deleted service metadata");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(id = %id, "service metadata already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Hydrate an existing document from an import ID.
    pub async fn import(&self, raw: &str) -> Result<ServiceMetadata, ResourceError> {
        let id = parse_import_id(raw)?;
        self.read(&id)
            .await?
            .ok_or_else(|| ResourceError::not_found(KIND, &id))
    }
}

/// Read-only lookup of service metadata.
#[derive(Debug, Clone)]
pub struct ServiceMetadataDataSource<C = ApiClient> {
    client: C,
}

impl<C: MetadataApi> ServiceMetadataDataSource<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Fetch a document; absence is an error.
    pub async fn read(
        &self,
        service: &ServiceName,
        namespace: &Namespace,
    ) -> Result<ServiceMetadata, ResourceError> {
        let id = ServiceMetadataId::new(service.clone(), namespace.clone());
        let value = self
            .client
            .get_service_metadata(service, namespace)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ResourceError::not_found(KIND, &id)
                } else {
                    ResourceError::RemoteApi(e)
                }
            })?;

        Ok(ServiceMetadata::new(
            service.clone(),
            namespace.clone(),
            MetadataDocument::from_value(value)?,
        ))
    }

    /// List namespaces holding metadata under a service.
    pub async fn namespaces(&self, service: &ServiceName) -> Result<Vec<Namespace>, ResourceError> {
        let mut namespaces = self
            .client
            .list_service_metadata_namespaces(service)
            .await?;
        namespaces.sort();
        Ok(namespaces)
    }
}
