//! API traits consumed by the resource lifecycle.
//!
//! Resources depend on these traits rather than on [`crate::ApiClient`]
//! directly, so the same lifecycle code runs against the real API, the fake
//! server in `mkr-testing`, or an in-memory double.

use std::sync::Arc;

use async_trait::async_trait;
use mkr_id::{Namespace, ServiceName};

use crate::error::ClientError;
use crate::models::{CreateServiceRequest, Service};

/// Metadata endpoints keyed by `(service, namespace)`.
#[async_trait]
pub trait MetadataApi: Send + Sync {
    /// Fetch the document stored under the key.
    ///
    /// An absent key is reported as an error for which
    /// [`ClientError::is_not_found`] returns true.
    async fn get_service_metadata(
        &self,
        service: &ServiceName,
        namespace: &Namespace,
    ) -> Result<serde_json::Value, ClientError>;

    /// Create or overwrite the document stored under the key.
    async fn put_service_metadata(
        &self,
        service: &ServiceName,
        namespace: &Namespace,
        metadata: &serde_json::Value,
    ) -> Result<(), ClientError>;

    /// Delete the document stored under the key.
    async fn delete_service_metadata(
        &self,
        service: &ServiceName,
        namespace: &Namespace,
    ) -> Result<(), ClientError>;

    /// List the namespaces holding metadata under a service.
    async fn list_service_metadata_namespaces(
        &self,
        service: &ServiceName,
    ) -> Result<Vec<Namespace>, ClientError>;
}

/// Service endpoints.
#[async_trait]
pub trait ServiceApi: Send + Sync {
    async fn list_services(&self) -> Result<Vec<Service>, ClientError>;

    async fn create_service(&self, request: &CreateServiceRequest) -> Result<Service, ClientError>;

    async fn delete_service(&self, name: &ServiceName) -> Result<Service, ClientError>;
}

#[async_trait]
impl<T: MetadataApi + ?Sized> MetadataApi for Arc<T> {
    async fn get_service_metadata(
        &self,
        service: &ServiceName,
        namespace: &Namespace,
    ) -> Result<serde_json::Value, ClientError> {
        (**self).get_service_metadata(service, namespace).await
    }

    async fn put_service_metadata(
        &self,
        service: &ServiceName,
        namespace: &Namespace,
        metadata: &serde_json::Value,
    ) -> Result<(), ClientError> {
        (**self)
            .put_service_metadata(service, namespace, metadata)
            .await
    }

    async fn delete_service_metadata(
        &self,
        service: &ServiceName,
        namespace: &Namespace,
    ) -> Result<(), ClientError> {
        (**self).delete_service_metadata(service, namespace).await
    }

    async fn list_service_metadata_namespaces(
        &self,
        service: &ServiceName,
    ) -> Result<Vec<Namespace>, ClientError> {
        (**self).list_service_metadata_namespaces(service).await
    }
}

#[async_trait]
impl<T: ServiceApi + ?Sized> ServiceApi for Arc<T> {
    async fn list_services(&self) -> Result<Vec<Service>, ClientError> {
        (**self).list_services().await
    }

    async fn create_service(&self, request: &CreateServiceRequest) -> Result<Service, ClientError> {
        (**self).create_service(request).await
    }

    async fn delete_service(&self, name: &ServiceName) -> Result<Service, ClientError> {
        (**self).delete_service(name).await
    }
}
