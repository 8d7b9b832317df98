//! # mkr-provider
//!
//! Declarative lifecycle for Mackerel service metadata.
//!
//! - [`ServiceMetadataResource`] binds create/read/update/delete/import of one
//!   `(service, namespace)` document to the remote API.
//! - [`ServiceResource`] manages the parent service a document attaches to.
//! - [`Lifecycle`] turns a prior/desired pair into remote calls using the
//!   replacement policy from `mkr-reconcile`.
//! - [`Provider`] owns the single API client and hands clones to resources.

mod config;
mod document;
mod error;
mod lifecycle;
pub mod schema;
mod service;
mod service_metadata;

#[cfg(test)]
mod memory;

pub use config::{Provider, ProviderConfig};
pub use document::MetadataDocument;
pub use error::ResourceError;
pub use lifecycle::{Applied, Lifecycle};
pub use mkr_reconcile::Action;
pub use service::{ServiceConfig, ServiceResource, SCHEMA as SERVICE_SCHEMA};
pub use service_metadata::{
    needs_replacement, parse_import_id, ServiceMetadata, ServiceMetadataDataSource,
    ServiceMetadataResource, SCHEMA as SERVICE_METADATA_SCHEMA,
};
