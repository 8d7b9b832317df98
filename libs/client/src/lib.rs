//! # mkr-client
//!
//! HTTP client for the Mackerel `/api/v0` service and metadata endpoints.
//!
//! The lifecycle code talks to the API through the [`MetadataApi`] and
//! [`ServiceApi`] traits; [`ApiClient`] is the reqwest-backed implementation.

mod api;
mod client;
mod config;
mod error;
mod models;

pub use api::{MetadataApi, ServiceApi};
pub use client::ApiClient;
pub use config::{ClientConfig, DEFAULT_API_BASE, DEFAULT_TIMEOUT};
pub use error::ClientError;
pub use models::{CreateServiceRequest, Service};
