//! # mkr-id
//!
//! Typed names and composite identifiers for Mackerel service metadata.
//!
//! ## Design Principles
//!
//! - Names are user-controlled labels validated once at the boundary
//! - The composite ID is derived, never stored remotely
//! - IDs support roundtrip serialization (parse → format → parse)
//! - Service names and namespaces are distinct types and cannot be swapped
//!
//! ## ID Format
//!
//! A service metadata entity is addressed by `{service}/{namespace}`:
//!
//! - `tf-abc/tf-namespace-abc`
//! - `my-service/deploy.info`
//!
//! Neither component may contain the `/` separator, so the composite form
//! always splits unambiguously.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Separator between the service name and namespace in a composite ID.
pub const SEPARATOR: char = '/';
