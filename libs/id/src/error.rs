//! Error types for name and ID parsing.

use thiserror::Error;

/// Errors that can occur when parsing or validating names and IDs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The name is empty.
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },

    /// The name contains the composite ID separator.
    #[error("{kind} '{value}' must not contain '/'")]
    ContainsSeparator { kind: &'static str, value: String },

    /// The composite ID does not have the `{service}/{namespace}` shape.
    #[error("the ID must be in the form '<service name>/<namespace>'")]
    InvalidFormat { raw: String },
}

impl IdError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty { .. })
    }

    /// Returns true if this error came from parsing a composite ID.
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, IdError::InvalidFormat { .. })
    }
}
