//! Resource-level errors.

use mkr_client::ClientError;
use mkr_id::IdError;
use thiserror::Error;

/// Errors surfaced by resource lifecycle operations.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Malformed import identifier or name.
    #[error(transparent)]
    InvalidFormat(#[from] IdError),

    /// The backend has no record for the key.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// `metadata_json` is not a JSON object.
    #[error("invalid metadata_json: {0}")]
    InvalidDocument(String),

    /// An in-place update was requested for a force-replacement field.
    #[error("changing {field} of {id} requires replacement")]
    RequiresReplacement { id: String, field: &'static str },

    /// Any other backend failure.
    #[error(transparent)]
    RemoteApi(#[from] ClientError),

    /// Provider configuration is incomplete or invalid.
    #[error("invalid provider configuration: {0}")]
    Config(String),
}

impl ResourceError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Returns true if the record itself is absent. A 404 for its parent
    /// service stays a [`ResourceError::RemoteApi`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for a malformed import identifier.
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, Self::InvalidFormat(e) if e.is_invalid_format())
    }
}
