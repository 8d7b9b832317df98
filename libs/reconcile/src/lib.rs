//! Plan primitives.
//!
//! This library decides what a lifecycle driver must do to move one tracked
//! entity from its prior state to its desired state. Key concepts:
//!
//! - **Prior state**: What was last recorded for an address (after refresh).
//! - **Desired state**: What the configuration asks for.
//! - **Key**: The fields that address the entity remotely. Changing any of
//!   them cannot be done in place and forces a replacement.
//!
//! # Invariants
//!
//! - Decisions are deterministic given the same inputs
//! - Semantically equal JSON bodies never produce an update
//! - A key change always yields [`Action::Replace`], never [`Action::Update`]

use serde::Serialize;
use sha2::{Digest, Sha256};

/// A spec hash for deterministic comparison.
///
/// Used to detect when a desired body differs from the recorded one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecHash(String);

impl SpecHash {
    /// Compute a spec hash from canonical JSON.
    pub fn from_json(json: &serde_json::Value) -> Self {
        let canonical = canonical_json(json);
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let result = hasher.finalize();
        Self(format!("sha256:{}", hex::encode(&result[..16]))) // First 16 bytes (128 bits)
    }

    /// Get the hash string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SpecHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Produce canonical JSON (sorted keys, no extra whitespace).
///
/// Relies on `serde_json::Map` being key-ordered, which holds unless the
/// `preserve_order` feature is enabled somewhere in the build.
pub fn canonical_json(value: &serde_json::Value) -> String {
    value.to_string()
}

/// An entity the lifecycle driver can plan for.
pub trait Managed {
    /// The remote address. Any difference forces replacement.
    type Key: PartialEq + std::fmt::Debug;

    /// Returns the remote address of this entity.
    fn key(&self) -> Self::Key;

    /// Returns the hash of the in-place updatable body.
    fn spec_hash(&self) -> SpecHash;
}

/// Returns true if moving from `prior` to `desired` cannot happen in place.
pub fn needs_replacement<T: Managed>(prior: &T, desired: &T) -> bool {
    prior.key() != desired.key()
}

/// What the driver must do for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Prior and desired are equivalent.
    Noop,

    /// Nothing is recorded; create the desired entity.
    Create,

    /// Same key, different body; overwrite in place.
    Update,

    /// Key changed; delete the prior entity, then create the desired one.
    Replace,

    /// No longer desired; delete the prior entity.
    Delete,
}

impl Action {
    /// Returns true if the action changes anything remotely.
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Noop)
    }

    /// Short verb used in plan output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noop => "no-op",
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide the action for one address.
pub fn plan<T: Managed>(prior: Option<&T>, desired: Option<&T>) -> Action {
    match (prior, desired) {
        (None, None) => Action::Noop,
        (None, Some(_)) => Action::Create,
        (Some(_), None) => Action::Delete,
        (Some(prior), Some(desired)) => {
            if needs_replacement(prior, desired) {
                Action::Replace
            } else if prior.spec_hash() != desired.spec_hash() {
                Action::Update
            } else {
                Action::Noop
            }
        }
    }
}

/// Counts of planned actions, as printed after a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
}

impl PlanSummary {
    /// Tally a sequence of actions.
    pub fn from_actions<'a>(actions: impl IntoIterator<Item = &'a Action>) -> Self {
        let mut summary = Self::default();
        for action in actions {
            match action {
                Action::Noop => {}
                Action::Create => summary.create += 1,
                Action::Update => summary.update += 1,
                Action::Replace => summary.replace += 1,
                Action::Delete => summary.delete += 1,
            }
        }
        summary
    }

    /// Returns true if nothing would change.
    pub fn is_empty(&self) -> bool {
        self.create + self.update + self.replace + self.delete == 0
    }
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete",
            self.create, self.update, self.replace, self.delete
        )
    }
}
