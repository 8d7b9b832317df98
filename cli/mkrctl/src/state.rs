//! Local state file.
//!
//! Records the last known state of every managed address so that `apply`
//! can tell creates from updates and notice removals from the manifest.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mkr_provider::ServiceMetadata;
use serde::{Deserialize, Serialize};

/// Current state file format version.
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub version: u32,
    /// Incremented on every save.
    pub serial: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resources: BTreeMap<String, ServiceMetadata>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            serial: 0,
            updated_at: None,
            resources: BTreeMap::new(),
        }
    }
}

impl State {
    /// Load state from disk. A missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state from {:?}", path))?;
        let state: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse state from {:?}", path))?;

        if state.version != STATE_VERSION {
            anyhow::bail!(
                "unsupported state version {} in {:?} (expected {})",
                state.version,
                path,
                STATE_VERSION
            );
        }
        Ok(state)
    }

    /// Write state atomically: a sibling temp file, then rename.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.serial += 1;
        self.updated_at = Some(Utc::now());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, path).with_context(|| format!("Failed to replace {:?}", path))?;
        Ok(())
    }

    /// Record `resource` at `address`, or forget the address on `None`.
    pub fn set(&mut self, address: &str, resource: Option<ServiceMetadata>) {
        match resource {
            Some(resource) => {
                self.resources.insert(address.to_string(), resource);
            }
            None => {
                self.resources.remove(address);
            }
        }
    }

    /// Address already tracking the given key, if any.
    pub fn address_of(&self, id: &mkr_id::ServiceMetadataId) -> Option<&str> {
        self.resources
            .iter()
            .find(|(_, r)| &r.id() == id)
            .map(|(address, _)| address.as_str())
    }
}
