//! Manifest parsing.
//!
//! A manifest declares the desired documents, keyed by a local address:
//!
//! ```toml
//! [service_metadata.foo]
//! service = "tf-abc"
//! namespace = "tf-namespace-abc"
//! metadata_json = '{"id":1}'
//!
//! [service_metadata.bar]
//! service = "tf-abc"
//! namespace = "deploy"
//! [service_metadata.bar.metadata]
//! id = 2
//! ```
//!
//! Exactly one of `metadata_json` (a JSON object string) or `metadata` (a
//! TOML table encoded as JSON) must be given.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use mkr_id::ServiceMetadataId;
use mkr_provider::{MetadataDocument, ServiceMetadata};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    service_metadata: BTreeMap<String, RawServiceMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServiceMetadata {
    service: String,
    namespace: String,
    #[serde(default)]
    metadata_json: Option<String>,
    #[serde(default)]
    metadata: Option<toml::Table>,
}

/// Desired state, by address.
#[derive(Debug, Default)]
pub struct Manifest {
    pub service_metadata: BTreeMap<String, ServiceMetadata>,
}

pub fn parse_manifest(contents: &str) -> Result<Manifest> {
    let raw: RawManifest = toml::from_str(contents).context("invalid manifest TOML")?;

    let mut service_metadata = BTreeMap::new();
    let mut owners: HashMap<ServiceMetadataId, String> = HashMap::new();

    for (address, entry) in raw.service_metadata {
        validate_address(&address)?;
        let resource = convert(entry)
            .with_context(|| format!("invalid service_metadata.{address}"))?;

        if let Some(other) = owners.insert(resource.id(), address.clone()) {
            anyhow::bail!(
                "service_metadata.{other} and service_metadata.{address} both manage '{}'",
                resource.id()
            );
        }
        service_metadata.insert(address, resource);
    }

    Ok(Manifest { service_metadata })
}

pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest: {}", path.display()))?;
    parse_manifest(&contents).with_context(|| format!("failed to load manifest: {}", path.display()))
}

/// Addresses are local labels: ASCII letters, digits, `-` and `_`.
pub fn validate_address(address: &str) -> Result<()> {
    if address.is_empty() {
        anyhow::bail!("resource address cannot be empty");
    }
    if !address
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        anyhow::bail!("resource address '{address}' may only contain letters, digits, '-' and '_'");
    }
    Ok(())
}

fn convert(entry: RawServiceMetadata) -> Result<ServiceMetadata> {
    let document = match (entry.metadata_json, entry.metadata) {
        (Some(json), None) => MetadataDocument::parse(&json)?,
        (None, Some(table)) => {
            let value = serde_json::to_value(&table).context("failed to encode metadata table")?;
            MetadataDocument::from_value(value)?
        }
        (Some(_), Some(_)) => anyhow::bail!("set only one of metadata_json or metadata"),
        (None, None) => anyhow::bail!("one of metadata_json or metadata is required"),
    };

    Ok(ServiceMetadata::new(
        entry.service.parse()?,
        entry.namespace.parse()?,
        document,
    ))
}
