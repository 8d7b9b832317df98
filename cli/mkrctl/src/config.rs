//! Configuration and credential storage.
//!
//! Handles:
//! - API endpoint override saved on disk
//! - API key storage (0600 on unix)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Configuration file name.
const CONFIG_FILE: &str = "config.json";

/// Credentials file name.
const CREDENTIALS_FILE: &str = "credentials.json";

/// Get the config directory path.
fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("MKR_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }

    ProjectDirs::from("io", "mackerel", "mkr")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API endpoint URL, used when neither `--api-base` nor
    /// `MACKEREL_API_BASE` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl Config {
    /// Load config from disk, or return default.
    pub fn load() -> Result<Self> {
        Ok(read_json(&config_dir()?.join(CONFIG_FILE), "config")?.unwrap_or_default())
    }
}

/// Read a JSON file, treating a missing file as `None`.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {what} from {:?}", path)),
    };

    serde_json::from_str(&contents)
        .map(Some)
        .with_context(|| format!("Failed to parse {what} from {:?}", path))
}

/// Stored credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Mackerel API key.
    pub api_key: String,

    /// When the key was saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Credentials {
    /// Create new credentials.
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            saved_at: Some(chrono::Utc::now()),
        }
    }

    /// Load credentials from disk.
    pub fn load() -> Result<Option<Self>> {
        read_json(&config_dir()?.join(CREDENTIALS_FILE), "credentials")
    }

    /// Save credentials to disk.
    pub fn save(&self) -> Result<()> {
        let dir = config_dir()?;
        fs::create_dir_all(&dir)?;

        let path = dir.join(CREDENTIALS_FILE);
        let contents = serde_json::to_string_pretty(self)?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;

            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&path)?;
            file.write_all(contents.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&path, contents)
                .with_context(|| format!("Failed to write credentials to {:?}", path))?;
        }

        Ok(())
    }

    /// Delete credentials from disk.
    pub fn delete() -> Result<()> {
        let path = config_dir()?.join(CREDENTIALS_FILE);

        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete credentials at {:?}", path))?;
        }

        Ok(())
    }

    /// Key with all but the last four characters masked.
    pub fn masked_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        let visible = chars.len().saturating_sub(4);
        chars
            .iter()
            .enumerate()
            .map(|(i, c)| if i < visible { '*' } else { *c })
            .collect()
    }
}
