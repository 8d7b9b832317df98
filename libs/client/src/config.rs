//! Client configuration.

use std::time::Duration;

use reqwest::Url;

use crate::error::ClientError;

/// Default Mackerel API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.mackerelio.com/";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings needed to construct an [`crate::ApiClient`].
#[derive(Clone)]
pub struct ClientConfig {
    /// API key sent in the `X-Api-Key` header.
    pub api_key: String,

    /// Base URL of the API (without the `/api/v0` prefix).
    pub api_base: Url,

    /// Per-request timeout enforced by the transport.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a config for the given key and base URL.
    pub fn new(api_key: impl Into<String>, api_base: &str) -> Result<Self, ClientError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ClientError::InvalidConfig("API key cannot be empty".to_string()));
        }

        let api_base = Url::parse(api_base).map_err(|e| {
            ClientError::InvalidConfig(format!("invalid API base URL '{api_base}': {e}"))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(ClientError::InvalidConfig(format!(
                "API base URL '{api_base}' cannot carry a path"
            )));
        }

        Ok(Self {
            api_key,
            api_base,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_rejects_empty_key() {
        let err = ClientConfig::new("  ", DEFAULT_API_BASE).unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_rejects_bad_url() {
        assert!(ClientConfig::new("key", "not a url").is_err());
        assert!(ClientConfig::new("key", "mailto:ops@example.com").is_err());
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let config = ClientConfig::new("secret-key", DEFAULT_API_BASE).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }
}
