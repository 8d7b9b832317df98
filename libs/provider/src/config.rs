//! Provider configuration and the shared client handle.
//!
//! Handles:
//! - API key resolution (`MACKEREL_APIKEY`, then `MACKEREL_API_KEY`)
//! - API endpoint override (`MACKEREL_API_BASE`)
//! - Per-request timeout

use std::time::Duration;

use mkr_client::{ApiClient, ClientConfig, DEFAULT_API_BASE, DEFAULT_TIMEOUT};

use crate::error::ResourceError;
use crate::lifecycle::Lifecycle;
use crate::service::ServiceResource;
use crate::service_metadata::{ServiceMetadataDataSource, ServiceMetadataResource};

const API_KEY_VARS: [&str; 2] = ["MACKEREL_APIKEY", "MACKEREL_API_KEY"];
const API_BASE_VAR: &str = "MACKEREL_API_BASE";

/// Provider settings.
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProviderConfig {
    /// Load settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = API_KEY_VARS.iter().find_map(|key| non_empty(*key));
        let api_base = non_empty(API_BASE_VAR).unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            api_key,
            api_base,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate and convert into client settings.
    pub fn client_config(&self) -> Result<ClientConfig, ResourceError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ResourceError::Config(format!(
                "no API key configured; set {} or {}",
                API_KEY_VARS[0], API_KEY_VARS[1]
            ))
        })?;

        let config = ClientConfig::new(api_key, &self.api_base)
            .map_err(|e| ResourceError::Config(e.to_string()))?;
        Ok(config.with_timeout(self.timeout))
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Owner of the shared API client.
///
/// Resources receive clones of the client; nothing here is global.
#[derive(Debug, Clone)]
pub struct Provider {
    client: ApiClient,
}

impl Provider {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ResourceError> {
        let client = ApiClient::new(&config.client_config()?)?;
        tracing::debug!(api_base = %client.base_url(), "provider configured");
        Ok(Self { client })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn service_metadata(&self) -> ServiceMetadataResource<ApiClient> {
        ServiceMetadataResource::new(self.client.clone())
    }

    pub fn service_metadata_data_source(&self) -> ServiceMetadataDataSource<ApiClient> {
        ServiceMetadataDataSource::new(self.client.clone())
    }

    pub fn service(&self) -> ServiceResource<ApiClient> {
        ServiceResource::new(self.client.clone())
    }

    pub fn lifecycle(&self) -> Lifecycle<ApiClient> {
        Lifecycle::new(self.service_metadata())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = ProviderConfig::from_lookup(lookup(&[]));
        assert!(config.api_key.is_none());
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(matches!(
            config.client_config().unwrap_err(),
            ResourceError::Config(_)
        ));
    }

    #[test]
    fn test_config_key_precedence() {
        let config = ProviderConfig::from_lookup(lookup(&[
            ("MACKEREL_APIKEY", "primary"),
            ("MACKEREL_API_KEY", "fallback"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("primary"));

        let config = ProviderConfig::from_lookup(lookup(&[
            ("MACKEREL_APIKEY", ""),
            ("MACKEREL_API_KEY", "fallback"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("fallback"));
    }

    #[test]
    fn test_config_api_base_override() {
        let config = ProviderConfig::from_lookup(lookup(&[
            ("MACKEREL_API_KEY", "key"),
            ("MACKEREL_API_BASE", "http://127.0.0.1:9999/"),
        ]));
        let client = config.client_config().unwrap();
        assert_eq!(client.api_base.as_str(), "http://127.0.0.1:9999/");
    }

    #[test]
    fn test_provider_from_config() {
        let config = ProviderConfig::default()
            .with_api_key("key")
            .with_timeout(Duration::from_secs(5));
        let provider = Provider::from_config(&config).unwrap();
        assert_eq!(provider.client().base_url().as_str(), DEFAULT_API_BASE);

        let err = Provider::from_config(&ProviderConfig::default().with_api_key("key").with_api_base("::"))
            .unwrap_err();
        assert!(matches!(err, ResourceError::Config(_)));
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let config = ProviderConfig::default().with_api_key("secret");
        assert!(!format!("{config:?}").contains("secret"));
    }
}
