//! HTTP client for API communication.

use async_trait::async_trait;
use mkr_id::{Namespace, ServiceName};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, Url};
use serde::{de::DeserializeOwned, Serialize};

use crate::api::{MetadataApi, ServiceApi};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{
    ApiErrorResponse, CreateServiceRequest, ListMetadataResponse, ListServicesResponse, Service,
    SuccessResponse,
};

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

const API_PREFIX: [&str; 2] = ["api", "v0"];

/// API client for the Mackerel REST API.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client from config.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("mkr-provider/", env!("CARGO_PKG_VERSION"))),
        );

        let mut api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| ClientError::InvalidConfig("Invalid API key format".to_string()))?;
        api_key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base.clone(),
        })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL under `/api/v0`, percent-encoding each segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // ClientConfig rejects cannot-be-a-base URLs, so segments are always available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(API_PREFIX).extend(segments);
        }
        url
    }

    fn metadata_url(&self, service: &ServiceName, namespace: &Namespace) -> Url {
        self.url(&[
            "services",
            service.as_str(),
            "metadata",
            namespace.as_str(),
        ])
    }

    /// Send a request with an optional JSON body and decode the response.
    async fn send<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        tracing::debug!(method = %method, url = %url, "mackerel request");

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        self.handle_response(&method, &url, response).await
    }

    /// Handle a successful or error response.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        method: &Method,
        url: &Url,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            tracing::debug!(method = %method, url = %url, status = status.as_u16(), "mackerel response");
            return Ok(serde_json::from_slice(&bytes)?);
        }

        // Try to parse error response
        let message = serde_json::from_slice::<ApiErrorResponse>(&bytes)
            .map(|body| body.error.into_message())
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        tracing::debug!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            message = %message,
            "mackerel error response"
        );

        Err(ClientError::api(status.as_u16(), message))
    }
}

#[async_trait]
impl MetadataApi for ApiClient {
    async fn get_service_metadata(
        &self,
        service: &ServiceName,
        namespace: &Namespace,
    ) -> Result<serde_json::Value, ClientError> {
        self.send::<_, ()>(Method::GET, self.metadata_url(service, namespace), None)
            .await
    }

    async fn put_service_metadata(
        &self,
        service: &ServiceName,
        namespace: &Namespace,
        metadata: &serde_json::Value,
    ) -> Result<(), ClientError> {
        let _: SuccessResponse = self
            .send(
                Method::PUT,
                self.metadata_url(service, namespace),
                Some(metadata),
            )
            .await?;
        Ok(())
    }

    async fn delete_service_metadata(
        &self,
        service: &ServiceName,
        namespace: &Namespace,
    ) -> Result<(), ClientError> {
        let _: SuccessResponse = self
            .send::<_, ()>(Method::DELETE, self.metadata_url(service, namespace), None)
            .await?;
        Ok(())
    }

    async fn list_service_metadata_namespaces(
        &self,
        service: &ServiceName,
    ) -> Result<Vec<Namespace>, ClientError> {
        let url = self.url(&["services", service.as_str(), "metadata"]);
        let response: ListMetadataResponse = self.send::<_, ()>(Method::GET, url, None).await?;
        Ok(response
            .metadata
            .into_iter()
            .map(|entry| entry.namespace)
            .collect())
    }
}

#[async_trait]
impl ServiceApi for ApiClient {
    async fn list_services(&self) -> Result<Vec<Service>, ClientError> {
        let response: ListServicesResponse = self
            .send::<_, ()>(Method::GET, self.url(&["services"]), None)
            .await?;
        Ok(response.services)
    }

    async fn create_service(&self, request: &CreateServiceRequest) -> Result<Service, ClientError> {
        self.send(Method::POST, self.url(&["services"]), Some(request))
            .await
    }

    async fn delete_service(&self, name: &ServiceName) -> Result<Service, ClientError> {
        self.send::<_, ()>(Method::DELETE, self.url(&["services", name.as_str()]), None)
            .await
    }
}
