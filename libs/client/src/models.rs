//! Wire types for the Mackerel API.

use mkr_id::{Namespace, ServiceName};
use serde::{Deserialize, Serialize};

/// A Mackerel service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: ServiceName,

    #[serde(default)]
    pub memo: String,

    #[serde(default)]
    pub roles: Vec<String>,
}

/// Request body for `POST /api/v0/services`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateServiceRequest {
    pub name: ServiceName,
    pub memo: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListServicesResponse {
    pub services: Vec<Service>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListMetadataResponse {
    pub metadata: Vec<MetadataNamespace>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MetadataNamespace {
    pub namespace: Namespace,
}

/// Any JSON object. Write endpoints answer with `{"success":true}` or with
/// the affected entity; only the status code is meaningful.
#[derive(Debug, Deserialize)]
pub(crate) struct SuccessResponse {}

/// Error body. Mackerel uses both `{"error":{"message":..}}` and `{"error":".."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ApiErrorBody {
    Detailed { message: String },
    Plain(String),
}

impl ApiErrorBody {
    pub fn into_message(self) -> String {
        match self {
            Self::Detailed { message } | Self::Plain(message) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_shapes() {
        let detailed: ApiErrorResponse =
            serde_json::from_str(r#"{"error":{"message":"Service not found"}}"#).unwrap();
        assert_eq!(detailed.error.into_message(), "Service not found");

        let plain: ApiErrorResponse = serde_json::from_str(r#"{"error":"Forbidden"}"#).unwrap();
        assert_eq!(plain.error.into_message(), "Forbidden");
    }

    #[test]
    fn test_success_response_accepts_any_object() {
        assert!(serde_json::from_str::<SuccessResponse>(r#"{"success":true}"#).is_ok());
        assert!(serde_json::from_str::<SuccessResponse>(r#"{"name":"tf-abc","roles":[]}"#).is_ok());
        assert!(serde_json::from_str::<SuccessResponse>("[]").is_err());
    }

    #[test]
    fn test_service_defaults() {
        let service: Service = serde_json::from_str(r#"{"name":"tf-abc"}"#).unwrap();
        assert_eq!(service.name.as_str(), "tf-abc");
        assert!(service.memo.is_empty());
        assert!(service.roles.is_empty());
    }
}
