//! In-process fake of the Mackerel service and metadata API.
//!
//! [`FakeMackerel::start`] binds an axum server to an ephemeral local port.
//! State lives in memory and is inspectable from the test, which makes it a
//! drop-in target for acceptance tests that would otherwise need a real
//! organization and API key.
//!
//! Behaviour mirrors the hosted API where the lifecycle depends on it:
//!
//! - every request must carry the configured `X-Api-Key` (403 otherwise)
//! - writing metadata under an unknown service returns 404 `Service not found`
//! - reading or deleting an absent document returns 404 `Metadata not found`
//! - deleting a service deletes the metadata under it

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use mkr_provider::ProviderConfig;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

/// API key accepted by [`FakeMackerel::start`].
pub const FAKE_API_KEY: &str = "fake-api-key";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServiceRecord {
    name: String,
    #[serde(default)]
    memo: String,
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Default)]
struct Store {
    services: BTreeMap<String, ServiceRecord>,
    metadata: BTreeMap<(String, String), serde_json::Value>,
}

#[derive(Clone)]
struct FakeState {
    api_key: Arc<str>,
    store: Arc<RwLock<Store>>,
    requests: Arc<AtomicUsize>,
}

impl FakeState {
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// A running fake API server. Shuts down when dropped.
pub struct FakeMackerel {
    addr: SocketAddr,
    state: FakeState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl FakeMackerel {
    /// Start a server that accepts [`FAKE_API_KEY`].
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with_key(FAKE_API_KEY).await
    }

    /// Start a server that accepts the given API key.
    pub async fn start_with_key(api_key: &str) -> std::io::Result<Self> {
        let state = FakeState {
            api_key: Arc::from(api_key),
            store: Arc::new(RwLock::new(Store::default())),
            requests: Arc::new(AtomicUsize::new(0)),
        };

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let router = router(state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::error!(error = %e, "fake mackerel server failed");
            }
        });

        tracing::debug!(%addr, "fake mackerel server listening");

        Ok(Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Base URL to use as `MACKEREL_API_BASE`.
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn api_key(&self) -> &str {
        &self.state.api_key
    }

    /// Provider settings pointing at this server.
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::default()
            .with_api_key(self.api_key())
            .with_api_base(self.base_url())
    }

    /// Seed a service directly, bypassing the API.
    pub fn insert_service(&self, name: &str) {
        self.state.write().services.insert(
            name.to_string(),
            ServiceRecord {
                name: name.to_string(),
                memo: String::new(),
                roles: Vec::new(),
            },
        );
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.state.read().services.contains_key(name)
    }

    /// The stored document, if any.
    pub fn metadata(&self, service: &str, namespace: &str) -> Option<serde_json::Value> {
        self.state
            .read()
            .metadata
            .get(&(service.to_string(), namespace.to_string()))
            .cloned()
    }

    /// Overwrite a document directly, bypassing the API.
    pub fn set_metadata(&self, service: &str, namespace: &str, value: serde_json::Value) {
        self.state
            .write()
            .metadata
            .insert((service.to_string(), namespace.to_string()), value);
    }

    /// Delete a document directly, simulating an out-of-band change.
    pub fn remove_metadata(&self, service: &str, namespace: &str) {
        self.state
            .write()
            .metadata
            .remove(&(service.to_string(), namespace.to_string()));
    }

    /// Number of requests that passed authentication.
    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }
}

impl Drop for FakeMackerel {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

// =============================================================================
// Routing
// =============================================================================

fn router(state: FakeState) -> Router {
    Router::new()
        .route("/api/v0/services", get(list_services).post(create_service))
        .route("/api/v0/services/{service}", delete(delete_service))
        .route("/api/v0/services/{service}/metadata", get(list_metadata))
        .route(
            "/api/v0/services/{service}/metadata/{namespace}",
            get(get_metadata).put(put_metadata).delete(delete_metadata),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

struct FakeError {
    status: StatusCode,
    message: &'static str,
}

impl FakeError {
    fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }
}

impl IntoResponse for FakeError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": { "message": self.message } });
        (self.status, Json(body)).into_response()
    }
}

/// Proof that the request carried the configured `X-Api-Key`.
struct Authenticated;

impl FromRequestParts<FakeState> for Authenticated {
    type Rejection = FakeError;

    async fn from_request_parts(parts: &mut Parts, state: &FakeState) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok());
        if provided != Some(&*state.api_key) {
            return Err(FakeError::new(StatusCode::FORBIDDEN, "Authentication failed"));
        }

        state.requests.fetch_add(1, Ordering::SeqCst);
        Ok(Self)
    }
}

// =============================================================================
// Services
// =============================================================================

async fn list_services(_: Authenticated, State(state): State<FakeState>) -> impl IntoResponse {
    let services: Vec<ServiceRecord> = state.read().services.values().cloned().collect();
    Json(serde_json::json!({ "services": services }))
}

#[derive(Debug, Deserialize)]
struct CreateServiceBody {
    name: String,
    #[serde(default)]
    memo: String,
}

async fn create_service(
    _: Authenticated,
    State(state): State<FakeState>,
    Json(body): Json<CreateServiceBody>,
) -> Result<Json<ServiceRecord>, FakeError> {
    if body.name.is_empty() {
        return Err(FakeError::new(StatusCode::BAD_REQUEST, "Invalid service name"));
    }

    let mut store = state.write();
    if store.services.contains_key(&body.name) {
        return Err(FakeError::new(
            StatusCode::BAD_REQUEST,
            "Service name is already used",
        ));
    }

    let record = ServiceRecord {
        name: body.name,
        memo: body.memo,
        roles: Vec::new(),
    };
    store.services.insert(record.name.clone(), record.clone());
    Ok(Json(record))
}

async fn delete_service(
    _: Authenticated,
    State(state): State<FakeState>,
    Path(service): Path<String>,
) -> Result<Json<ServiceRecord>, FakeError> {
    let mut store = state.write();
    let record = store
        .services
        .remove(&service)
        .ok_or_else(|| FakeError::new(StatusCode::NOT_FOUND, "Service not found"))?;
    store.metadata.retain(|(s, _), _| s != &service);
    Ok(Json(record))
}

// =============================================================================
// Metadata
// =============================================================================

async fn list_metadata(
    _: Authenticated,
    State(state): State<FakeState>,
    Path(service): Path<String>,
) -> Result<impl IntoResponse, FakeError> {
    let store = state.read();
    if !store.services.contains_key(&service) {
        return Err(FakeError::new(StatusCode::NOT_FOUND, "Service not found"));
    }

    let metadata: Vec<serde_json::Value> = store
        .metadata
        .keys()
        .filter(|(s, _)| s == &service)
        .map(|(_, namespace)| serde_json::json!({ "namespace": namespace }))
        .collect();
    Ok(Json(serde_json::json!({ "metadata": metadata })))
}

async fn get_metadata(
    _: Authenticated,
    State(state): State<FakeState>,
    Path((service, namespace)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, FakeError> {
    state
        .read()
        .metadata
        .get(&(service, namespace))
        .cloned()
        .map(Json)
        .ok_or_else(|| FakeError::new(StatusCode::NOT_FOUND, "Metadata not found"))
}

async fn put_metadata(
    _: Authenticated,
    State(state): State<FakeState>,
    Path((service, namespace)): Path<(String, String)>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, FakeError> {
    let mut store = state.write();
    if !store.services.contains_key(&service) {
        return Err(FakeError::new(StatusCode::NOT_FOUND, "Service not found"));
    }

    store.metadata.insert((service, namespace), body);
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn delete_metadata(
    _: Authenticated,
    State(state): State<FakeState>,
    Path((service, namespace)): Path<(String, String)>,
) -> Result<impl IntoResponse, FakeError> {
    state
        .write()
        .metadata
        .remove(&(service, namespace))
        .map(|_| Json(serde_json::json!({ "success": true })))
        .ok_or_else(|| FakeError::new(StatusCode::NOT_FOUND, "Metadata not found"))
}
