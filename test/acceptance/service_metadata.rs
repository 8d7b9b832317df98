//! Acceptance tests for the service metadata resource.
//!
//! Drives the full lifecycle (create, update, import, destroy) through the
//! provider against the in-process fake API. The same scenario runs against
//! the real Mackerel API when `MKR_ACC=1` and an API key are set.
//!
//! ## Running
//!
//! ```bash
//! cargo test -p mkr-acceptance --test service_metadata
//! MKR_ACC=1 MACKEREL_APIKEY=... cargo test -p mkr-acceptance --test service_metadata
//! ```

use mkr_id::{ServiceMetadataId, ServiceName};
use mkr_provider::{Action, Provider, ProviderConfig, ServiceConfig, ServiceMetadata};
use mkr_testing::FakeMackerel;
use rand::distr::{Alphanumeric, SampleString};

const INVALID_FORMAT_MESSAGE: &str = "the ID must be in the form '<service name>/<namespace>'";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn random_suffix() -> String {
    Alphanumeric
        .sample_string(&mut rand::rng(), 10)
        .to_ascii_lowercase()
}

fn metadata(service: &str, namespace: &str, json: &str) -> ServiceMetadata {
    ServiceMetadata::parse(service, namespace, json).expect("valid test metadata")
}

/// The real-backend run needs an explicit opt-in and credentials.
fn real_backend_config() -> Option<ProviderConfig> {
    if std::env::var("MKR_ACC").ok().as_deref() != Some("1") {
        return None;
    }
    let config = ProviderConfig::from_env();
    config.api_key.is_some().then_some(config)
}

/// Create, update, import and destroy one document under `service`.
/// Returns the ID it managed so callers can check remote state.
async fn run_scenario(provider: &Provider, service: &str, namespace: &str) -> ServiceMetadataId {
    let lifecycle = provider.lifecycle();
    let resource = provider.service_metadata();

    let v1 = metadata(service, namespace, r#"{"id":1}"#);
    let v2 = metadata(service, namespace, r#"{"id":2}"#);

    // Step 1: create.
    let applied = lifecycle.apply(None, Some(&v1)).await.unwrap();
    assert_eq!(applied.action, Action::Create);
    let id = v1.id();
    assert_eq!(id.to_string(), format!("{service}/{namespace}"));

    let read = resource.read(&id).await.unwrap().expect("metadata exists");
    assert_eq!(read.service.as_str(), service);
    assert_eq!(read.namespace.as_str(), namespace);
    assert_eq!(read.metadata_json.to_string(), r#"{"id":1}"#);

    // Step 2: update in place.
    let applied = lifecycle.apply(Some(&v1), Some(&v2)).await.unwrap();
    assert_eq!(applied.action, Action::Update);
    let read = resource.read(&id).await.unwrap().expect("metadata exists");
    assert_eq!(read.metadata_json.to_string(), r#"{"id":2}"#);

    // Re-applying the same document is a no-op.
    let applied = lifecycle.converge(Some(&v2), Some(&v2)).await.unwrap();
    assert_eq!(applied.action, Action::Noop);

    // Step 3: import by ID hydrates identical fields.
    let imported = resource.import(&format!("{service}/{namespace}")).await.unwrap();
    assert_eq!(imported, v2);
    assert_eq!(imported.id(), id);

    // Step 4: a malformed import ID is rejected before any request.
    let err = resource.import("invalid_format").await.unwrap_err();
    assert!(err.is_invalid_format());
    assert_eq!(err.to_string(), INVALID_FORMAT_MESSAGE);

    // Step 5: destroy.
    let applied = lifecycle.apply(Some(&v2), None).await.unwrap();
    assert_eq!(applied.action, Action::Delete);
    assert!(applied.state.is_none());

    // CheckDestroy: the document is gone and deleting again succeeds.
    assert!(resource.read(&id).await.unwrap().is_none());
    resource.delete(&id).await.unwrap();

    id
}

#[tokio::test]
async fn service_metadata_lifecycle_against_fake() {
    init_tracing();

    let fake = FakeMackerel::start().await.unwrap();
    let provider = Provider::from_config(&fake.provider_config()).unwrap();

    provider
        .service()
        .create(&ServiceConfig {
            name: ServiceName::parse("tf-abc").unwrap(),
            memo: String::new(),
        })
        .await
        .unwrap();
    assert!(fake.has_service("tf-abc"));

    let id = run_scenario(&provider, "tf-abc", "tf-namespace-abc").await;
    assert_eq!(id.to_string(), "tf-abc/tf-namespace-abc");
    assert!(fake.metadata("tf-abc", "tf-namespace-abc").is_none());

    provider.service().delete(id.service()).await.unwrap();
    assert!(!fake.has_service("tf-abc"));
}

#[tokio::test]
async fn create_stores_exact_document() {
    init_tracing();

    let fake = FakeMackerel::start().await.unwrap();
    fake.insert_service("tf-abc");
    let provider = Provider::from_config(&fake.provider_config()).unwrap();

    let desired = metadata("tf-abc", "tf-namespace-abc", r#"{"id":1,"tags":["a","b"]}"#);
    provider.service_metadata().create(&desired).await.unwrap();

    assert_eq!(
        fake.metadata("tf-abc", "tf-namespace-abc"),
        Some(serde_json::json!({"id": 1, "tags": ["a", "b"]}))
    );
}

#[tokio::test]
async fn out_of_band_delete_is_recreated() {
    init_tracing();

    let fake = FakeMackerel::start().await.unwrap();
    fake.insert_service("tf-abc");
    let provider = Provider::from_config(&fake.provider_config()).unwrap();
    let lifecycle = provider.lifecycle();

    let desired = metadata("tf-abc", "ns", r#"{"id":1}"#);
    lifecycle.apply(None, Some(&desired)).await.unwrap();
    fake.remove_metadata("tf-abc", "ns");

    let applied = lifecycle.converge(Some(&desired), Some(&desired)).await.unwrap();
    assert_eq!(applied.action, Action::Create);
    assert_eq!(fake.metadata("tf-abc", "ns"), Some(serde_json::json!({"id": 1})));
}

#[tokio::test]
async fn metadata_on_missing_service_fails() {
    init_tracing();

    let fake = FakeMackerel::start().await.unwrap();
    let provider = Provider::from_config(&fake.provider_config()).unwrap();

    let err = provider
        .service_metadata()
        .create(&metadata("absent", "ns", r#"{"id":1}"#))
        .await
        .unwrap_err();
    assert!(!err.is_not_found());
    match err {
        mkr_provider::ResourceError::RemoteApi(inner) => assert_eq!(inner.status(), Some(404)),
        other => panic!("expected a remote API error, got {other:?}"),
    }
}

#[tokio::test]
async fn wrong_api_key_is_rejected() {
    init_tracing();

    let fake = FakeMackerel::start().await.unwrap();
    fake.insert_service("tf-abc");
    let config = fake.provider_config().with_api_key("wrong-key");
    let provider = Provider::from_config(&config).unwrap();

    let err = provider
        .service_metadata()
        .create(&metadata("tf-abc", "ns", r#"{"id":1}"#))
        .await
        .unwrap_err();
    match err {
        mkr_provider::ResourceError::RemoteApi(inner) => assert_eq!(inner.status(), Some(403)),
        other => panic!("expected a remote API error, got {other:?}"),
    }
    assert_eq!(fake.request_count(), 0);
}

#[tokio::test]
async fn service_metadata_lifecycle_against_mackerel() {
    let Some(config) = real_backend_config() else {
        eprintln!("skipping: set MKR_ACC=1 and MACKEREL_APIKEY to run against Mackerel");
        return;
    };
    init_tracing();

    let provider = Provider::from_config(&config).unwrap();
    let suffix = random_suffix();
    let service = format!("tf-service-{suffix}");
    let namespace = format!("tf-namespace-{suffix}");

    let service_config = ServiceConfig {
        name: ServiceName::parse(&service).unwrap(),
        memo: "created by mkr acceptance tests".to_string(),
    };
    provider.service().create(&service_config).await.unwrap();

    let outcome = tokio::spawn({
        let provider = provider.clone();
        let service = service.clone();
        async move { run_scenario(&provider, &service, &namespace).await }
    })
    .await;

    // Clean up the service even if the scenario panicked.
    provider.service().delete(&service_config.name).await.unwrap();

    let id = outcome.unwrap();
    assert!(provider.service_metadata().read(&id).await.unwrap().is_none());
}
