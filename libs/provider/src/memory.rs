//! In-memory API double for unit tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mkr_client::{ClientError, CreateServiceRequest, MetadataApi, Service, ServiceApi};
use mkr_id::{Namespace, ServiceName};

#[derive(Default)]
pub struct MemoryApi {
    services: Mutex<BTreeMap<String, String>>,
    metadata: Mutex<BTreeMap<(String, String), serde_json::Value>>,
    failure: Mutex<Option<(u16, String)>>,
    writes: AtomicUsize,
}

impl MemoryApi {
    pub fn with_services<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let api = Self::default();
        {
            let mut services = api.services.lock().unwrap();
            for name in names {
                services.insert(name.to_string(), String::new());
            }
        }
        api
    }

    /// Make the next call fail with the given status.
    pub fn fail_next(&self, status: u16, message: &str) {
        *self.failure.lock().unwrap() = Some((status, message.to_string()));
    }

    pub fn insert_raw(&self, service: &str, namespace: &str, value: serde_json::Value) {
        self.metadata
            .lock()
            .unwrap()
            .insert((service.to_string(), namespace.to_string()), value);
    }

    /// Number of mutating calls received.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn contains(&self, service: &str, namespace: &str) -> bool {
        self.metadata
            .lock()
            .unwrap()
            .contains_key(&(service.to_string(), namespace.to_string()))
    }

    fn injected_failure(&self) -> Result<(), ClientError> {
        match self.failure.lock().unwrap().take() {
            Some((status, message)) => Err(ClientError::api(status, message)),
            None => Ok(()),
        }
    }

    fn key(service: &ServiceName, namespace: &Namespace) -> (String, String) {
        (service.to_string(), namespace.to_string())
    }
}

#[async_trait]
impl MetadataApi for MemoryApi {
    async fn get_service_metadata(
        &self,
        service: &ServiceName,
        namespace: &Namespace,
    ) -> Result<serde_json::Value, ClientError> {
        self.injected_failure()?;
        self.metadata
            .lock()
            .unwrap()
            .get(&Self::key(service, namespace))
            .cloned()
            .ok_or_else(|| ClientError::api(404, "Metadata not found"))
    }

    async fn put_service_metadata(
        &self,
        service: &ServiceName,
        namespace: &Namespace,
        metadata: &serde_json::Value,
    ) -> Result<(), ClientError> {
        self.injected_failure()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        if !self.services.lock().unwrap().contains_key(service.as_str()) {
            return Err(ClientError::api(404, "Service not found"));
        }
        self.metadata
            .lock()
            .unwrap()
            .insert(Self::key(service, namespace), metadata.clone());
        Ok(())
    }

    async fn delete_service_metadata(
        &self,
        service: &ServiceName,
        namespace: &Namespace,
    ) -> Result<(), ClientError> {
        self.injected_failure()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.metadata
            .lock()
            .unwrap()
            .remove(&Self::key(service, namespace))
            .map(|_| ())
            .ok_or_else(|| ClientError::api(404, "Metadata not found"))
    }

    async fn list_service_metadata_namespaces(
        &self,
        service: &ServiceName,
    ) -> Result<Vec<Namespace>, ClientError> {
        self.injected_failure()?;
        let namespaces: BTreeSet<String> = self
            .metadata
            .lock()
            .unwrap()
            .keys()
            .filter(|(s, _)| s == service.as_str())
            .map(|(_, ns)| ns.clone())
            .collect();
        Ok(namespaces
            .into_iter()
            .rev()
            .map(|ns| Namespace::parse(&ns).unwrap())
            .collect())
    }
}

#[async_trait]
impl ServiceApi for MemoryApi {
    async fn list_services(&self) -> Result<Vec<Service>, ClientError> {
        self.injected_failure()?;
        Ok(self
            .services
            .lock()
            .unwrap()
            .iter()
            .map(|(name, memo)| Service {
                name: ServiceName::parse(name).unwrap(),
                memo: memo.clone(),
                roles: Vec::new(),
            })
            .collect())
    }

    async fn create_service(&self, request: &CreateServiceRequest) -> Result<Service, ClientError> {
        self.injected_failure()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut services = self.services.lock().unwrap();
        if services.contains_key(request.name.as_str()) {
            return Err(ClientError::api(400, "Service name is already used"));
        }
        services.insert(request.name.to_string(), request.memo.clone());
        Ok(Service {
            name: request.name.clone(),
            memo: request.memo.clone(),
            roles: Vec::new(),
        })
    }

    async fn delete_service(&self, name: &ServiceName) -> Result<Service, ClientError> {
        self.injected_failure()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let memo = self
            .services
            .lock()
            .unwrap()
            .remove(name.as_str())
            .ok_or_else(|| ClientError::api(404, "Service not found"))?;
        self.metadata
            .lock()
            .unwrap()
            .retain(|(service, _), _| service != name.as_str());
        Ok(Service {
            name: name.clone(),
            memo,
            roles: Vec::new(),
        })
    }
}
