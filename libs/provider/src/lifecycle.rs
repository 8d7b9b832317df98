//! Lifecycle driver for service metadata.
//!
//! Moves one tracked address from its prior state to its desired state:
//! refresh, plan, then execute the planned action. The driver holds no state
//! of its own; callers drive distinct addresses concurrently.

use mkr_client::MetadataApi;
use mkr_reconcile::{plan, Action};
use serde::Serialize;

use crate::error::ResourceError;
use crate::service_metadata::{ServiceMetadata, ServiceMetadataResource};

/// Result of applying one address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Applied {
    pub action: Action,
    /// State to record after the action; `None` means stop tracking.
    pub state: Option<ServiceMetadata>,
}

#[derive(Debug, Clone)]
pub struct Lifecycle<C> {
    resource: ServiceMetadataResource<C>,
}

impl<C: MetadataApi> Lifecycle<C> {
    pub fn new(resource: ServiceMetadataResource<C>) -> Self {
        Self { resource }
    }

    pub fn resource(&self) -> &ServiceMetadataResource<C> {
        &self.resource
    }

    /// Re-read the recorded entity. Returns `None` if it was deleted out of band.
    pub async fn refresh(
        &self,
        prior: Option<&ServiceMetadata>,
    ) -> Result<Option<ServiceMetadata>, ResourceError> {
        match prior {
            Some(prior) => self.resource.read(&prior.id()).await,
            None => Ok(None),
        }
    }

    /// Decide what [`Lifecycle::apply`] would do.
    pub fn plan(&self, prior: Option<&ServiceMetadata>, desired: Option<&ServiceMetadata>) -> Action {
        plan(prior, desired)
    }

    /// Execute the planned action for one address.
    ///
    /// A key change is carried out as delete-then-create, never as an update.
    pub async fn apply(
        &self,
        prior: Option<&ServiceMetadata>,
        desired: Option<&ServiceMetadata>,
    ) -> Result<Applied, ResourceError> {
        let action = plan(prior, desired);

        let state = match (prior, desired) {
            (None, None) => None,
            (Some(prior), None) => {
                self.resource.delete(&prior.id()).await?;
                None
            }
            (None, Some(desired)) => {
                self.resource.create(desired).await?;
                Some(desired.clone())
            }
            (Some(prior), Some(desired)) => match action {
                Action::Replace => {
                    tracing::info!(from = %prior.id(), to = %desired.id(), "replacing service metadata");
                    self.resource.delete(&prior.id()).await?;
                    self.resource.create(desired).await?;
                    Some(desired.clone())
                }
                Action::Update => {
                    self.resource.update(prior, desired).await?;
                    Some(desired.clone())
                }
                _ => Some(prior.clone()),
            },
        };

        Ok(Applied { action, state })
    }

    /// Refresh, then apply.
    pub async fn converge(
        &self,
        prior: Option<&ServiceMetadata>,
        desired: Option<&ServiceMetadata>,
    ) -> Result<Applied, ResourceError> {
        let refreshed = self.refresh(prior).await?;
        self.apply(refreshed.as_ref(), desired).await
    }
}
