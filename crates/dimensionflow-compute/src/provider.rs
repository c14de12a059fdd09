//! Compute provider: owns the cloud client, settings, pollers and the
//! cancellation signal shared by every wait.
//!
//! The operations themselves live next to their concerns:
//! `allocate` in [`crate::allocate`], `find` / `get_instance_state` in
//! [`crate::inventory`] and `delete` in [`crate::teardown`].

use crate::error::{ComputeError, Result};
use crate::poller::ReadinessPoller;
use crate::settings::ComputeSettings;
use crate::template::ResourceTemplate;
use crate::validator::{TemplateValidator, check_prefix};
use dimensionflow_cloud::{CloudClient, Details};
use tokio_util::sync::CancellationToken;

pub struct ComputeProvider<C> {
    pub(crate) client: C,
    pub(crate) settings: ComputeSettings,
    pub(crate) readiness: ReadinessPoller,
    pub(crate) deletion: ReadinessPoller,
    pub(crate) cancel: CancellationToken,
}

impl<C: CloudClient> ComputeProvider<C> {
    /// Build without contacting the cloud
    pub fn new(client: C, settings: ComputeSettings) -> Self {
        let readiness = ReadinessPoller::new(settings.readiness_schedule(), settings.poll_timeout());
        let deletion = ReadinessPoller::new(settings.deletion_schedule(), settings.delete_timeout());

        Self {
            client,
            settings,
            readiness,
            deletion,
            cancel: CancellationToken::new(),
        }
    }

    /// Build and verify credentials and connectivity by listing one datacenter
    pub async fn connect(client: C, settings: ComputeSettings) -> Result<Self> {
        tracing::info!("Verifying cloud connectivity");

        let datacenters = client.list_datacenters(1).await.map_err(|e| {
            tracing::error!(kind = e.kind(), "Connectivity check failed: {}", e);
            ComputeError::from(e)
        })?;
        tracing::debug!("Connectivity verified ({} datacenter(s) visible)", datacenters.len());

        Ok(Self::new(client, settings))
    }

    /// Replace the cancellation token, e.g. with a child of an application-wide one
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn settings(&self) -> &ComputeSettings {
        &self.settings
    }

    /// Cancelling this token abandons every in-flight wait. Cloud-side requests
    /// already issued are not cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Full template validation, including datacenter and image lookups
    pub async fn validate_template(&self, template: &ResourceTemplate) -> Result<Details> {
        TemplateValidator::new(&self.client).validate(template).await
    }

    /// Guard in front of inventory and teardown queries
    pub(crate) fn is_prefix_valid(&self, template: &ResourceTemplate) -> bool {
        let conditions = check_prefix(template.instance_name_prefix.as_deref());
        if let Some(condition) = conditions.first() {
            tracing::info!(
                "Skipping cloud queries for template '{}': {}",
                template.name,
                condition.message
            );
            return false;
        }
        true
    }
}
