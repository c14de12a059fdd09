//! Provisioning: network domain, then VLAN, then servers
//!
//! ```text
//! create network domain ──▶ await NORMAL
//!                              │
//!                 create VLAN ──▶ await NORMAL
//!                                   │
//!          ┌──────────┬─────────────┴──────────┐
//!   create server  create server   ...   create server     (bounded, caller order)
//!   await RUNNING  await RUNNING         await RUNNING
//!          └──────────┴─────────────┬──────────┘
//!                                   ▼
//!                       running >= minCount ?
//!                        yes: Allocation    no: tear down servers, fail
//! ```

use crate::error::{ComputeError, Result};
use crate::poller::{Readiness, ReadyWhen};
use crate::provider::ComputeProvider;
use crate::template::{ProvisioningRequest, ResourceTemplate, keys};
use crate::validator::check_template;
use dimensionflow_cloud::{
    CloudClient, CloudError, ConditionAccumulator, Details, InstanceStatus, NetworkDomainSpec,
    ProvisionedResourceHandle, ResourceType, STATE_NORMAL, ServerSpec, VlanSpec,
};
use futures_util::stream::{self, StreamExt};

pub const ALLOCATION_FAILED_MSG: &str = "Problem allocating instances.";

/// A server that reached the running state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedServer {
    pub instance_id: String,
    pub handle: ProvisionedResourceHandle,
}

/// Successful allocation.
///
/// Ids in `failed` did not come up but the batch still met `minCount`; they are
/// neither retried nor rolled back, and `warnings` carries one condition per id.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub network_domain: ProvisionedResourceHandle,
    pub vlan: ProvisionedResourceHandle,
    pub servers: Vec<AllocatedServer>,
    pub failed: Vec<String>,
    pub warnings: Details,
}

impl Allocation {
    /// Every requested instance is running
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn instance_ids(&self) -> impl Iterator<Item = &str> {
        self.servers.iter().map(|s| s.instance_id.as_str())
    }
}

/// Result of one create-and-wait worker
#[derive(Debug)]
enum ServerOutcome {
    Running(ProvisionedResourceHandle),
    Failed {
        handle: Option<ProvisionedResourceHandle>,
        reason: String,
    },
    /// Cancelled during the wait, or before the create was issued
    Cancelled(Option<ProvisionedResourceHandle>),
}

impl<C: CloudClient> ComputeProvider<C> {
    /// Provision the network domain, VLAN and one server per requested id.
    ///
    /// Fewer than `min_count` running servers rolls back every server created by
    /// this call. The network domain and VLAN are never torn down; their handles
    /// are reported in the failure conditions.
    pub async fn allocate(&self, request: ProvisioningRequest) -> Result<Allocation> {
        let ProvisioningRequest {
            template,
            instance_ids,
            min_count,
        } = request;

        let mut preflight = ConditionAccumulator::new();
        preflight.merge(check_template(&template));
        if min_count > instance_ids.len() {
            preflight.add_error(
                Some(keys::MIN_COUNT),
                format!(
                    "minCount '{}' exceeds the number of requested instances '{}'.",
                    min_count,
                    instance_ids.len()
                ),
            );
        }
        if preflight.has_error() {
            return Err(ComputeError::InvalidConfiguration {
                details: preflight.into_details(),
            });
        }

        tracing::info!(
            "Allocating {} instance(s) for template '{}' (minCount {})",
            instance_ids.len(),
            template.name,
            min_count
        );
        let mut accumulator = ConditionAccumulator::new();

        let network_domain = self
            .create_network_domain(&template)
            .await
            .map_err(|e| creation_failed(e, Some(keys::NETWORK_NAME), "network domain", &[]))?;
        let issued = [network_domain.clone()];
        let readiness = self
            .await_normal(ResourceType::NetworkDomain, &network_domain)
            .await
            .map_err(|e| e.with_issued(&issued))?;
        if !readiness.is_ready() {
            readiness.record(&mut accumulator, Some(keys::NETWORK_NAME), "network domain");
            report_unreclaimed(&mut accumulator, &issued);
            return Err(ComputeError::unrecoverable(ALLOCATION_FAILED_MSG, accumulator));
        }

        let vlan = self
            .create_vlan(&template, &network_domain)
            .await
            .map_err(|e| creation_failed(e, Some(keys::BASE_IPV4), "VLAN", &issued))?;
        let issued = [network_domain.clone(), vlan.clone()];
        let readiness = self
            .await_normal(ResourceType::Vlan, &vlan)
            .await
            .map_err(|e| e.with_issued(&issued))?;
        if !readiness.is_ready() {
            readiness.record(&mut accumulator, Some(keys::BASE_IPV4), "VLAN");
            report_unreclaimed(&mut accumulator, &issued);
            return Err(ComputeError::unrecoverable(ALLOCATION_FAILED_MSG, accumulator));
        }

        if template.ssh_credentials().is_none() {
            tracing::info!(
                "No SSH credentials configured for template '{}'; servers get no SSH bootstrap",
                template.name
            );
        }

        let concurrency = self.settings.server_concurrency.max(1);
        let outcomes: Vec<(String, ServerOutcome)> = stream::iter(instance_ids.iter().cloned())
            .map(|instance_id| {
                let spec = self.server_spec(&template, &instance_id, &network_domain, &vlan);
                async move {
                    let outcome = self.provision_server(&spec).await;
                    (instance_id, outcome)
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut servers = Vec::new();
        let mut failures = Vec::new();
        let mut created = Vec::new();
        let mut cancelled = false;

        for (instance_id, outcome) in outcomes {
            match outcome {
                ServerOutcome::Running(handle) => {
                    created.push(handle.clone());
                    servers.push(AllocatedServer {
                        instance_id,
                        handle,
                    });
                }
                ServerOutcome::Failed { handle, reason } => {
                    tracing::warn!("Instance '{}' failed: {}", instance_id, reason);
                    created.extend(handle);
                    failures.push((instance_id, reason));
                }
                ServerOutcome::Cancelled(handle) => {
                    created.extend(handle);
                    cancelled = true;
                }
            }
        }

        if cancelled {
            let mut handles = issued.to_vec();
            handles.extend(created);
            return Err(ComputeError::Cancelled {
                resource: "server readiness".to_string(),
                issued: handles,
            });
        }

        if servers.len() < min_count {
            tracing::warn!(
                "Only {} of {} instance(s) running, below minCount {}; rolling back {} server(s)",
                servers.len(),
                instance_ids.len(),
                min_count,
                created.len()
            );

            for (instance_id, reason) in &failures {
                accumulator.add_error(Some(instance_id.as_str()), reason.clone());
            }
            self.tear_down(&created, &mut accumulator)
                .await
                .map_err(|e| e.with_issued(&issued))?;
            accumulator.add_error(
                None,
                format!(
                    "Provisioned {} instances out of {}. minCount is {}.",
                    servers.len(),
                    instance_ids.len(),
                    min_count
                ),
            );
            report_unreclaimed(&mut accumulator, &issued);
            return Err(ComputeError::unrecoverable(ALLOCATION_FAILED_MSG, accumulator));
        }

        let mut warnings = ConditionAccumulator::new();
        for (instance_id, reason) in &failures {
            warnings.add_warning(Some(instance_id.as_str()), reason.clone());
        }

        tracing::info!(
            "Allocated {} of {} instance(s) for template '{}'",
            servers.len(),
            instance_ids.len(),
            template.name
        );

        Ok(Allocation {
            network_domain,
            vlan,
            servers,
            failed: failures.into_iter().map(|(id, _)| id).collect(),
            warnings: warnings.into_details(),
        })
    }

    async fn create_network_domain(
        &self,
        template: &ResourceTemplate,
    ) -> dimensionflow_cloud::Result<ProvisionedResourceHandle> {
        let spec = NetworkDomainSpec {
            datacenter_id: template.datacenter.clone(),
            name: template.network_name.clone(),
            description: format!("Network domain for template '{}'", template.name),
            domain_type: template.network_domain_type.clone(),
        };

        tracing::info!(
            "Creating network domain '{}' in datacenter '{}'",
            spec.name,
            spec.datacenter_id
        );
        self.client.create_network_domain(&spec).await
    }

    async fn create_vlan(
        &self,
        template: &ResourceTemplate,
        network_domain: &ProvisionedResourceHandle,
    ) -> dimensionflow_cloud::Result<ProvisionedResourceHandle> {
        let spec = VlanSpec {
            network_domain_id: network_domain.resource_id.clone(),
            name: template.vlan_name(),
            private_ipv4_base_address: template.base_ipv4.clone(),
        };

        tracing::info!(
            "Creating VLAN '{}' ({}) in network domain '{}'",
            spec.name,
            spec.private_ipv4_base_address,
            spec.network_domain_id
        );
        self.client.create_vlan(&spec).await
    }

    async fn await_normal(
        &self,
        resource_type: ResourceType,
        handle: &ProvisionedResourceHandle,
    ) -> Result<Readiness> {
        self.readiness
            .await_ready(
                &self.client,
                resource_type,
                &handle.resource_id,
                ReadyWhen::State(STATE_NORMAL),
                &self.cancel,
            )
            .await
    }

    fn server_spec(
        &self,
        template: &ResourceTemplate,
        instance_id: &str,
        network_domain: &ProvisionedResourceHandle,
        vlan: &ProvisionedResourceHandle,
    ) -> ServerSpec {
        ServerSpec {
            name: template.decorate_instance_name(instance_id),
            image_id: template.image.clone(),
            start: true,
            cpu_count: template.cpu_count.unwrap_or(self.settings.cpu_count),
            memory_gb: template.memory_gb.unwrap_or(self.settings.memory_gb),
            network_domain_id: network_domain.resource_id.clone(),
            vlan_id: vlan.resource_id.clone(),
            administrator_password: template
                .ssh_credentials()
                .map(|(_, password)| password.to_string()),
        }
    }

    async fn provision_server(&self, spec: &ServerSpec) -> ServerOutcome {
        // no new creates once the batch is cancelled
        if self.cancel.is_cancelled() {
            tracing::info!("Skipping server '{}', allocation cancelled", spec.name);
            return ServerOutcome::Cancelled(None);
        }

        tracing::info!("Creating server '{}'", spec.name);

        let handle = match self.client.create_server(spec).await {
            Ok(handle) => handle,
            Err(e) => {
                return ServerOutcome::Failed {
                    handle: None,
                    reason: format!("Server creation failed: {}", e),
                };
            }
        };

        if !handle.is_accepted() {
            return ServerOutcome::Failed {
                reason: format!(
                    "Server creation was not accepted (response code '{}').",
                    handle.response_code
                ),
                handle: Some(handle),
            };
        }

        let readiness = self
            .readiness
            .await_ready(
                &self.client,
                ResourceType::Server,
                &handle.resource_id,
                ReadyWhen::Status(InstanceStatus::Running),
                &self.cancel,
            )
            .await;

        match readiness {
            Ok(Readiness::Ready) => {
                tracing::info!("Server '{}' is running", spec.name);
                ServerOutcome::Running(handle)
            }
            Ok(other) => ServerOutcome::Failed {
                reason: other
                    .failure_message(&format!("server '{}'", spec.name))
                    .unwrap_or_default(),
                handle: Some(handle),
            },
            Err(_) => ServerOutcome::Cancelled(Some(handle)),
        }
    }
}

/// Network domain or VLAN creation failed outright
fn creation_failed(
    error: CloudError,
    key: Option<&str>,
    resource: &str,
    issued: &[ProvisionedResourceHandle],
) -> ComputeError {
    tracing::error!("Failed to create {}: {}", resource, error);

    if error.is_transient() {
        return ComputeError::Transient { source: error };
    }

    let mut accumulator = ConditionAccumulator::new();
    accumulator.add_error(key, format!("Failed to create {}: {}", resource, error));
    report_unreclaimed(&mut accumulator, issued);
    ComputeError::unrecoverable(ALLOCATION_FAILED_MSG, accumulator)
}

/// Network domains and VLANs are left in place for an operator to reclaim
fn report_unreclaimed(accumulator: &mut ConditionAccumulator, handles: &[ProvisionedResourceHandle]) {
    for handle in handles {
        accumulator.add_warning(
            None,
            format!(
                "{} '{}' was created and is not torn down automatically.",
                handle.resource_type, handle.resource_id
            ),
        );
    }
}
