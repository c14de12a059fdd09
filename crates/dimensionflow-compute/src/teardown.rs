//! Server teardown: caller-driven `delete` and allocation rollback
//!
//! Both paths issue every delete first and then confirm removal, in reverse
//! issue order, on the coarse deletion schedule. Not-found always counts as
//! already deleted.

use crate::error::{ComputeError, Result};
use crate::poller::{Readiness, ReadyWhen};
use crate::provider::ComputeProvider;
use crate::template::ResourceTemplate;
use dimensionflow_cloud::{CloudClient, ConditionAccumulator, ProvisionedResourceHandle, ResourceType};

pub const DELETION_FAILED_MSG: &str = "Problem deleting instances.";

/// A delete request the platform acknowledged
#[derive(Debug, Clone)]
struct PendingDeletion {
    /// Instance id for caller-driven deletes, `None` during rollback
    key: Option<String>,
    handle: ProvisionedResourceHandle,
}

impl<C: CloudClient> ComputeProvider<C> {
    /// Delete the servers of the given instance ids.
    ///
    /// An invalid prefix is a no-op. Ids with no matching server are already
    /// deleted. Per-id failures are accumulated without stopping the batch.
    pub async fn delete<I>(&self, template: &ResourceTemplate, instance_ids: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        if !self.is_prefix_valid(template) {
            return Ok(());
        }

        let mut accumulator = ConditionAccumulator::new();
        let mut pending = Vec::new();

        for instance_id in instance_ids {
            let instance_id = instance_id.as_ref();
            let name = template.decorate_instance_name(instance_id);

            let server = match self.resolve_server(&name).await {
                Ok(Some(server)) => server,
                Ok(None) => {
                    tracing::info!("Server '{}' not found, already deleted", name);
                    continue;
                }
                Err(e) if e.is_not_found() => {
                    tracing::info!("Server '{}' not found, already deleted", name);
                    continue;
                }
                Err(e) => {
                    accumulator.add_error(
                        Some(instance_id),
                        format!("Failed to look up server '{}': {}", name, e),
                    );
                    continue;
                }
            };

            tracing::info!("Deleting server '{}' ({})", name, server.id);
            match self.client.delete_server(&server.id).await {
                Ok(handle) => pending.push(PendingDeletion {
                    key: Some(instance_id.to_string()),
                    handle,
                }),
                Err(e) if e.is_not_found() => {
                    tracing::info!("Server '{}' disappeared before delete", name);
                }
                Err(e) => {
                    accumulator.add_error(
                        Some(instance_id),
                        format!("Failed to delete server '{}': {}", name, e),
                    );
                }
            }
        }

        self.await_deletions(&pending, &mut accumulator).await?;

        if accumulator.has_error() {
            return Err(ComputeError::unrecoverable(DELETION_FAILED_MSG, accumulator));
        }
        Ok(())
    }

    /// Roll back created servers, visiting them in reverse creation order.
    ///
    /// Failures are recorded in `accumulator`; only cancellation is returned.
    pub(crate) async fn tear_down(
        &self,
        handles: &[ProvisionedResourceHandle],
        accumulator: &mut ConditionAccumulator,
    ) -> Result<()> {
        let total = handles.len();
        let mut already_gone = 0;
        let mut pending = Vec::new();

        for handle in handles.iter().rev() {
            tracing::info!("Rolling back server '{}'", handle.resource_id);
            match self.client.delete_server(&handle.resource_id).await {
                Ok(deletion) => pending.push(PendingDeletion {
                    key: None,
                    handle: deletion,
                }),
                Err(e) if e.is_not_found() => already_gone += 1,
                Err(e) => {
                    tracing::error!("Rollback of server '{}' failed: {}", handle.resource_id, e);
                    accumulator.add_error(
                        None,
                        format!("Failed to delete server '{}': {}", handle.resource_id, e),
                    );
                }
            }
        }

        let confirmed = self.await_deletions(&pending, accumulator).await?;
        let succeeded = already_gone + confirmed;

        if succeeded < total {
            tracing::error!("Rollback incomplete: {} of {} servers removed", succeeded, total);
            accumulator.add_error(
                None,
                format!(
                    "{} of the {} tear down operations completed successfully.",
                    succeeded, total
                ),
            );
        } else {
            tracing::warn!("Rolled back {} server(s)", total);
        }
        Ok(())
    }

    /// Confirm removal in reverse issue order; returns the number confirmed
    async fn await_deletions(
        &self,
        pending: &[PendingDeletion],
        accumulator: &mut ConditionAccumulator,
    ) -> Result<usize> {
        let mut confirmed = 0;

        for deletion in pending.iter().rev() {
            let key = deletion.key.as_deref();
            let server_id = &deletion.handle.resource_id;

            if !deletion.handle.is_accepted() {
                accumulator.add_error(
                    key,
                    format!(
                        "Delete request for server '{}' was not accepted (response code '{}').",
                        server_id, deletion.handle.response_code
                    ),
                );
                continue;
            }

            let readiness = self
                .deletion
                .await_ready(
                    &self.client,
                    ResourceType::Server,
                    server_id,
                    ReadyWhen::Gone,
                    &self.cancel,
                )
                .await
                .map_err(|e| {
                    let issued: Vec<_> = pending.iter().map(|p| p.handle.clone()).collect();
                    e.with_issued(&issued)
                })?;

            match readiness {
                Readiness::Ready => {
                    tracing::info!("Server '{}' deleted", server_id);
                    confirmed += 1;
                }
                other => other.record(accumulator, key, &format!("server '{}'", server_id)),
            }
        }

        Ok(confirmed)
    }
}
