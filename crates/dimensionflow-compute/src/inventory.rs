//! Read-only instance queries: `find` and `get_instance_state`

use crate::error::Result;
use crate::instance::ComputeInstance;
use crate::provider::ComputeProvider;
use crate::template::ResourceTemplate;
use dimensionflow_cloud::{CloudClient, InstanceStatus, ServerDetails, ServerFilter};
use std::collections::HashMap;

impl<C: CloudClient> ComputeProvider<C> {
    /// Instances that currently exist for the given ids.
    ///
    /// Missing ids are skipped; callers diff against the requested set. Any
    /// other client error fails the whole call.
    pub async fn find<I>(&self, template: &ResourceTemplate, instance_ids: I) -> Result<Vec<ComputeInstance>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        if !self.is_prefix_valid(template) {
            return Ok(Vec::new());
        }

        let mut instances = Vec::new();
        for instance_id in instance_ids {
            let instance_id = instance_id.as_ref();
            let name = template.decorate_instance_name(instance_id);

            let server = match self.resolve_server(&name).await {
                Ok(Some(server)) => server,
                Ok(None) => {
                    tracing::info!("Instance '{}' not found", name);
                    continue;
                }
                Err(e) if e.is_not_found() => {
                    tracing::info!("Instance '{}' not found", name);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match self.client.get_server(&server.id).await {
                Ok(details) => instances.push(ComputeInstance::new(instance_id, name, details)),
                Err(e) if e.is_not_found() => {
                    tracing::info!("Instance '{}' disappeared during lookup", name);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(instances)
    }

    /// One status per requested id; never fails.
    ///
    /// No match means `Deleted`. Query errors other than not-found yield
    /// `Unknown` for that id only.
    pub async fn get_instance_state<I>(
        &self,
        template: &ResourceTemplate,
        instance_ids: I,
    ) -> HashMap<String, InstanceStatus>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let instance_ids: Vec<String> = instance_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();

        if !self.is_prefix_valid(template) {
            return instance_ids
                .into_iter()
                .map(|id| (id, InstanceStatus::Unknown))
                .collect();
        }

        let mut states = HashMap::with_capacity(instance_ids.len());
        for instance_id in instance_ids {
            let name = template.decorate_instance_name(&instance_id);
            let status = match self.resolve_server(&name).await {
                Ok(Some(server)) => InstanceStatus::translate(&server.state, server.started),
                Ok(None) => InstanceStatus::Deleted,
                Err(e) => {
                    if !e.is_not_found() {
                        tracing::warn!("State query for '{}' failed: {}", name, e);
                    }
                    InstanceStatus::from_query_error(&e)
                }
            };
            tracing::debug!("Instance '{}' is {}", name, status);
            states.insert(instance_id, status);
        }

        states
    }

    /// First server whose name equals the decorated name
    pub(crate) async fn resolve_server(
        &self,
        decorated_name: &str,
    ) -> dimensionflow_cloud::Result<Option<ServerDetails>> {
        let filter = ServerFilter::by_name(decorated_name);
        let servers = self.client.list_servers(&filter).await?;
        Ok(servers.into_iter().find(|server| filter.matches(server)))
    }
}
