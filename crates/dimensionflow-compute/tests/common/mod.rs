use async_trait::async_trait;
use dimensionflow_cloud::{
    CloudClient, CloudError, DatacenterInfo, NetworkDomainSpec, NetworkInfo, NicInfo,
    OsImageInfo, ProvisionedResourceHandle, ResourceType, Result, ServerDetails, ServerFilter,
    ServerSpec, VlanSpec,
};
use dimensionflow_compute::{ComputeProvider, ComputeSettings, ResourceTemplate};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

pub const PENDING_ADD: &str = "PENDING_ADD";
pub const PENDING_DELETE: &str = "PENDING_DELETE";
pub const NORMAL: &str = "NORMAL";
pub const FAILED_DELETE: &str = "FAILED_DELETE";

/// Every call made against [`FakeCloud`], in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListDatacenters,
    GetDatacenter(String),
    GetOsImage(String),
    CreateNetworkDomain(String),
    /// State of the parent network domain at the time of the call
    CreateVlan { name: String, network_domain_state: String },
    /// State of the VLAN at the time of the call
    CreateServer { name: String, vlan_state: String },
    GetResourceState(ResourceType, String),
    GetServer(String),
    ListServers(Option<String>),
    DeleteServer(String),
}

impl Call {
    #[allow(dead_code)]
    pub fn is_create_server(&self) -> bool {
        matches!(self, Call::CreateServer { .. })
    }
}

struct Tracked {
    state: String,
    /// Pending probes left before NORMAL; `None` never becomes ready
    remaining: Option<u32>,
}

impl Tracked {
    fn new(remaining: Option<u32>) -> Self {
        Self {
            state: PENDING_ADD.to_string(),
            remaining,
        }
    }

    /// Returns true once the resource became ready
    fn advance(&mut self) -> bool {
        match self.remaining.as_mut() {
            Some(0) => {
                self.state = NORMAL.to_string();
                true
            }
            Some(n) => {
                *n -= 1;
                false
            }
            None => false,
        }
    }
}

struct TrackedServer {
    details: ServerDetails,
    progress: Tracked,
    deleting: bool,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    counter: u32,
    ready_after: u32,
    never_ready: HashSet<ResourceType>,
    never_ready_servers: HashSet<String>,
    failing_servers: HashSet<String>,
    stuck_deletions: HashSet<String>,
    failing_lookups: HashMap<String, CloudError>,
    probe_errors: HashMap<ResourceType, CloudError>,
    network_domain_error: Option<CloudError>,
    connect_error: Option<CloudError>,
    missing_datacenters: HashSet<String>,
    missing_images: HashSet<String>,
    resources: HashMap<String, Tracked>,
    servers: BTreeMap<String, TrackedServer>,
    created: Vec<(String, String)>,
    deleted: Vec<String>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{}-{}", prefix, self.counter)
    }

    fn remaining_for(&self, resource_type: ResourceType) -> Option<u32> {
        if self.never_ready.contains(&resource_type) {
            None
        } else {
            Some(self.ready_after)
        }
    }
}

/// Recording in-memory cloud
///
/// Network domains, VLANs and servers report `PENDING_ADD` for `ready_after`
/// probes and then `NORMAL` (servers also switch to started). Deleted servers
/// report `PENDING_DELETE` once and are then gone.
pub struct FakeCloud {
    state: Mutex<State>,
}

#[allow(dead_code)]
impl FakeCloud {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                ready_after: 2,
                ..State::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn ready_after(self, probes: u32) -> Self {
        self.state().ready_after = probes;
        self
    }

    pub fn never_ready(self, resource_type: ResourceType) -> Self {
        self.state().never_ready.insert(resource_type);
        self
    }

    pub fn never_ready_server(self, name: &str) -> Self {
        self.state().never_ready_servers.insert(name.to_string());
        self
    }

    /// `create_server` for this decorated name is rejected
    pub fn fail_server(self, name: &str) -> Self {
        self.state().failing_servers.insert(name.to_string());
        self
    }

    /// Deleting this decorated name leaves the server in `FAILED_DELETE`
    pub fn stuck_deleting(self, name: &str) -> Self {
        self.state().stuck_deletions.insert(name.to_string());
        self
    }

    /// `list_servers` filtered on this decorated name fails
    pub fn fail_lookup(self, name: &str, error: CloudError) -> Self {
        self.state().failing_lookups.insert(name.to_string(), error);
        self
    }

    pub fn fail_probe(self, resource_type: ResourceType, error: CloudError) -> Self {
        self.state().probe_errors.insert(resource_type, error);
        self
    }

    pub fn fail_network_domain(self, error: CloudError) -> Self {
        self.state().network_domain_error = Some(error);
        self
    }

    pub fn fail_connect(self, error: CloudError) -> Self {
        self.state().connect_error = Some(error);
        self
    }

    pub fn missing_datacenter(self, id: &str) -> Self {
        self.state().missing_datacenters.insert(id.to_string());
        self
    }

    pub fn missing_image(self, id: &str) -> Self {
        self.state().missing_images.insert(id.to_string());
        self
    }

    /// Seed an existing server
    pub fn with_server(self, name: &str, state: &str, started: bool) -> Self {
        {
            let mut s = self.state();
            let id = s.next_id("srv");
            let mut details = server_details(&id, name, None, 0);
            details.state = state.to_string();
            details.started = started;
            s.servers.insert(
                id,
                TrackedServer {
                    details,
                    progress: Tracked {
                        state: state.to_string(),
                        remaining: None,
                    },
                    deleting: false,
                },
            );
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    pub fn position(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.state().calls.iter().position(predicate)
    }

    /// Server ids passed to `delete_server`, in call order
    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    /// Ids of servers created through `create_server`, keyed by name
    pub fn created_servers(&self) -> BTreeMap<String, String> {
        self.state().created.iter().cloned().collect()
    }

    pub fn server_id(&self, name: &str) -> Option<String> {
        self.created_servers().get(name).cloned()
    }

    pub fn existing_servers(&self) -> usize {
        self.state().servers.len()
    }
}

fn handle(resource_type: ResourceType, id: &str) -> ProvisionedResourceHandle {
    ProvisionedResourceHandle::new(resource_type, id, "IN_PROGRESS")
}

fn server_details(id: &str, name: &str, spec: Option<&ServerSpec>, host: u32) -> ServerDetails {
    ServerDetails {
        id: id.to_string(),
        name: name.to_string(),
        state: PENDING_ADD.to_string(),
        started: false,
        source_image_id: spec.map(|s| s.image_id.clone()),
        cpu_count: spec.map(|s| s.cpu_count),
        memory_gb: spec.map(|s| s.memory_gb),
        create_time: None,
        network_info: spec.map(|s| NetworkInfo {
            network_domain_id: Some(s.network_domain_id.clone()),
            primary_nic: Some(NicInfo {
                vlan_id: Some(s.vlan_id.clone()),
                private_ipv4: Some(format!("10.0.3.{}", 10 + host)),
            }),
        }),
    }
}

#[async_trait]
impl CloudClient for FakeCloud {
    async fn list_datacenters(&self, _page_size: u32) -> Result<Vec<DatacenterInfo>> {
        let mut s = self.state();
        s.calls.push(Call::ListDatacenters);
        if let Some(e) = s.connect_error.clone() {
            return Err(e);
        }
        Ok(vec![DatacenterInfo {
            id: "NA12".into(),
            display_name: Some("US - West".into()),
        }])
    }

    async fn get_datacenter(&self, id: &str) -> Result<DatacenterInfo> {
        let mut s = self.state();
        s.calls.push(Call::GetDatacenter(id.to_string()));
        if s.missing_datacenters.contains(id) {
            return Err(CloudError::NotFound(format!("datacenter {}", id)));
        }
        Ok(DatacenterInfo {
            id: id.to_string(),
            display_name: None,
        })
    }

    async fn get_os_image(&self, id: &str) -> Result<OsImageInfo> {
        let mut s = self.state();
        s.calls.push(Call::GetOsImage(id.to_string()));
        if s.missing_images.contains(id) {
            return Err(CloudError::NotFound(format!("image {}", id)));
        }
        Ok(OsImageInfo {
            id: id.to_string(),
            name: Some("RedHat 6 64-bit".into()),
        })
    }

    async fn create_network_domain(
        &self,
        spec: &NetworkDomainSpec,
    ) -> Result<ProvisionedResourceHandle> {
        let mut s = self.state();
        s.calls.push(Call::CreateNetworkDomain(spec.name.clone()));
        if let Some(e) = s.network_domain_error.clone() {
            return Err(e);
        }
        let id = s.next_id("nd");
        let remaining = s.remaining_for(ResourceType::NetworkDomain);
        s.resources.insert(id.clone(), Tracked::new(remaining));
        Ok(handle(ResourceType::NetworkDomain, &id))
    }

    async fn create_vlan(&self, spec: &VlanSpec) -> Result<ProvisionedResourceHandle> {
        let mut s = self.state();
        let network_domain_state = s
            .resources
            .get(&spec.network_domain_id)
            .map(|r| r.state.clone())
            .unwrap_or_default();
        s.calls.push(Call::CreateVlan {
            name: spec.name.clone(),
            network_domain_state,
        });
        let id = s.next_id("vlan");
        let remaining = s.remaining_for(ResourceType::Vlan);
        s.resources.insert(id.clone(), Tracked::new(remaining));
        Ok(handle(ResourceType::Vlan, &id))
    }

    async fn create_server(&self, spec: &ServerSpec) -> Result<ProvisionedResourceHandle> {
        let mut s = self.state();
        let vlan_state = s
            .resources
            .get(&spec.vlan_id)
            .map(|r| r.state.clone())
            .unwrap_or_default();
        s.calls.push(Call::CreateServer {
            name: spec.name.clone(),
            vlan_state,
        });
        if s.failing_servers.contains(&spec.name) {
            return Err(CloudError::BadRequest(format!(
                "Insufficient capacity for {}",
                spec.name
            )));
        }

        let id = s.next_id("srv");
        let remaining = if s.never_ready_servers.contains(&spec.name) {
            None
        } else {
            s.remaining_for(ResourceType::Server)
        };
        let details = server_details(&id, &spec.name, Some(spec), s.counter);
        s.created.push((spec.name.clone(), id.clone()));
        s.servers.insert(
            id.clone(),
            TrackedServer {
                details,
                progress: Tracked::new(remaining),
                deleting: false,
            },
        );
        Ok(handle(ResourceType::Server, &id))
    }

    async fn get_resource_state(&self, resource_type: ResourceType, id: &str) -> Result<String> {
        let mut s = self.state();
        s.calls
            .push(Call::GetResourceState(resource_type, id.to_string()));
        if let Some(e) = s.probe_errors.get(&resource_type).cloned() {
            return Err(e);
        }
        let resource = s
            .resources
            .get_mut(id)
            .ok_or_else(|| CloudError::NotFound(format!("{} {}", resource_type, id)))?;
        resource.advance();
        Ok(resource.state.clone())
    }

    async fn get_server(&self, id: &str) -> Result<ServerDetails> {
        let mut guard = self.state();
        let s = &mut *guard;
        s.calls.push(Call::GetServer(id.to_string()));
        if let Some(e) = s.probe_errors.get(&ResourceType::Server).cloned() {
            return Err(e);
        }
        let server = s
            .servers
            .get_mut(id)
            .ok_or_else(|| CloudError::NotFound(format!("server {}", id)))?;

        if server.deleting && s.stuck_deletions.contains(&server.details.name) {
            let mut details = server.details.clone();
            details.state = FAILED_DELETE.to_string();
            return Ok(details);
        }

        if server.deleting {
            let mut details = server.details.clone();
            details.state = PENDING_DELETE.to_string();
            details.started = false;
            s.servers.remove(id);
            return Ok(details);
        }

        if server.progress.advance() {
            server.details.state = NORMAL.to_string();
            server.details.started = true;
        }
        Ok(server.details.clone())
    }

    async fn list_servers(&self, filter: &ServerFilter) -> Result<Vec<ServerDetails>> {
        let mut s = self.state();
        s.calls.push(Call::ListServers(filter.name.clone()));
        if let Some(e) = filter
            .name
            .as_ref()
            .and_then(|name| s.failing_lookups.get(name))
            .cloned()
        {
            return Err(e);
        }
        Ok(s.servers
            .values()
            .filter(|server| filter.matches(&server.details))
            .map(|server| server.details.clone())
            .collect())
    }

    async fn delete_server(&self, id: &str) -> Result<ProvisionedResourceHandle> {
        let mut s = self.state();
        s.calls.push(Call::DeleteServer(id.to_string()));
        let server = s
            .servers
            .get_mut(id)
            .ok_or_else(|| CloudError::NotFound(format!("server {}", id)))?;
        server.deleting = true;
        s.deleted.push(id.to_string());
        Ok(handle(ResourceType::Server, id))
    }
}

#[allow(dead_code)]
pub fn template() -> ResourceTemplate {
    ResourceTemplate::new("workers", "NA12", "Cluster-Network")
        .with_prefix("cluster1")
        .with_ssh_credentials("root", "AS12qwas")
}

#[allow(dead_code)]
pub fn provider(cloud: FakeCloud) -> ComputeProvider<FakeCloud> {
    ComputeProvider::new(cloud, ComputeSettings::default())
}

#[allow(dead_code)]
pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
