//! Cloud resource client boundary
//!
//! The core drives provisioning through [`CloudClient`] only. Request signing,
//! pagination and serialization live behind the trait in a concrete client.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DEFAULT_REGION: &str = "dd-na";

/// Cloud client abstraction trait
///
/// Implementations must be safe to share between concurrent server creations.
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// List datacenters visible to the account (used to verify credentials)
    async fn list_datacenters(&self, page_size: u32) -> Result<Vec<DatacenterInfo>>;

    /// Get a single datacenter
    async fn get_datacenter(&self, id: &str) -> Result<DatacenterInfo>;

    /// Get an OS image by id
    async fn get_os_image(&self, id: &str) -> Result<OsImageInfo>;

    /// Request a new network domain
    async fn create_network_domain(
        &self,
        spec: &NetworkDomainSpec,
    ) -> Result<ProvisionedResourceHandle>;

    /// Request a new VLAN inside an existing network domain
    async fn create_vlan(&self, spec: &VlanSpec) -> Result<ProvisionedResourceHandle>;

    /// Request a new server attached to a VLAN
    async fn create_server(&self, spec: &ServerSpec) -> Result<ProvisionedResourceHandle>;

    /// Current provider state string of a resource (e.g. `NORMAL`)
    async fn get_resource_state(&self, resource_type: ResourceType, id: &str) -> Result<String>;

    /// Get server details by id
    async fn get_server(&self, id: &str) -> Result<ServerDetails>;

    /// List servers matching a filter
    async fn list_servers(&self, filter: &ServerFilter) -> Result<Vec<ServerDetails>>;

    /// Request deletion of a server
    async fn delete_server(&self, id: &str) -> Result<ProvisionedResourceHandle>;
}

/// Account credentials, passed explicitly into client construction
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,

    pub password: String,

    /// Region identifier such as `dd-na` or `dd-eu`
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            region: region.into(),
        }
    }

    /// Effective region, `dd-na` when none was configured
    pub fn region(&self) -> &str {
        let region = self.region.trim();
        if region.is_empty() {
            DEFAULT_REGION
        } else {
            region
        }
    }

    /// Base URL of the regional API
    pub fn api_endpoint(&self) -> String {
        let region = self.region();
        let suffix = region.strip_prefix("dd-").unwrap_or(region);
        format!("https://api-{}.dimensiondata.com", suffix)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

/// Kinds of resource the provisioning pipeline creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    NetworkDomain,
    Vlan,
    Server,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::NetworkDomain => write!(f, "network domain"),
            ResourceType::Vlan => write!(f, "vlan"),
            ResourceType::Server => write!(f, "server"),
        }
    }
}

/// Identifies a cloud-side resource returned by a create or delete call.
///
/// State is never cached here; it is re-queried through the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedResourceHandle {
    pub resource_type: ResourceType,

    pub resource_id: String,

    /// Response code reported by the platform for the request
    pub response_code: String,
}

impl ProvisionedResourceHandle {
    pub fn new(
        resource_type: ResourceType,
        resource_id: impl Into<String>,
        response_code: impl Into<String>,
    ) -> Self {
        Self {
            resource_type,
            resource_id: resource_id.into(),
            response_code: response_code.into(),
        }
    }

    /// Whether the platform accepted the request for asynchronous processing
    pub fn is_accepted(&self) -> bool {
        ["IN_PROGRESS", "OK", "200"]
            .iter()
            .any(|code| self.response_code.eq_ignore_ascii_case(code))
    }
}

/// Network domain creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDomainSpec {
    pub datacenter_id: String,
    pub name: String,
    pub description: String,
    /// `ESSENTIALS` or `ADVANCED`
    #[serde(rename = "type")]
    pub domain_type: String,
}

/// VLAN creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VlanSpec {
    pub network_domain_id: String,
    pub name: String,
    pub private_ipv4_base_address: String,
}

/// Server creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    pub name: String,
    pub image_id: String,
    pub start: bool,
    pub cpu_count: u32,
    pub memory_gb: u32,
    pub network_domain_id: String,
    pub vlan_id: String,
    /// Present only when SSH bootstrap credentials were configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administrator_password: Option<String>,
}

/// Filter for [`CloudClient::list_servers`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerFilter {
    pub name: Option<String>,
}

impl ServerFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    pub fn matches(&self, server: &ServerDetails) -> bool {
        self.name.as_ref().is_none_or(|name| server.name == *name)
    }
}

/// Server information reported by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDetails {
    pub id: String,

    pub name: String,

    pub state: String,

    #[serde(default)]
    pub started: bool,

    pub source_image_id: Option<String>,

    pub cpu_count: Option<u32>,

    pub memory_gb: Option<u32>,

    pub create_time: Option<DateTime<Utc>>,

    pub network_info: Option<NetworkInfo>,
}

impl ServerDetails {
    /// Private IPv4 address of the primary NIC
    pub fn private_ipv4(&self) -> Option<&str> {
        self.network_info
            .as_ref()?
            .primary_nic
            .as_ref()?
            .private_ipv4
            .as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub network_domain_id: Option<String>,
    pub primary_nic: Option<NicInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NicInfo {
    pub vlan_id: Option<String>,
    pub private_ipv4: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatacenterInfo {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsImageInfo {
    pub id: String,
    pub name: Option<String>,
}
