//! Resource templates and provisioning requests

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// RedHat 6 64-bit image
pub const DEFAULT_IMAGE: &str = "4ef9c9d4-b188-4b71-9c94-c85e8f257b9e";
pub const DEFAULT_NETWORK_DOMAIN_TYPE: &str = "ADVANCED";
pub const DEFAULT_BASE_IPV4: &str = "10.0.3.0";
pub const DEFAULT_DISK_TYPE: &str = "High Performance";

pub const NETWORK_DOMAIN_TYPES: &[&str] = &["ESSENTIALS", "ADVANCED"];
pub const DISK_TYPES: &[&str] = &["Economy", "Standard", "High Performance"];

/// Configuration keys, used to tag conditions with the field they refer to
pub mod keys {
    pub const IMAGE: &str = "image";
    pub const DATACENTER: &str = "datacenter";
    pub const TYPE: &str = "type";
    pub const NETWORK_NAME: &str = "networkName";
    pub const BASE_IPV4: &str = "baseIpv4";
    pub const INSTANCE_NAME_PREFIX: &str = "instanceNamePrefix";
    pub const BOOT_DISK_TYPE: &str = "bootDiskType";
    pub const BOOT_DISK_SIZE_GB: &str = "bootDiskSizeGb";
    pub const DATA_DISK_COUNT: &str = "dataDiskCount";
    pub const DATA_DISK_TYPE: &str = "dataDiskType";
    pub const DATA_DISK_SIZE_GB: &str = "dataDiskSizeGb";
    pub const MIN_COUNT: &str = "minCount";
}

/// Immutable description of what to provision
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub name: String,

    /// Source image identifier
    #[serde(default = "default_image")]
    pub image: String,

    pub datacenter: String,

    /// Network domain type (`ESSENTIALS` or `ADVANCED`)
    #[serde(rename = "type", default = "default_network_domain_type")]
    pub network_domain_type: String,

    /// Network domain name; the VLAN is named after it
    pub network_name: String,

    /// Base IPv4 address of the VLAN
    #[serde(default = "default_base_ipv4")]
    pub base_ipv4: String,

    #[serde(default)]
    pub ssh_username: Option<String>,

    #[serde(default)]
    pub ssh_password: Option<String>,

    #[serde(default)]
    pub instance_name_prefix: Option<String>,

    #[serde(default = "default_disk_type")]
    pub boot_disk_type: String,

    #[serde(default = "default_boot_disk_size")]
    pub boot_disk_size_gb: i64,

    #[serde(default = "default_data_disk_count")]
    pub data_disk_count: i64,

    #[serde(default = "default_disk_type")]
    pub data_disk_type: String,

    #[serde(default = "default_data_disk_size")]
    pub data_disk_size_gb: i64,

    /// Overrides the provider's default CPU count
    #[serde(default)]
    pub cpu_count: Option<u32>,

    /// Overrides the provider's default memory size
    #[serde(default)]
    pub memory_gb: Option<u32>,

    #[serde(default)]
    pub tags: HashMap<String, String>,
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}
fn default_network_domain_type() -> String {
    DEFAULT_NETWORK_DOMAIN_TYPE.to_string()
}
fn default_base_ipv4() -> String {
    DEFAULT_BASE_IPV4.to_string()
}
fn default_disk_type() -> String {
    DEFAULT_DISK_TYPE.to_string()
}
fn default_boot_disk_size() -> i64 {
    60
}
fn default_data_disk_count() -> i64 {
    2
}
fn default_data_disk_size() -> i64 {
    375
}

impl ResourceTemplate {
    pub fn new(
        name: impl Into<String>,
        datacenter: impl Into<String>,
        network_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            image: default_image(),
            datacenter: datacenter.into(),
            network_domain_type: default_network_domain_type(),
            network_name: network_name.into(),
            base_ipv4: default_base_ipv4(),
            ssh_username: None,
            ssh_password: None,
            instance_name_prefix: None,
            boot_disk_type: default_disk_type(),
            boot_disk_size_gb: default_boot_disk_size(),
            data_disk_count: default_data_disk_count(),
            data_disk_type: default_disk_type(),
            data_disk_size_gb: default_data_disk_size(),
            cpu_count: None,
            memory_gb: None,
            tags: HashMap::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.instance_name_prefix = Some(prefix.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_base_ipv4(mut self, base_ipv4: impl Into<String>) -> Self {
        self.base_ipv4 = base_ipv4.into();
        self
    }

    pub fn with_ssh_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.ssh_username = Some(username.into());
        self.ssh_password = Some(password.into());
        self
    }

    /// Caller-visible instance name: `<prefix>-<instance id>`
    pub fn decorate_instance_name(&self, instance_id: &str) -> String {
        format!(
            "{}-{}",
            self.instance_name_prefix.as_deref().unwrap_or_default(),
            instance_id
        )
    }

    pub fn vlan_name(&self) -> String {
        format!("{}_Vlan", self.network_name)
    }

    /// SSH bootstrap credentials, only when both username and password are non-empty
    pub fn ssh_credentials(&self) -> Option<(&str, &str)> {
        match (self.ssh_username.as_deref(), self.ssh_password.as_deref()) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some((user, password))
            }
            _ => None,
        }
    }
}

impl std::fmt::Debug for ResourceTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceTemplate")
            .field("name", &self.name)
            .field("image", &self.image)
            .field("datacenter", &self.datacenter)
            .field("network_domain_type", &self.network_domain_type)
            .field("network_name", &self.network_name)
            .field("base_ipv4", &self.base_ipv4)
            .field("ssh_username", &self.ssh_username)
            .field("ssh_password", &self.ssh_password.as_ref().map(|_| "<redacted>"))
            .field("instance_name_prefix", &self.instance_name_prefix)
            .field("cpu_count", &self.cpu_count)
            .field("memory_gb", &self.memory_gb)
            .finish_non_exhaustive()
    }
}

/// A template plus the logical instance ids to create and the minimum that must succeed.
///
/// Consumed by a single `allocate` call.
#[derive(Debug, Clone)]
pub struct ProvisioningRequest {
    pub template: ResourceTemplate,
    pub instance_ids: Vec<String>,
    pub min_count: usize,
}

impl ProvisioningRequest {
    /// Duplicate ids are dropped; the first occurrence keeps its position.
    pub fn new<I, S>(template: ResourceTemplate, instance_ids: I, min_count: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let instance_ids = instance_ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &String| seen.insert(id.clone()))
            .collect();

        Self {
            template,
            instance_ids,
            min_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let json = r#"{
            "name": "workers",
            "datacenter": "NA12",
            "networkName": "Cluster-Network",
            "instanceNamePrefix": "cluster1"
        }"#;

        let template: ResourceTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(template.image, DEFAULT_IMAGE);
        assert_eq!(template.network_domain_type, "ADVANCED");
        assert_eq!(template.base_ipv4, "10.0.3.0");
        assert_eq!(template.boot_disk_size_gb, 60);
        assert_eq!(template.data_disk_count, 2);
        assert_eq!(template.data_disk_size_gb, 375);
        assert!(template.cpu_count.is_none());
    }

    #[test]
    fn test_decorated_and_vlan_names() {
        let template = ResourceTemplate::new("t", "NA12", "Cluster-Network").with_prefix("cluster1");
        assert_eq!(template.decorate_instance_name("abc"), "cluster1-abc");
        assert_eq!(template.vlan_name(), "Cluster-Network_Vlan");
    }

    #[test]
    fn test_ssh_credentials_require_both_parts() {
        let template = ResourceTemplate::new("t", "NA12", "net");
        assert!(template.ssh_credentials().is_none());

        let partial = template.clone().with_ssh_credentials("root", "");
        assert!(partial.ssh_credentials().is_none());

        let full = template.with_ssh_credentials("root", "AS12qwas");
        assert_eq!(full.ssh_credentials(), Some(("root", "AS12qwas")));
    }

    #[test]
    fn test_debug_redacts_ssh_password() {
        let template = ResourceTemplate::new("t", "NA12", "net").with_ssh_credentials("root", "AS12qwas");
        let rendered = format!("{:?}", template);
        assert!(!rendered.contains("AS12qwas"));
    }

    #[test]
    fn test_request_keeps_first_occurrence_order() {
        let template = ResourceTemplate::new("t", "NA12", "net");
        let request = ProvisioningRequest::new(template, ["b", "a", "b", "c", "a"], 2);
        assert_eq!(request.instance_ids, vec!["b", "a", "c"]);
    }
}
