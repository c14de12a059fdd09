//! Compute instance view returned by `find`

use dimensionflow_cloud::{InstanceStatus, ServerDetails};
use std::collections::BTreeMap;
use std::net::IpAddr;

/// A found server together with the logical id it was requested under
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeInstance {
    pub id: String,
    pub decorated_name: String,
    pub private_ip: Option<IpAddr>,
    pub server: ServerDetails,
}

/// A display property and the function extracting it from an instance
pub struct DisplayProperty {
    pub key: &'static str,
    pub description: &'static str,
    extract: fn(&ComputeInstance) -> Option<String>,
}

impl DisplayProperty {
    pub fn value(&self, instance: &ComputeInstance) -> Option<String> {
        (self.extract)(instance)
    }
}

pub static DISPLAY_PROPERTIES: &[DisplayProperty] = &[
    DisplayProperty {
        key: "imageId",
        description: "The ID of the image used to launch the instance.",
        extract: |i| i.server.source_image_id.clone(),
    },
    DisplayProperty {
        key: "instanceId",
        description: "The ID of the instance.",
        extract: |i| Some(i.server.id.clone()),
    },
    DisplayProperty {
        key: "instanceType",
        description: "The instance type.",
        extract: |i| Some(i.server.name.clone()),
    },
    DisplayProperty {
        key: "launchTime",
        description: "The time the instance was launched.",
        extract: |i| i.server.create_time.map(|t| t.to_rfc3339()),
    },
    DisplayProperty {
        key: "privateIpAddress",
        description: "The private IP address assigned to the instance.",
        extract: |i| i.private_ip.map(|ip| ip.to_string()),
    },
];

impl ComputeInstance {
    pub fn new(id: impl Into<String>, decorated_name: impl Into<String>, server: ServerDetails) -> Self {
        let private_ip = server.private_ipv4().and_then(|ip| ip.parse().ok());
        Self {
            id: id.into(),
            decorated_name: decorated_name.into(),
            private_ip,
            server,
        }
    }

    pub fn status(&self) -> InstanceStatus {
        InstanceStatus::translate(&self.server.state, self.server.started)
    }

    /// Display properties keyed by property key; absent values are omitted
    pub fn properties(&self) -> BTreeMap<&'static str, String> {
        DISPLAY_PROPERTIES
            .iter()
            .filter_map(|p| p.value(self).map(|value| (p.key, value)))
            .collect()
    }
}
