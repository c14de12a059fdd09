//! DimensionFlow Cloud Boundary
//!
//! This crate defines the surface the provisioning core consumes from a
//! Managed Cloud Platform client, plus the small pieces of vocabulary shared
//! by every layer above it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              orchestration caller                │
//! │   allocate / find / get_instance_state / delete  │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │             dimensionflow-compute                │
//! │  ┌────────────┐ ┌──────────┐ ┌───────────────┐  │
//! │  │ allocation │ │  poller  │ │   teardown    │  │
//! │  └────────────┘ └──────────┘ └───────────────┘  │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │              dimensionflow-cloud                 │
//! │  trait CloudClient { ... }   InstanceStatus      │
//! │  CloudError                  ConditionAccumulator│
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           concrete HTTP client
//! ```

pub mod client;
pub mod condition;
pub mod error;
pub mod status;

// Re-exports
pub use client::{
    CloudClient, Credentials, DatacenterInfo, NetworkDomainSpec, NetworkInfo, NicInfo,
    OsImageInfo, ProvisionedResourceHandle, ResourceType, ServerDetails, ServerFilter,
    ServerSpec, VlanSpec,
};
pub use condition::{Condition, ConditionAccumulator, Details, Severity};
pub use error::{CloudError, Result};
pub use status::{InstanceStatus, STATE_NORMAL};
