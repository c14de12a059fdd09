//! DimensionFlow Compute
//!
//! Provisions clusters of servers on a Managed Cloud Platform: one network
//! domain, one VLAN inside it, then one server per requested instance id.
//!
//! ## Operations
//!
//! | operation | behaviour |
//! |---|---|
//! | [`ComputeProvider::allocate`] | create network domain → VLAN → servers, roll back servers below `minCount` |
//! | [`ComputeProvider::find`] | existing instances for a set of ids |
//! | [`ComputeProvider::get_instance_state`] | one [`InstanceStatus`] per id, never fails |
//! | [`ComputeProvider::delete`] | delete servers, not-found counts as deleted |
//!
//! Every wait goes through the [`ReadinessPoller`] and can be abandoned with the
//! provider's [`cancellation_token`](ComputeProvider::cancellation_token).

pub mod allocate;
pub mod error;
pub mod instance;
pub mod inventory;
pub mod poller;
pub mod provider;
pub mod settings;
pub mod teardown;
pub mod template;
pub mod validator;

pub use allocate::{ALLOCATION_FAILED_MSG, AllocatedServer, Allocation};
pub use dimensionflow_cloud::InstanceStatus;
pub use error::{ComputeError, Result};
pub use instance::{ComputeInstance, DISPLAY_PROPERTIES, DisplayProperty};
pub use poller::{PollSchedule, Readiness, ReadinessPoller, ReadyWhen};
pub use provider::ComputeProvider;
pub use settings::ComputeSettings;
pub use teardown::DELETION_FAILED_MSG;
pub use template::{ProvisioningRequest, ResourceTemplate};
pub use validator::{TemplateValidator, check_prefix, check_template};
