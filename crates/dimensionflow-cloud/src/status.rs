//! Canonical instance status and provider state translation
//!
//! The platform reports resource states as strings (`NORMAL`, `PENDING_ADD`, ...).
//! Callers only ever see [`InstanceStatus`], recomputed on every query.

use crate::error::CloudError;
use serde::{Deserialize, Serialize};

/// Provider state of a resource that has finished its asynchronous work
pub const STATE_NORMAL: &str = "NORMAL";
pub const STATE_PENDING_ADD: &str = "PENDING_ADD";
pub const STATE_PENDING_CHANGE: &str = "PENDING_CHANGE";
pub const STATE_PENDING_DELETE: &str = "PENDING_DELETE";
pub const STATE_FAILED_ADD: &str = "FAILED_ADD";
pub const STATE_FAILED_CHANGE: &str = "FAILED_CHANGE";
pub const STATE_FAILED_DELETE: &str = "FAILED_DELETE";

/// Canonical lifecycle status of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Pending,
    Running,
    Stopping,
    Stopped,
    Deleting,
    Failed,
    Unknown,
    Deleted,
}

impl InstanceStatus {
    /// Translate a provider state string into a canonical status.
    ///
    /// Total: any state outside the table maps to `Unknown`.
    pub fn translate(provider_state: &str, started: bool) -> Self {
        match provider_state {
            STATE_NORMAL if started => InstanceStatus::Running,
            STATE_NORMAL => InstanceStatus::Stopped,
            STATE_PENDING_ADD | STATE_PENDING_CHANGE => InstanceStatus::Pending,
            STATE_PENDING_DELETE => InstanceStatus::Deleting,
            STATE_FAILED_ADD | STATE_FAILED_CHANGE | STATE_FAILED_DELETE => InstanceStatus::Failed,
            _ => InstanceStatus::Unknown,
        }
    }

    /// Status for a query that failed instead of returning a state
    pub fn from_query_error(error: &CloudError) -> Self {
        if error.is_not_found() {
            InstanceStatus::Deleted
        } else {
            InstanceStatus::Unknown
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceStatus::Pending => write!(f, "pending"),
            InstanceStatus::Running => write!(f, "running"),
            InstanceStatus::Stopping => write!(f, "stopping"),
            InstanceStatus::Stopped => write!(f, "stopped"),
            InstanceStatus::Deleting => write!(f, "deleting"),
            InstanceStatus::Failed => write!(f, "failed"),
            InstanceStatus::Unknown => write!(f, "unknown"),
            InstanceStatus::Deleted => write!(f, "deleted"),
        }
    }
}
