//! Compute provider error types

use dimensionflow_cloud::{CloudError, ConditionAccumulator, Details, ProvisionedResourceHandle};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComputeError {
    /// Pre-flight validation failed; nothing was mutated in the cloud
    #[error("Invalid configuration:\n{details}")]
    InvalidConfiguration { details: Details },

    /// The provider failed in a way that may succeed on a later retry of the whole operation
    #[error("Transient provider error: {source}")]
    Transient { source: CloudError },

    /// Terminal failure; the same request must not be retried without operator intervention
    #[error("{message}\n{details}")]
    Unrecoverable { message: String, details: Details },

    /// A local wait was abandoned; cloud-side requests already issued keep running
    #[error("Cancelled while waiting for {resource}")]
    Cancelled {
        resource: String,
        issued: Vec<ProvisionedResourceHandle>,
    },
}

impl ComputeError {
    pub fn unrecoverable(message: impl Into<String>, accumulator: ConditionAccumulator) -> Self {
        ComputeError::Unrecoverable {
            message: message.into(),
            details: accumulator.into_details(),
        }
    }

    /// Whether the caller may retry the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, ComputeError::Transient { .. })
    }

    /// Attach the handles issued before a cancellation; other variants pass through.
    pub fn with_issued(self, handles: &[ProvisionedResourceHandle]) -> Self {
        match self {
            ComputeError::Cancelled { resource, mut issued } => {
                issued.extend_from_slice(handles);
                ComputeError::Cancelled { resource, issued }
            }
            other => other,
        }
    }

    /// Conditions carried by the failure, if any
    pub fn details(&self) -> Option<&Details> {
        match self {
            ComputeError::InvalidConfiguration { details }
            | ComputeError::Unrecoverable { details, .. } => Some(details),
            _ => None,
        }
    }
}

impl From<CloudError> for ComputeError {
    fn from(err: CloudError) -> Self {
        if err.is_transient() {
            ComputeError::Transient { source: err }
        } else {
            let mut accumulator = ConditionAccumulator::new();
            accumulator.add_error(None, err.to_string());
            ComputeError::unrecoverable("Cloud request rejected.", accumulator)
        }
    }
}

pub type Result<T> = std::result::Result<T, ComputeError>;
