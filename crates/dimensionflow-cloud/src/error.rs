//! Cloud client error types

use thiserror::Error;

/// Errors surfaced by a [`CloudClient`](crate::CloudClient) call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloudError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl CloudError {
    /// Not-found is a normal-path signal for most operations
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }

    /// Whether retrying the whole operation later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CloudError::Unavailable(_) | CloudError::RateLimited(_) | CloudError::Request(_)
        )
    }

    /// Short machine-readable kind, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            CloudError::Forbidden(_) => "forbidden",
            CloudError::Unauthorized(_) => "unauthorized",
            CloudError::NotFound(_) => "not_found",
            CloudError::BadRequest(_) => "bad_request",
            CloudError::Unavailable(_) => "unavailable",
            CloudError::RateLimited(_) => "rate_limited",
            CloudError::Request(_) => "request",
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
