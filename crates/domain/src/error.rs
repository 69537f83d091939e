//! Domain error types.

use pvz_store::StoreError;
use thiserror::Error;

/// Errors that can occur during domain operations.
///
/// `Validation`, `Conflict`, `NotFound` and `Unauthorized` carry a message
/// meant for the caller; `Store` and `Internal` are not shown verbatim.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// A reception state-machine precondition does not hold.
    #[error("{0}")]
    Conflict(String),

    /// A referenced entity is absent.
    #[error("{0}")]
    NotFound(String),

    /// Credentials did not match.
    #[error("{0}")]
    Unauthorized(String),

    /// The store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// An invariant of the service itself was broken.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    pub(crate) fn conflict(msg: impl Into<String>) -> Self {
        DomainError::Conflict(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        DomainError::NotFound(msg.into())
    }

    /// Returns true for failures the caller cannot fix by changing the request.
    pub fn is_internal(&self) -> bool {
        matches!(self, DomainError::Store(_) | DomainError::Internal(_))
    }
}
