//! Error types for the grant correlator.
//!
//! None of these are ever returned from an event handler. They surface while
//! building a policy table, or come back from a collaborator and are logged.

use crate::types::ServerGroupId;
use thiserror::Error;

/// Errors raised while building a [`GroupGrantPolicy`](crate::policy::GroupGrantPolicy).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("server group {0} has more than one grant rule")]
    DuplicateRule(ServerGroupId),
}

/// Failure to submit a request to an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// The host side of the connection is gone.
    #[error("collaborator disconnected")]
    Disconnected,

    /// The collaborator refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),
}

pub type PolicyResult<T> = Result<T, PolicyError>;
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;
