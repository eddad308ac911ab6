//! Manager errors.

use remote_compute_core::{ClientError, ComputeId};
use thiserror::Error;

/// Creating a compute whose id is already taken.
///
/// This is caller misuse, so it is kept apart from [`SessionError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Compute with ID {0} already exists")]
pub struct DuplicateComputeError(pub ComputeId);

/// Session operation error.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Compute {0} not found")]
    ComputeNotFound(ComputeId),
    #[error("No session to {action}")]
    NoSession {
        compute_id: ComputeId,
        action: &'static str,
    },
    #[error("Server is not healthy")]
    Unhealthy,
    #[error(transparent)]
    Remote(#[from] ClientError),
}

impl SessionError {
    /// Whether the inference server was actually called and failed.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}
