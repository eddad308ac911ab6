//! Capabilities the manager consumes: the inference client and the
//! naming/position collaborators.

use async_trait::async_trait;
use thiserror::Error;

use crate::entity::{
    CreateSessionRequest, HealthInfo, Position3D, SessionData, SessionStatusSnapshot,
};

/// Inference client error.
///
/// The manager treats every variant the same way; only the message differs.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("{0}")]
    Other(String),
}

/// Trait for remote inference session clients.
///
/// One client is shared by every compute entity of a manager.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Create a session and return the rooms allocated for it.
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<SessionData, ClientError>;

    /// Start inference for a session.
    async fn start_inference(&self, session_id: &str) -> Result<(), ClientError>;

    /// Stop inference for a session.
    async fn stop_inference(&self, session_id: &str) -> Result<(), ClientError>;

    /// Delete a session.
    async fn delete_session(&self, session_id: &str) -> Result<(), ClientError>;

    /// Query the current state of a session.
    async fn get_session_status(
        &self,
        session_id: &str,
    ) -> Result<SessionStatusSnapshot, ClientError>;

    /// Cheap availability probe.
    async fn is_healthy(&self) -> Result<bool, ClientError>;

    /// Detailed health report.
    async fn get_health(&self) -> Result<HealthInfo, ClientError>;
}

/// Produces fresh compute identifiers.
pub trait NameGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Produces default positions for new computes.
pub trait PositionProvider: Send + Sync {
    fn next_position(&self) -> Position3D;
}
