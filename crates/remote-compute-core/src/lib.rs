//! Core types and capabilities for remote inference compute management.
//!
//! This crate provides the fundamental building blocks:
//! - `ComputeEntity` - Local handle to one remote inference session
//! - `InferenceClient` - Capability over the remote session API
//! - `EventLog` - Broadcast + history of collection changes
//! - `ManagerConfig` - Process-wide endpoint configuration

pub mod collaborators;
pub mod config;
pub mod entity;
pub mod events;
pub mod outcome;
pub mod traits;

pub use collaborators::{GridPositionProvider, UuidNameGenerator};
pub use config::{ConfigError, ManagerConfig};
pub use entity::{
    ComputeEntity, ComputeId, ComputeStatus, CreateSessionRequest, HealthInfo, InferenceStats,
    Position3D, SessionConfig, SessionData, SessionStats, SessionStatusSnapshot,
};
pub use events::{CleanupOperation, ComputeEvent, EventLog};
pub use outcome::OperationOutcome;
pub use traits::{ClientError, InferenceClient, NameGenerator, PositionProvider};
