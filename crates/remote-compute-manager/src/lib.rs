//! Session lifecycle orchestration for remote inference computes.
//!
//! Provides:
//! - `ComputeManager` - Own computes and drive their remote sessions
//! - `SessionError` / `DuplicateComputeError` - Operation failures

pub mod error;
pub mod manager;
mod registry;

#[cfg(test)]
mod testing;

pub use error::{DuplicateComputeError, SessionError};
pub use manager::{ComputeManager, TeardownReport};
