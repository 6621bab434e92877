//! Shared types for the launcher workspace.
//!
//! This crate defines the launch request vocabulary used by the process
//! supervisor, the catalog value types returned by the remote adapter, and
//! strongly-typed error enums shared across the workspace.

pub mod error;
pub mod launch;
pub mod model;

/// Re-export of all error types.
pub use error::*;
/// Re-export of launch request types.
pub use launch::{LaunchMode, LaunchOverrides, LaunchRequest, LaunchTarget, remote_model_ref};
/// Re-export of catalog value types.
pub use model::{GgufInfo, ModelDetails, RemoteModel};
