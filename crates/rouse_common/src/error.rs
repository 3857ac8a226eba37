//! Error types for Rouse.
//!
//! A probe failure is never an error: it is the `down` state. Everything
//! here is fatal to the running operation and ends up as a process exit in
//! `rousectl`.

use std::time::Duration;
use thiserror::Error;

use crate::state::Operation;

/// Exit code when the relay is required but down
pub const EXIT_RELAY_DOWN: i32 = 69;

/// Exit code for internal invariant violations and local spawn failures
pub const EXIT_INTERNAL: i32 = 70;

/// Exit code when the overlay client could not be recycled
pub const EXIT_RECOVERY_FAILED: i32 = 71;

/// Exit code when the pre-boot interface never came up after a wake
pub const EXIT_PREBOOT_UNREACHABLE: i32 = 75;

/// Exit code for configuration errors
pub const EXIT_CONFIG: i32 = 78;

#[derive(Error, Debug)]
pub enum RouseError {
    #[error("relay is down; {operation} needs it to reach the target")]
    RelayDown { operation: Operation },

    #[error("pre-boot interface unreachable from relay after {attempts} attempts")]
    PreBootUnreachable { attempts: u32 },

    #[error("target state unresolved during {operation}")]
    UnresolvedState { operation: Operation },

    #[error("overlay recovery failed at {step}: {detail}")]
    RecoveryFailed { step: &'static str, detail: String },

    #[error("failed to launch unlock terminal `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` timed out after {}s", .after.as_secs())]
    Timeout { command: String, after: Duration },

    #[error("configuration error: {0}")]
    Config(String),
}

impl RouseError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            RouseError::RelayDown { .. } => EXIT_RELAY_DOWN,
            RouseError::PreBootUnreachable { .. } => EXIT_PREBOOT_UNREACHABLE,
            RouseError::RecoveryFailed { .. } => EXIT_RECOVERY_FAILED,
            RouseError::Config(_) => EXIT_CONFIG,
            RouseError::UnresolvedState { .. }
            | RouseError::Launch { .. }
            | RouseError::Spawn { .. }
            | RouseError::Timeout { .. } => EXIT_INTERNAL,
        }
    }

    /// Short stable identifier, used in the invocation journal
    pub fn code(&self) -> &'static str {
        match self {
            RouseError::RelayDown { .. } => "relay_down",
            RouseError::PreBootUnreachable { .. } => "preboot_unreachable",
            RouseError::UnresolvedState { .. } => "unresolved_state",
            RouseError::RecoveryFailed { .. } => "recovery_failed",
            RouseError::Launch { .. } => "launch_failed",
            RouseError::Spawn { .. } => "spawn_failed",
            RouseError::Timeout { .. } => "timeout",
            RouseError::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, RouseError>;
