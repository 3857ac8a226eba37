//! State model for the target and relay machines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Boot tier of the target host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TargetState {
    /// Unreachable by any path
    Down,
    /// Reachable only on its LAN address through the relay, disk still locked
    PreBoot,
    /// Reachable on its stable overlay hostname
    Up,
    /// Not resolved yet. Never handed to callers.
    #[default]
    Unknown,
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetState::Down => write!(f, "down"),
            TargetState::PreBoot => write!(f, "pre-boot"),
            TargetState::Up => write!(f, "up"),
            TargetState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Reachability of the gateway relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RelayState {
    Down,
    Up,
    #[default]
    Unknown,
}

impl RelayState {
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable {
            RelayState::Up
        } else {
            RelayState::Down
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayState::Down => write!(f, "down"),
            RelayState::Up => write!(f, "up"),
            RelayState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Joint state of both machines at the instant of resolution.
///
/// Valid only when created: either machine can change underneath it, so
/// every decision point resolves a fresh one. Fields serialize in key order
/// (`relay`, `target`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StateSnapshot {
    pub relay: RelayState,
    pub target: TargetState,
}

impl StateSnapshot {
    pub fn new(target: TargetState, relay: RelayState) -> Self {
        Self { relay, target }
    }

    /// Sorted `key: value` pairs
    pub fn entries(&self) -> [(&'static str, String); 2] {
        [
            ("relay", self.relay.to_string()),
            ("target", self.target.to_string()),
        ]
    }
}

impl fmt::Display for StateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target={} relay={}", self.target, self.relay)
    }
}

/// Operation that required a precondition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Boot,
    Shutdown,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Boot => write!(f, "boot"),
            Operation::Shutdown => write!(f, "shutdown"),
        }
    }
}
