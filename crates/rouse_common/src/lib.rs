//! Rouse Common - power lifecycle control for a relay-fronted workstation
//!
//! The target host sits behind a gateway relay and an encrypted-disk boot.
//! It is reachable either over the mesh overlay (fully booted) or through
//! the relay on its LAN address (pre-boot unlock stage).
//!
//! Callers use three operations: [`StateResolver::resolve`],
//! [`BootOrchestrator::boot`] and [`ShutdownOrchestrator::shutdown`].

pub mod boot;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod probe;
pub mod recovery;
pub mod resolver;
pub mod shutdown;
pub mod state;

pub use boot::BootOrchestrator;
pub use clock::{Clock, SystemClock};
pub use command::{CommandOutput, CommandRunner, Invocation, SshHop, SystemRunner};
pub use config::RouseConfig;
pub use error::{Result, RouseError};
pub use probe::Probe;
pub use recovery::RelayRecovery;
pub use resolver::StateResolver;
pub use shutdown::ShutdownOrchestrator;
pub use state::{Operation, RelayState, StateSnapshot, TargetState};

/// Everything a component needs to talk to the outside world.
///
/// Built once at the boundary and copied into each component, so tests can
/// swap the runner and clock for doubles.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub config: &'a RouseConfig,
    pub runner: &'a dyn CommandRunner,
    pub clock: &'a dyn Clock,
}

impl<'a> Context<'a> {
    pub fn new(
        config: &'a RouseConfig,
        runner: &'a dyn CommandRunner,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            config,
            runner,
            clock,
        }
    }
}
