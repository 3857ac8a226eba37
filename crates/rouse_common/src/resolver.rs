//! State resolver
//!
//! Builds a fresh [`StateSnapshot`] from probes on every call:
//!
//! 1. relay over the overlay, with one recovery + re-probe if it fails
//! 2. target over the overlay -> `up`
//! 3. target pre-boot address through the relay -> `pre-boot`
//! 4. otherwise `down`
//!
//! Recovery runs before the target is looked at, since both target paths
//! depend on relay health.

use tracing::info;

use crate::error::Result;
use crate::probe::Probe;
use crate::recovery::RelayRecovery;
use crate::state::{RelayState, StateSnapshot, TargetState};
use crate::Context;

pub struct StateResolver<'a> {
    ctx: Context<'a>,
}

impl<'a> StateResolver<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }

    pub fn resolve(&self) -> Result<StateSnapshot> {
        let config = self.ctx.config;
        let probe = Probe::new(self.ctx);
        let mut snapshot = StateSnapshot::default();

        let mut relay_reachable = probe.reachable(&config.relay.host, None);
        if !relay_reachable {
            RelayRecovery::new(self.ctx).recover()?;
            relay_reachable = probe.reachable(&config.relay.host, None);
        }
        snapshot.relay = RelayState::from_reachable(relay_reachable);

        snapshot.target = if probe.reachable(&config.target.overlay_host, None) {
            TargetState::Up
        } else if probe.reachable(&config.target.preboot_address, Some(&config.relay_hop())) {
            TargetState::PreBoot
        } else {
            TargetState::Down
        };

        info!("Resolved state: {}", snapshot);
        Ok(snapshot)
    }
}
