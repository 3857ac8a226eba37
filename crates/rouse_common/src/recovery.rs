//! Relay recovery
//!
//! When the relay can't be reached over the overlay, the local overlay
//! session is usually what's stuck. Cycle it: logout, settle, login, settle.
//! There is no other path to the relay, so either step failing is fatal.

use tracing::{info, warn};

use crate::command::Invocation;
use crate::error::{Result, RouseError};
use crate::Context;

pub struct RelayRecovery<'a> {
    ctx: Context<'a>,
}

impl<'a> RelayRecovery<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }

    pub fn recover(&self) -> Result<()> {
        let overlay = &self.ctx.config.overlay;
        warn!("Relay unreachable over the overlay, cycling the overlay session");

        self.step("logout", &overlay.logout_command)?;
        self.step("login", &overlay.login_command)?;

        info!("Overlay session re-established");
        Ok(())
    }

    fn step(&self, step: &'static str, argv: &[String]) -> Result<()> {
        let timing = &self.ctx.config.timing;
        let invocation = Invocation::from_argv(argv).ok_or_else(|| RouseError::RecoveryFailed {
            step,
            detail: "no command configured".to_string(),
        })?;

        info!("Overlay {}: {}", step, invocation);
        let output = self
            .ctx
            .runner
            .run(&invocation, Some(timing.command_timeout()))
            .map_err(|e| RouseError::RecoveryFailed {
                step,
                detail: e.to_string(),
            })?;

        if !output.success() {
            return Err(RouseError::RecoveryFailed {
                step,
                detail: output.summary(),
            });
        }

        self.ctx.clock.sleep(timing.recovery_settle());
        Ok(())
    }
}
