//! Shutdown orchestrator
//!
//! Drives the target to `down`. The power-off path depends on the boot
//! tier: through the relay with the unlock key while in pre-boot, directly
//! over the overlay once up. A power-off that fails looks the same as a
//! slow one; the loop settles, re-resolves and sends it again.

use tracing::{info, warn};

use crate::command::Invocation;
use crate::error::{Result, RouseError};
use crate::resolver::StateResolver;
use crate::state::{Operation, RelayState, TargetState};
use crate::Context;

pub struct ShutdownOrchestrator<'a> {
    ctx: Context<'a>,
}

impl<'a> ShutdownOrchestrator<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }

    pub fn shutdown(&self) -> Result<()> {
        let config = self.ctx.config;
        let resolver = StateResolver::new(self.ctx);

        loop {
            let snapshot = resolver.resolve()?;

            let invocation = match snapshot.target {
                TargetState::Down => {
                    info!("Target is down");
                    return Ok(());
                }
                TargetState::PreBoot => {
                    if snapshot.relay != RelayState::Up {
                        return Err(RouseError::RelayDown {
                            operation: Operation::Shutdown,
                        });
                    }
                    let poweroff = argv(&config.preboot.poweroff_command, "preboot.poweroff_command")?;
                    info!("Powering off the pre-boot interface via the relay");
                    Invocation::over(
                        &config.relay_hop(),
                        &Invocation::over(&config.preboot_hop(), &poweroff),
                    )
                }
                TargetState::Up => {
                    let poweroff = argv(&config.target.poweroff_command, "target.poweroff_command")?;
                    info!("Powering off the target over the overlay");
                    Invocation::over(&config.target_hop(), &poweroff)
                }
                TargetState::Unknown => {
                    return Err(RouseError::UnresolvedState {
                        operation: Operation::Shutdown,
                    });
                }
            };

            // The connection usually drops mid-command, so failure is expected noise.
            match self
                .ctx
                .runner
                .run(&invocation, Some(config.timing.command_timeout()))
            {
                Ok(output) if output.success() => {}
                Ok(output) => warn!("Power-off command returned {}", output.summary()),
                Err(e) => warn!("Power-off command failed: {}", e),
            }

            self.ctx.clock.sleep(config.timing.poweroff_settle());
        }
    }
}

fn argv(argv: &[String], key: &str) -> Result<Invocation> {
    Invocation::from_argv(argv).ok_or_else(|| RouseError::Config(format!("{} is empty", key)))
}
