//! Boot orchestrator
//!
//! Drives the target to `up`. Each pass resolves state and dispatches one
//! step, so a run started mid-boot (or re-run after being killed) picks up
//! where the machine actually is.
//!
//! | target     | action                                                  |
//! |------------|---------------------------------------------------------|
//! | `up`       | done                                                    |
//! | relay down | fatal                                                   |
//! | `down`     | wake via relay, poll pre-boot address (bounded)         |
//! | `pre-boot` | open unlock terminal, poll overlay hostname (unbounded) |

use tracing::{info, warn};

use crate::command::Invocation;
use crate::error::{Result, RouseError};
use crate::probe::Probe;
use crate::resolver::StateResolver;
use crate::state::{Operation, RelayState, TargetState};
use crate::Context;

pub struct BootOrchestrator<'a> {
    ctx: Context<'a>,
}

impl<'a> BootOrchestrator<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }

    pub fn boot(&self) -> Result<()> {
        let resolver = StateResolver::new(self.ctx);

        loop {
            let snapshot = resolver.resolve()?;

            if snapshot.target == TargetState::Up {
                info!("Target is up");
                return Ok(());
            }
            if snapshot.relay != RelayState::Up {
                return Err(RouseError::RelayDown {
                    operation: Operation::Boot,
                });
            }

            match snapshot.target {
                TargetState::Down => {
                    self.wake();
                    self.wait_for_preboot()?;
                }
                TargetState::PreBoot => {
                    self.launch_unlock()?;
                    self.wait_for_overlay();
                }
                TargetState::Up | TargetState::Unknown => {
                    return Err(RouseError::UnresolvedState {
                        operation: Operation::Boot,
                    });
                }
            }
        }
    }

    /// Send the wake signal from the relay. A failed send is left to the
    /// pre-boot poll to report.
    fn wake(&self) {
        let config = self.ctx.config;
        let invocation = Invocation::over(&config.relay_hop(), &config.wake_command());
        info!("Waking target ({})", config.target.mac_address);

        match self
            .ctx
            .runner
            .run(&invocation, Some(config.timing.command_timeout()))
        {
            Ok(output) if output.success() => {}
            Ok(output) => warn!("Wake command failed: {}", output.summary()),
            Err(e) => warn!("Wake command failed: {}", e),
        }
    }

    fn wait_for_preboot(&self) -> Result<()> {
        let config = self.ctx.config;
        let probe = Probe::new(self.ctx);
        let relay = config.relay_hop();
        let attempts = config.timing.preboot_max_attempts;

        for attempt in 1..=attempts {
            self.ctx.clock.sleep(config.timing.poll_interval());
            if probe.reachable(&config.target.preboot_address, Some(&relay)) {
                info!("Pre-boot interface up after {} poll(s)", attempt);
                return Ok(());
            }
            info!("Waiting for pre-boot interface ({}/{})", attempt, attempts);
        }

        Err(RouseError::PreBootUnreachable { attempts })
    }

    /// Open a terminal running ssh to the relay and from there to the
    /// pre-boot interface, where the operator enters the disk passphrase.
    fn launch_unlock(&self) -> Result<()> {
        let config = self.ctx.config;
        let unlock = Invocation::from_argv(&config.unlock.command)
            .ok_or_else(|| RouseError::Config("unlock.command is empty".to_string()))?;
        let session = Invocation::over(
            &config.relay_hop().interactive(),
            &Invocation::over(&config.preboot_hop().interactive(), &unlock),
        );
        let terminal = Invocation::from_argv(&config.unlock.terminal)
            .ok_or_else(|| RouseError::Config("unlock.terminal is empty".to_string()))?
            .then(&session);

        info!("Opening unlock session, enter the disk passphrase in the new terminal");
        self.ctx.runner.spawn_detached(&terminal)
    }

    /// Wait for the unlocked system on the overlay. No upper bound: the
    /// operator is at the unlock prompt.
    fn wait_for_overlay(&self) {
        let config = self.ctx.config;
        let probe = Probe::new(self.ctx);
        let started = self.ctx.clock.now();

        loop {
            self.ctx.clock.sleep(config.timing.poll_interval());
            if probe.reachable(&config.target.overlay_host, None) {
                info!(
                    "Target reachable on the overlay after {}s",
                    self.ctx.clock.now().duration_since(started).as_secs()
                );
                return;
            }
            info!("Waiting for the target to finish booting");
        }
    }
}
