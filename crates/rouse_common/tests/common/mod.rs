//! Scripted network and manual clock for driving the orchestrators without
//! any real ping, ssh or sleep.

#![allow(dead_code)]

use rouse_common::{
    Clock, CommandOutput, CommandRunner, Context, Invocation, RouseConfig, RouseError,
};
use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

/// Power/boot phase of the simulated target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Off,
    PreBoot,
    Up,
}

/// What a recorded invocation was for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    RelayProbe,
    OverlayProbe,
    PrebootProbe,
    Wake,
    Unlock,
    Poweroff,
    Logout,
    Login,
    Other,
}

/// Simulated relay + target
#[derive(Debug, Clone)]
pub struct World {
    pub relay_reachable: bool,
    /// Relay reachability once the overlay session is cycled
    pub relay_after_recovery: bool,
    pub logout_fails: bool,
    pub target: Phase,
    /// Tunneled polls after a wake before pre-boot answers; `None` never boots
    pub preboot_delay: Option<u32>,
    /// Overlay polls after the unlock terminal opens before the target answers
    pub unlock_delay: u32,
    /// Power-off commands swallowed before the target actually goes down
    pub ignored_poweroffs: u32,
    /// Pre-boot probes through the relay work even when the relay's own probe fails
    pub tunnel_ignores_relay: bool,
    pub tunnel_broken: bool,
    pub wake_fails: bool,
    pub terminal_fails: bool,
    pending_wake: Option<u32>,
    pending_unlock: Option<u32>,
}

impl World {
    pub fn new(target: Phase) -> Self {
        Self {
            relay_reachable: true,
            relay_after_recovery: true,
            logout_fails: false,
            target,
            preboot_delay: Some(0),
            unlock_delay: 0,
            ignored_poweroffs: 0,
            tunnel_ignores_relay: false,
            tunnel_broken: false,
            wake_fails: false,
            terminal_fails: false,
            pending_wake: None,
            pending_unlock: None,
        }
    }

    pub fn relay_down(mut self) -> Self {
        self.relay_reachable = false;
        self.relay_after_recovery = false;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub kind: Kind,
    pub invocation: Invocation,
    pub detached: bool,
}

pub struct FakeNetwork {
    config: RouseConfig,
    pub world: RefCell<World>,
    pub calls: RefCell<Vec<Call>>,
}

impl FakeNetwork {
    pub fn new(config: &RouseConfig, world: World) -> Self {
        Self {
            config: config.clone(),
            world: RefCell::new(world),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn count(&self, kind: Kind) -> usize {
        self.calls.borrow().iter().filter(|c| c.kind == kind).count()
    }

    pub fn calls_of(&self, kind: Kind) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect()
    }

    /// True when nothing but liveness checks went out
    pub fn only_probes(&self) -> bool {
        self.calls.borrow().iter().all(|c| {
            matches!(
                c.kind,
                Kind::RelayProbe | Kind::OverlayProbe | Kind::PrebootProbe
            )
        })
    }

    pub fn target(&self) -> Phase {
        self.world.borrow().target
    }

    fn classify(&self, invocation: &Invocation) -> Kind {
        let config = &self.config;
        let last = invocation.args.last().map(String::as_str).unwrap_or("");

        if Some(invocation) == Invocation::from_argv(&config.overlay.logout_command).as_ref() {
            return Kind::Logout;
        }
        if Some(invocation) == Invocation::from_argv(&config.overlay.login_command).as_ref() {
            return Kind::Login;
        }

        match invocation.program.as_str() {
            "ping" if last == config.relay.host => Kind::RelayProbe,
            "ping" if last == config.target.overlay_host => Kind::OverlayProbe,
            "ssh" if last.starts_with("ping") && last.contains(&config.target.preboot_address) => {
                Kind::PrebootProbe
            }
            "ssh" if last.contains(&config.relay.wake_program) => Kind::Wake,
            "ssh" if last.contains("poweroff") => Kind::Poweroff,
            _ => Kind::Other,
        }
    }

    fn record(&self, kind: Kind, invocation: &Invocation, detached: bool) {
        self.calls.borrow_mut().push(Call {
            kind,
            invocation: invocation.clone(),
            detached,
        });
    }

    fn respond(&self, kind: Kind, invocation: &Invocation) -> rouse_common::Result<CommandOutput> {
        let mut world = self.world.borrow_mut();

        let output = match kind {
            Kind::RelayProbe => ping(world.relay_reachable),
            Kind::OverlayProbe => {
                if let Some(remaining) = world.pending_unlock {
                    if remaining == 0 {
                        world.target = Phase::Up;
                        world.pending_unlock = None;
                    } else {
                        world.pending_unlock = Some(remaining - 1);
                    }
                }
                ping(world.target == Phase::Up)
            }
            Kind::PrebootProbe => {
                if world.tunnel_broken {
                    return Err(RouseError::Timeout {
                        command: invocation.to_string(),
                        after: Duration::from_secs(7),
                    });
                }
                if !world.relay_reachable && !world.tunnel_ignores_relay {
                    return Ok(CommandOutput {
                        code: Some(255),
                        stdout: String::new(),
                        stderr: "ssh: connect to host gateway port 22: Connection timed out"
                            .to_string(),
                    });
                }
                if let Some(remaining) = world.pending_wake {
                    if remaining == 0 {
                        world.target = Phase::PreBoot;
                        world.pending_wake = None;
                    } else {
                        world.pending_wake = Some(remaining - 1);
                    }
                }
                ping(world.target == Phase::PreBoot)
            }
            Kind::Wake => {
                if world.wake_fails {
                    return Ok(CommandOutput {
                        code: Some(127),
                        stdout: String::new(),
                        stderr: "wakeonlan: command not found".to_string(),
                    });
                }
                if world.target == Phase::Off {
                    world.pending_wake = world.preboot_delay;
                }
                CommandOutput::new(0, "Sending magic packet")
            }
            Kind::Poweroff => {
                if world.ignored_poweroffs > 0 {
                    world.ignored_poweroffs -= 1;
                } else {
                    world.target = Phase::Off;
                    world.pending_unlock = None;
                }
                CommandOutput {
                    code: Some(255),
                    stdout: String::new(),
                    stderr: "Connection closed by remote host".to_string(),
                }
            }
            Kind::Logout => {
                if world.logout_fails {
                    CommandOutput {
                        code: Some(1),
                        stdout: String::new(),
                        stderr: "sudo: a password is required".to_string(),
                    }
                } else {
                    world.relay_reachable = false;
                    CommandOutput::new(0, "")
                }
            }
            Kind::Login => {
                world.relay_reachable = world.relay_after_recovery;
                CommandOutput::new(0, "Success.")
            }
            Kind::Unlock | Kind::Other => CommandOutput::new(0, ""),
        };

        Ok(output)
    }
}

impl CommandRunner for FakeNetwork {
    fn run(
        &self,
        invocation: &Invocation,
        _timeout: Option<Duration>,
    ) -> rouse_common::Result<CommandOutput> {
        let kind = self.classify(invocation);
        self.record(kind, invocation, false);
        self.respond(kind, invocation)
    }

    fn spawn_detached(&self, invocation: &Invocation) -> rouse_common::Result<()> {
        self.record(Kind::Unlock, invocation, true);

        let mut world = self.world.borrow_mut();
        if world.terminal_fails {
            return Err(RouseError::Launch {
                command: invocation.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no terminal"),
            });
        }
        if world.target == Phase::PreBoot {
            world.pending_unlock = Some(world.unlock_delay);
        }
        Ok(())
    }
}

fn ping(reachable: bool) -> CommandOutput {
    if reachable {
        CommandOutput::new(
            0,
            "--- ping statistics ---\n1 packets transmitted, 1 received, 0% packet loss, time 0ms\n",
        )
    } else {
        CommandOutput::new(
            1,
            "--- ping statistics ---\n1 packets transmitted, 0 received, 100% packet loss, time 0ms\n",
        )
    }
}

/// Clock that only moves when slept on
pub struct ManualClock {
    base: Instant,
    elapsed: Cell<Duration>,
    pub sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    pub fn sleep_count(&self) -> usize {
        self.sleeps.borrow().len()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
        self.sleeps.borrow_mut().push(duration);
    }
}

/// Config + network + clock wired together
pub struct Harness {
    pub config: RouseConfig,
    pub net: FakeNetwork,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new(world: World) -> Self {
        let config = RouseConfig::default();
        let net = FakeNetwork::new(&config, world);
        Self {
            config,
            net,
            clock: ManualClock::new(),
        }
    }

    pub fn ctx(&self) -> Context<'_> {
        Context::new(&self.config, &self.net, &self.clock)
    }
}
