//! Reachability probe
//!
//! One ICMP echo with a short reply timeout, optionally run on the relay.
//! The verdict is a plain bool: lost packets, timeouts, a dead tunnel and
//! an unspawnable `ping` all read as unreachable.

use std::time::Duration;
use tracing::debug;

use crate::command::{Invocation, SshHop};
use crate::Context;

/// Slack on top of the ping and ssh timeouts before the runner kills the probe
const PROBE_GUARD_SLACK: Duration = Duration::from_secs(1);

/// Liveness check against one host
pub struct Probe<'a> {
    ctx: Context<'a>,
}

impl<'a> Probe<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }

    /// Probe `host` from here, or from the far side of `via`
    pub fn reachable(&self, host: &str, via: Option<&SshHop>) -> bool {
        let timing = &self.ctx.config.timing;
        let ping = ping_command(host, timing.probe_timeout());

        let (invocation, guard) = match via {
            Some(hop) => (
                Invocation::over(hop, &ping),
                timing.probe_timeout() + hop.connect_timeout + PROBE_GUARD_SLACK,
            ),
            None => (ping, timing.probe_timeout() + PROBE_GUARD_SLACK),
        };

        let verdict = match self.ctx.runner.run(&invocation, Some(guard)) {
            Ok(output) => match parse_ping_summary(&output.stdout) {
                Some((sent, received)) => sent > 0 && sent == received,
                None => {
                    debug!("No ping summary from `{}` ({})", invocation, output.summary());
                    false
                }
            },
            Err(e) => {
                debug!("Probe of {} failed: {}", host, e);
                false
            }
        };

        debug!(
            "Probe {}{}: {}",
            host,
            via.map(|hop| format!(" via {}", hop.host)).unwrap_or_default(),
            if verdict { "reachable" } else { "unreachable" }
        );
        verdict
    }
}

/// `ping -c 1 -W <secs> host`
pub fn ping_command(host: &str, timeout: Duration) -> Invocation {
    Invocation::new("ping")
        .args(["-c", "1", "-W"])
        .arg(timeout.as_secs().max(1).to_string())
        .arg(host)
}

/// Extract `(transmitted, received)` from ping's statistics line.
///
/// Handles both `1 packets transmitted, 1 received` (iputils) and
/// `1 packets transmitted, 1 packets received` (BSD).
pub fn parse_ping_summary(output: &str) -> Option<(u32, u32)> {
    let line = output.lines().find(|l| l.contains("transmitted"))?;

    let mut sent = None;
    let mut received = None;
    for part in line.split(',') {
        let count = part
            .split_whitespace()
            .next()
            .and_then(|n| n.parse::<u32>().ok());
        if part.contains("transmitted") {
            sent = count;
        } else if part.contains("received") {
            received = count;
        }
    }

    Some((sent?, received?))
}
