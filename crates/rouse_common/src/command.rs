//! Command execution facility
//!
//! Every remote action is an argv [`Invocation`]. Remote hops wrap an
//! invocation into an `ssh` invocation whose last argument is the inner
//! command line, shell-quoted, so the same wrapper nests for the
//! local -> relay -> pre-boot chain.

use std::fmt;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{Result, RouseError};

/// How often the runner checks a child against its deadline
const WAIT_POLL_STEP: Duration = Duration::from_millis(20);

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build from a configured argv. Returns `None` for an empty argv.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).args(args.iter().cloned()))
    }

    /// Run `inner` on the far side of `hop`
    pub fn over(hop: &SshHop, inner: &Invocation) -> Self {
        Self::new("ssh")
            .args(hop.options())
            .arg(hop.destination())
            .arg(inner.to_command_line())
    }

    /// Append `inner` as trailing arguments (terminal `-e` style launchers)
    pub fn then(self, inner: &Invocation) -> Self {
        self.arg(inner.program.clone()).args(inner.args.iter().cloned())
    }

    /// Shell-quoted command line, safe to hand to a remote shell
    pub fn to_command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|word| shell_quote(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_command_line())
    }
}

/// Quote a word for a POSIX shell. Plain words pass through untouched.
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// One secure-shell hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshHop {
    pub host: String,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<String>,
    pub connect_timeout: Duration,
    /// Never prompt; fail instead
    pub batch: bool,
    /// Allocate a terminal for interactive sessions
    pub tty: bool,
}

impl SshHop {
    pub fn new(host: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            user: None,
            port: None,
            identity_file: None,
            connect_timeout,
            batch: true,
            tty: false,
        }
    }

    pub fn user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn identity_file(mut self, path: impl Into<String>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Interactive hop: terminal allocated, prompts allowed
    pub fn interactive(mut self) -> Self {
        self.tty = true;
        self.batch = false;
        self
    }

    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    fn options(&self) -> Vec<String> {
        let mut opts = Vec::new();
        if self.tty {
            opts.push("-t".to_string());
        }
        if self.batch {
            opts.push("-o".to_string());
            opts.push("BatchMode=yes".to_string());
        }
        opts.push("-o".to_string());
        opts.push(format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)));
        if let Some(port) = self.port {
            opts.push("-p".to_string());
            opts.push(port.to_string());
        }
        if let Some(identity) = &self.identity_file {
            opts.push("-i".to_string());
            opts.push(identity.clone());
        }
        opts
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(code: i32, stdout: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// One-line description for diagnostics
    pub fn summary(&self) -> String {
        let stderr = self.stderr.trim();
        match (self.code, stderr.is_empty()) {
            (Some(code), true) => format!("exit {}", code),
            (Some(code), false) => format!("exit {}: {}", code, stderr),
            (None, _) => "terminated by signal".to_string(),
        }
    }
}

/// Remote-command execution facility
pub trait CommandRunner {
    /// Run to completion. `timeout` bounds the whole run; the child is
    /// killed and [`RouseError::Timeout`] returned when it elapses.
    fn run(&self, invocation: &Invocation, timeout: Option<Duration>) -> Result<CommandOutput>;

    /// Start without waiting (user-facing terminals)
    fn spawn_detached(&self, invocation: &Invocation) -> Result<()>;
}

/// Runs commands as local child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation, timeout: Option<Duration>) -> Result<CommandOutput> {
        debug!("Executing: {}", invocation);

        let spawn_error = |source| RouseError::Spawn {
            command: invocation.to_string(),
            source,
        };

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let deadline = timeout.map(|t| (Instant::now() + t, t));

        let status = loop {
            if let Some(status) = child.try_wait().map_err(spawn_error)? {
                break status;
            }
            if let Some((deadline, after)) = deadline {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RouseError::Timeout {
                        command: invocation.to_string(),
                        after,
                    });
                }
            }
            std::thread::sleep(WAIT_POLL_STEP);
        };

        Ok(CommandOutput {
            code: status.code(),
            stdout: stdout.map(collect).unwrap_or_default(),
            stderr: stderr.map(collect).unwrap_or_default(),
        })
    }

    fn spawn_detached(&self, invocation: &Invocation) -> Result<()> {
        debug!("Launching: {}", invocation);

        Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|source| RouseError::Launch {
                command: invocation.to_string(),
                source,
            })
    }
}

/// Read a pipe on its own thread so a chatty child can't block on a full buffer
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(host: &str) -> SshHop {
        SshHop::new(host, Duration::from_secs(5))
    }

    #[test]
    fn test_shell_quote_plain_words() {
        assert_eq!(shell_quote("ping"), "ping");
        assert_eq!(shell_quote("192.168.1.20"), "192.168.1.20");
        assert_eq!(shell_quote("root@host"), "root@host");
    }

    #[test]
    fn test_shell_quote_special_words() {
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_single_hop() {
        let inner = Invocation::new("ping").args(["-c", "1", "10.0.0.5"]);
        let cmd = Invocation::over(&hop("gateway"), &inner);

        assert_eq!(cmd.program, "ssh");
        assert_eq!(
            cmd.args,
            vec![
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=5",
                "gateway",
                "ping -c 1 10.0.0.5"
            ]
        );
    }

    #[test]
    fn test_nested_hops_quote_each_level() {
        let preboot = hop("10.0.0.5")
            .user(Some("root".to_string()))
            .port(2222)
            .identity_file("/home/op/.ssh/unlock key");
        let inner = Invocation::over(&preboot, &Invocation::new("poweroff"));
        let outer = Invocation::over(&hop("gateway"), &inner);

        let remote = outer.args.last().unwrap();
        assert!(remote.starts_with("ssh -o BatchMode=yes -o ConnectTimeout=5 -p 2222 -i "));
        assert!(remote.contains("'/home/op/.ssh/unlock key'"));
        assert!(remote.ends_with("root@10.0.0.5 poweroff"));
    }

    #[test]
    fn test_interactive_hop_allocates_tty() {
        let cmd = Invocation::over(&hop("gateway").interactive(), &Invocation::new("sh"));
        assert_eq!(cmd.args[0], "-t");
        assert!(!cmd.args.iter().any(|a| a == "BatchMode=yes"));
    }

    #[test]
    fn test_from_argv() {
        let argv = vec!["sudo".to_string(), "tailscale".to_string(), "logout".to_string()];
        let cmd = Invocation::from_argv(&argv).unwrap();
        assert_eq!(cmd.program, "sudo");
        assert_eq!(cmd.to_string(), "sudo tailscale logout");
        assert!(Invocation::from_argv(&[]).is_none());
    }

    #[test]
    fn test_output_summary() {
        let mut out = CommandOutput::new(1, "");
        assert_eq!(out.summary(), "exit 1");
        out.stderr = "Permission denied\n".to_string();
        assert_eq!(out.summary(), "exit 1: Permission denied");
        assert!(!out.success());
    }

    #[test]
    fn test_system_runner_captures_output() {
        let out = SystemRunner
            .run(&Invocation::new("sh").args(["-c", "echo hello"]), None)
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn test_system_runner_times_out() {
        let err = SystemRunner
            .run(
                &Invocation::new("sleep").arg("5"),
                Some(Duration::from_millis(100)),
            )
            .unwrap_err();
        assert!(matches!(err, RouseError::Timeout { .. }));
    }

    #[test]
    fn test_system_runner_missing_program() {
        let err = SystemRunner
            .run(&Invocation::new("rouse-no-such-program"), None)
            .unwrap_err();
        assert!(matches!(err, RouseError::Spawn { .. }));
    }
}
