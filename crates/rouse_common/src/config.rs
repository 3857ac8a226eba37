//! Rouse configuration
//!
//! Machine identity, remote commands and timing. Every field defaults to
//! the built-in value, so a config file only needs the keys it changes.
//!
//! Search order: explicit path, `$ROUSE_CONFIG`, `~/.config/rouse/config.toml`,
//! `/etc/rouse/config.toml`, then defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::{Invocation, SshHop};
use crate::error::RouseError;

/// System-wide config file path
pub const SYSTEM_CONFIG_PATH: &str = "/etc/rouse/config.toml";

/// Environment override for the config file path
pub const CONFIG_ENV: &str = "ROUSE_CONFIG";

/// Gateway relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Overlay hostname of the relay
    #[serde(default = "default_relay_host")]
    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Wake-on-LAN program available on the relay
    #[serde(default = "default_wake_program")]
    pub wake_program: String,
}

fn default_relay_host() -> String {
    "gateway".to_string()
}

fn default_wake_program() -> String {
    "wakeonlan".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_relay_host(),
            user: None,
            wake_program: default_wake_program(),
        }
    }
}

/// The managed workstation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Stable overlay hostname once fully booted
    #[serde(default = "default_overlay_host")]
    pub overlay_host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// LAN address of the pre-boot interface, seen from the relay
    #[serde(default = "default_preboot_address")]
    pub preboot_address: String,

    /// Wake signal destination
    #[serde(default = "default_mac_address")]
    pub mac_address: String,

    #[serde(default = "default_target_poweroff")]
    pub poweroff_command: Vec<String>,
}

fn default_overlay_host() -> String {
    "workstation".to_string()
}

fn default_preboot_address() -> String {
    "192.168.1.20".to_string()
}

fn default_mac_address() -> String {
    "00:00:00:00:00:00".to_string()
}

fn default_target_poweroff() -> Vec<String> {
    vec!["sudo".into(), "systemctl".into(), "poweroff".into()]
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            overlay_host: default_overlay_host(),
            user: None,
            preboot_address: default_preboot_address(),
            mac_address: default_mac_address(),
            poweroff_command: default_target_poweroff(),
        }
    }
}

/// Pre-boot (disk unlock) interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrebootConfig {
    #[serde(default = "default_preboot_user")]
    pub user: String,

    #[serde(default = "default_preboot_port")]
    pub port: u16,

    /// Dedicated unlock key. The path is resolved on the relay.
    #[serde(default = "default_identity_file")]
    pub identity_file: String,

    #[serde(default = "default_preboot_poweroff")]
    pub poweroff_command: Vec<String>,
}

fn default_preboot_user() -> String {
    "root".to_string()
}

fn default_preboot_port() -> u16 {
    22
}

fn default_identity_file() -> String {
    "~/.ssh/unlock_ed25519".to_string()
}

fn default_preboot_poweroff() -> Vec<String> {
    vec!["poweroff".into()]
}

impl Default for PrebootConfig {
    fn default() -> Self {
        Self {
            user: default_preboot_user(),
            port: default_preboot_port(),
            identity_file: default_identity_file(),
            poweroff_command: default_preboot_poweroff(),
        }
    }
}

/// Mesh overlay client, run locally with privilege
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_logout_command")]
    pub logout_command: Vec<String>,

    #[serde(default = "default_login_command")]
    pub login_command: Vec<String>,
}

fn default_logout_command() -> Vec<String> {
    vec!["sudo".into(), "tailscale".into(), "logout".into()]
}

fn default_login_command() -> Vec<String> {
    vec!["sudo".into(), "tailscale".into(), "login".into()]
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            logout_command: default_logout_command(),
            login_command: default_login_command(),
        }
    }
}

/// Interactive unlock session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockConfig {
    /// Terminal launcher; the ssh chain is appended as trailing arguments
    #[serde(default = "default_terminal")]
    pub terminal: Vec<String>,

    /// Run on the pre-boot interface to prompt for the disk passphrase
    #[serde(default = "default_unlock_command")]
    pub command: Vec<String>,
}

fn default_terminal() -> Vec<String> {
    vec!["x-terminal-emulator".into(), "-e".into()]
}

fn default_unlock_command() -> Vec<String> {
    vec!["cryptroot-unlock".into()]
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self {
            terminal: default_terminal(),
            command: default_unlock_command(),
        }
    }
}

/// Timeouts, delays and retry bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Liveness check reply timeout
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// ssh connection setup timeout per hop
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Guard on non-interactive remote actions
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Pause after each overlay logout/login step
    #[serde(default = "default_recovery_settle")]
    pub recovery_settle_secs: u64,

    /// Interval between state polls while waiting on the target
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Polls of the pre-boot interface after a wake before giving up
    #[serde(default = "default_preboot_max_attempts")]
    pub preboot_max_attempts: u32,

    /// Pause after a power-off before re-resolving
    #[serde(default = "default_poweroff_settle")]
    pub poweroff_settle_secs: u64,
}

fn default_probe_timeout() -> u64 {
    1
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_command_timeout() -> u64 {
    30
}

fn default_recovery_settle() -> u64 {
    2
}

fn default_poll_interval() -> u64 {
    5
}

fn default_preboot_max_attempts() -> u32 {
    15
}

fn default_poweroff_settle() -> u64 {
    10
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: default_probe_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            command_timeout_secs: default_command_timeout(),
            recovery_settle_secs: default_recovery_settle(),
            poll_interval_secs: default_poll_interval(),
            preboot_max_attempts: default_preboot_max_attempts(),
            poweroff_settle_secs: default_poweroff_settle(),
        }
    }
}

impl TimingConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn recovery_settle(&self) -> Duration {
        Duration::from_secs(self.recovery_settle_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poweroff_settle(&self) -> Duration {
        Duration::from_secs(self.poweroff_settle_secs)
    }
}

/// Invocation journal written by rousectl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalConfig {
    #[serde(default = "default_journal_enabled")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_journal_enabled() -> bool {
    true
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: default_journal_enabled(),
            path: None,
        }
    }
}

/// Main Rouse configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouseConfig {
    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub preboot: PrebootConfig,

    #[serde(default)]
    pub overlay: OverlayConfig,

    #[serde(default)]
    pub unlock: UnlockConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub journal: JournalConfig,

    /// Where this config came from, `None` for built-in defaults
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl RouseConfig {
    /// Get default user config path: ~/.config/rouse/config.toml
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rouse").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. The other locations are optional and
    /// searched in order; the first one present wins.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Self::load_from(Path::new(&path));
            }
        }

        let candidates = Self::user_config_path()
            .into_iter()
            .chain(std::iter::once(PathBuf::from(SYSTEM_CONFIG_PATH)));
        for path in candidates {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load and validate a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: RouseConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Reject values the orchestrators can't work with
    pub fn validate(&self) -> std::result::Result<(), RouseError> {
        let hosts = [
            ("relay.host", &self.relay.host),
            ("relay.wake_program", &self.relay.wake_program),
            ("target.overlay_host", &self.target.overlay_host),
            ("target.preboot_address", &self.target.preboot_address),
            ("target.mac_address", &self.target.mac_address),
            ("preboot.user", &self.preboot.user),
        ];
        for (key, value) in hosts {
            if value.trim().is_empty() {
                return Err(RouseError::Config(format!("{} must not be empty", key)));
            }
        }

        let commands = [
            ("target.poweroff_command", &self.target.poweroff_command),
            ("preboot.poweroff_command", &self.preboot.poweroff_command),
            ("overlay.logout_command", &self.overlay.logout_command),
            ("overlay.login_command", &self.overlay.login_command),
            ("unlock.terminal", &self.unlock.terminal),
            ("unlock.command", &self.unlock.command),
        ];
        for (key, argv) in commands {
            if argv.first().map_or(true, |p| p.trim().is_empty()) {
                return Err(RouseError::Config(format!("{} must name a program", key)));
            }
        }

        if self.timing.preboot_max_attempts == 0 {
            return Err(RouseError::Config(
                "timing.preboot_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.timing.poll_interval_secs == 0 {
            return Err(RouseError::Config(
                "timing.poll_interval_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    // Hops and commands built from the identity above

    pub fn relay_hop(&self) -> SshHop {
        SshHop::new(&self.relay.host, self.timing.connect_timeout()).user(self.relay.user.clone())
    }

    pub fn target_hop(&self) -> SshHop {
        SshHop::new(&self.target.overlay_host, self.timing.connect_timeout())
            .user(self.target.user.clone())
    }

    /// Pre-boot interface, reached from the relay with the unlock key
    pub fn preboot_hop(&self) -> SshHop {
        SshHop::new(&self.target.preboot_address, self.timing.connect_timeout())
            .user(Some(self.preboot.user.clone()))
            .port(self.preboot.port)
            .identity_file(&self.preboot.identity_file)
    }

    pub fn wake_command(&self) -> Invocation {
        Invocation::new(&self.relay.wake_program).arg(&self.target.mac_address)
    }
}
