//! Logging for rousectl operations
//!
//! Two sinks: `tracing` diagnostics on stderr, and a JSONL journal with one
//! entry per invocation so past boots and shutdowns can be reviewed.

use chrono::Utc;
use rouse_common::config::JournalConfig;
use rouse_common::{RouseError, StateSnapshot};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Environment override for the journal path
pub const LOG_FILE_ENV: &str = "ROUSECTL_LOG_FILE";

/// Set up stderr diagnostics. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,rouse_common=info,rousectl=info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Journal entry for each rousectl invocation
#[derive(Debug, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 timestamp
    pub ts: String,

    /// Request ID (UUID)
    pub req_id: String,

    /// Command name
    pub command: String,

    /// Command arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Exit code
    pub exit_code: i32,

    /// Duration in milliseconds
    pub duration_ms: u64,

    /// Success flag
    pub ok: bool,

    /// Resolved state, for status queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<StateSnapshot>,

    /// Error details if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(
        command: &str,
        args: Vec<String>,
        elapsed: Duration,
        outcome: &Result<Option<StateSnapshot>, RouseError>,
    ) -> Self {
        let (exit_code, snapshot, error) = match outcome {
            Ok(snapshot) => (0, *snapshot, None),
            Err(e) => (
                e.exit_code(),
                None,
                Some(ErrorDetails {
                    code: e.code().to_string(),
                    message: e.to_string(),
                }),
            ),
        };

        Self {
            ts: Utc::now().to_rfc3339(),
            req_id: uuid::Uuid::new_v4().to_string(),
            command: command.to_string(),
            args,
            exit_code,
            duration_ms: elapsed.as_millis() as u64,
            ok: exit_code == 0,
            snapshot,
            error,
        }
    }

    /// Discover journal path
    ///
    /// Priority:
    /// 1. $ROUSECTL_LOG_FILE (explicit override)
    /// 2. `journal.path` from the config
    /// 3. $XDG_STATE_HOME/rouse/ctl.jsonl
    /// 4. ~/.local/state/rouse/ctl.jsonl
    pub fn discover_log_path(config: &JournalConfig) -> Option<PathBuf> {
        log_path_from(
            std::env::var(LOG_FILE_ENV).ok(),
            config.path.as_deref(),
            std::env::var("XDG_STATE_HOME").ok(),
            std::env::var("HOME").ok(),
        )
    }

    /// Append to the journal if enabled. Returns where it was written.
    pub fn write(&self, config: &JournalConfig) -> std::io::Result<Option<PathBuf>> {
        if !config.enabled {
            return Ok(None);
        }
        match Self::discover_log_path(config) {
            Some(path) => self.write_to_file(&path).map(|_| Some(path)),
            None => Ok(None),
        }
    }

    /// Append one JSON line, creating parent directories as needed
    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", json)
    }
}

fn log_path_from(
    env_override: Option<String>,
    configured: Option<&Path>,
    xdg_state: Option<String>,
    home: Option<String>,
) -> Option<PathBuf> {
    if let Some(path) = env_override.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }
    if let Some(state) = xdg_state.filter(|p| !p.is_empty()) {
        return Some(Path::new(&state).join("rouse").join("ctl.jsonl"));
    }
    home.map(|home| Path::new(&home).join(".local/state/rouse/ctl.jsonl"))
}
