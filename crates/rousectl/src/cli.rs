//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rouse CLI
#[derive(Parser, Debug)]
#[command(name = "rousectl")]
#[command(about = "Rouse - boot and shut down a relay-fronted workstation", long_about = None)]
#[command(version = env!("ROUSE_VERSION"))]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (overrides $ROUSE_CONFIG and the default locations)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print progress diagnostics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Show target and relay state
    Status {
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Bring the target up (wake, then unlock)
    Boot,

    /// Power the target off
    Shutdown,

    /// Show the effective configuration
    Config {
        /// Print only where the configuration was loaded from
        #[arg(long)]
        path: bool,
    },
}

impl Commands {
    /// Name recorded in the invocation journal
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Status { .. } => "status",
            Commands::Boot => "boot",
            Commands::Shutdown => "shutdown",
            Commands::Config { .. } => "config",
        }
    }
}
