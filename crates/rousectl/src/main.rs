//! Rouse Control - operator CLI
//!
//! Queries, boots and shuts down the target host. This is the only place
//! that turns a failure into a process exit.

use clap::Parser;
use rouse_common::error::EXIT_CONFIG;
use rouse_common::{Context, RouseConfig, SystemClock, SystemRunner};
use std::time::Instant;
use tracing::debug;

use rousectl::cli::Cli;
use rousectl::commands;
use rousectl::logging::{self, LogEntry};

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let config = match RouseConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };
    debug!(
        "Configuration: {}",
        config
            .source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in defaults".to_string())
    );

    let runner = SystemRunner;
    let clock = SystemClock;
    let ctx = Context::new(&config, &runner, &clock);

    let started = Instant::now();
    let outcome = commands::dispatch(&cli.command, ctx);

    let entry = LogEntry::new(
        cli.command.name(),
        std::env::args().skip(1).collect(),
        started.elapsed(),
        &outcome,
    );
    match entry.write(&config.journal) {
        Ok(Some(path)) => debug!("Journal entry written to {}", path.display()),
        Ok(None) => {}
        Err(e) => debug!("Journal write failed: {}", e),
    }

    if let Err(e) = outcome {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}
