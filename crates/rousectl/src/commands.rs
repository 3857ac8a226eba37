//! Command handlers
//!
//! Each handler runs one core operation. Failures come back as
//! [`RouseError`] for `main` to turn into a diagnostic and exit code.

use rouse_common::{
    BootOrchestrator, Context, RouseConfig, RouseError, ShutdownOrchestrator, StateResolver,
    StateSnapshot,
};

use crate::cli::Commands;
use crate::output;

/// Run a command. Returns the snapshot when one was resolved for output.
pub fn dispatch(command: &Commands, ctx: Context<'_>) -> Result<Option<StateSnapshot>, RouseError> {
    match command {
        Commands::Status { json } => status(ctx, *json).map(Some),
        Commands::Boot => BootOrchestrator::new(ctx).boot().map(|_| None),
        Commands::Shutdown => ShutdownOrchestrator::new(ctx).shutdown().map(|_| None),
        Commands::Config { path } => {
            println!("{}", config_text(ctx.config, *path)?);
            Ok(None)
        }
    }
}

fn status(ctx: Context<'_>, json: bool) -> Result<StateSnapshot, RouseError> {
    let snapshot = StateResolver::new(ctx).resolve()?;
    if json {
        println!("{}", output::render_json(&snapshot));
    } else {
        println!("{}", output::render_text(&snapshot));
    }
    Ok(snapshot)
}

/// Effective configuration as TOML, or just its source
pub fn config_text(config: &RouseConfig, path_only: bool) -> Result<String, RouseError> {
    if path_only {
        return Ok(match &config.source {
            Some(path) => path.display().to_string(),
            None => "(built-in defaults)".to_string(),
        });
    }
    config
        .to_toml()
        .map(|text| text.trim_end().to_string())
        .map_err(|e| RouseError::Config(format!("{:#}", e)))
}
