//! Resolve command - one lookup, printed as JSON.

use std::path::PathBuf;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the resolve command.
pub fn run(config_path: Option<PathBuf>, flight: &str) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("resolve");

    let engine = runner.create_engine()?;
    let sample = runner.runtime().block_on(engine.resolve(flight))?;

    match serde_json::to_string_pretty(&sample) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!(error = %e, "Failed to encode sample"),
    }
    Ok(())
}
