//! Shared setup for commands that talk to providers.

use std::path::{Path, PathBuf};

use skytrack::config::{config_file_path, ConfigFile};
use skytrack::logging::{default_log_dir, default_log_file, init_logging, LoggingGuard};
use skytrack::TrackingEngine;
use tokio::runtime::Runtime;

use crate::error::CliError;

/// Loads config, installs logging and owns the tokio runtime.
pub struct CliRunner {
    config: ConfigFile,
    config_path: PathBuf,
    runtime: Runtime,
    _logging: LoggingGuard,
}

impl CliRunner {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, CliError> {
        let logging = init_logging(&default_log_dir(), default_log_file())
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let config_path = config_path.unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&config_path)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;

        Ok(Self {
            config,
            config_path,
            runtime,
            _logging: logging,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Logs where configuration came from.
    pub fn log_startup(&self, command: &str) {
        tracing::info!(
            command,
            config = %self.config_path.display(),
            providers = self.config.providers.len(),
            "SkyTrack starting"
        );
    }

    /// Builds an engine from the loaded config on this runner's runtime.
    pub fn create_engine(&self) -> Result<TrackingEngine, CliError> {
        let engine = self
            .runtime
            .block_on(TrackingEngine::from_config(&self.config))?;
        Ok(engine)
    }
}
