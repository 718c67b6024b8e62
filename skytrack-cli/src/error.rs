//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use skytrack::config::ConfigFileError;
use skytrack::orchestrator::ResolveError;
use skytrack::EngineError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be read or written
    Config(ConfigFileError),
    /// Config file exists and --force was not given
    ConfigExists(PathBuf),
    /// Failed to build the tracking engine
    Engine(EngineError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// A one-shot resolution failed
    Resolve(ResolveError),
    /// Failed to install the Ctrl+C handler
    Signal(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::ConfigExists(_) => {
                eprintln!();
                eprintln!("Use --force to overwrite it with defaults.");
            }
            CliError::Resolve(ResolveError::AllProvidersExhausted { failures }) => {
                eprintln!();
                eprintln!("Provider results:");
                for failure in failures {
                    eprintln!("  - {}", failure);
                }
                eprintln!();
                eprintln!("The flight may not be airborne, or may not be covered by any provider.");
            }
            CliError::Resolve(ResolveError::RateLimited { retry_after }) => {
                eprintln!();
                eprintln!("Try again in {} seconds.", retry_after.as_secs().max(1));
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::ConfigExists(path) => {
                write!(f, "Config file already exists: {}", path.display())
            }
            CliError::Engine(e) => write!(f, "Failed to start tracking engine: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Resolve(e) => write!(f, "Resolution failed: {}", e),
            CliError::Signal(msg) => write!(f, "Failed to set signal handler: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Engine(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Resolve(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        CliError::Engine(e)
    }
}

impl From<ResolveError> for CliError {
    fn from(e: ResolveError) -> Self {
        CliError::Resolve(e)
    }
}
