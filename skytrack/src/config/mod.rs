//! Configuration file support for `~/.skytrack/config.ini`.
//!
//! Settings structs live in [`settings`], parsing in [`parser`], and
//! serialization in [`writer`]. Every key is optional; missing keys keep
//! their defaults.
//!
//! # Example
//!
//! ```no_run
//! use skytrack::config::ConfigFile;
//!
//! let config = ConfigFile::load().unwrap();
//! let session = config.session_config();
//! assert!(session.poll_interval.as_secs() > 0);
//! ```

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    default_providers, CacheSettings, ConfigFile, EnrichmentSettings, EngineSettings,
    ProviderSettings, RateLimitSettings, DEFAULT_ENRICHMENT_TIMEOUT_MS,
};
