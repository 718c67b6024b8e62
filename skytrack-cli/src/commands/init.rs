//! Init command - write the default configuration file.

use std::path::{Path, PathBuf};

use skytrack::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
pub fn run(config_path: Option<PathBuf>, force: bool) -> Result<(), CliError> {
    let path = config_path.unwrap_or_else(config_file_path);
    write_default(&path, force)?;

    println!("Configuration file: {}", path.display());
    println!();
    println!("Edit this file to add providers, API keys and rate limits.");
    println!("With no [provider.*] sections the free ADS-B feeds are used.");
    Ok(())
}

fn write_default(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::ConfigExists(path.to_path_buf()));
    }
    ConfigFile::default().save_to(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");

        write_default(&path, false).unwrap();
        assert_eq!(ConfigFile::load_from(&path).unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[engine]\npoll_interval_secs = 99\n").unwrap();

        assert!(matches!(write_default(&path, false), Err(CliError::ConfigExists(_))));
        assert_eq!(
            ConfigFile::load_from(&path).unwrap().engine.poll_interval_secs,
            99
        );

        write_default(&path, true).unwrap();
        assert_eq!(
            ConfigFile::load_from(&path).unwrap().engine.poll_interval_secs,
            15
        );
    }
}
