//! SkyTrack CLI - Command-line interface
//!
//! A thin composition root over the `skytrack` library: it loads the config
//! file, installs logging, builds a tracking engine and prints what it sees.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "skytrack")]
#[command(version, about = "Live flight tracking from multiple telemetry providers", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.skytrack/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a commented default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Resolve a flight once and print the sample as JSON
    Resolve {
        /// Callsign (e.g. BAW117) or icao24:<hex> (e.g. icao24:4ca7b3)
        flight: String,
    },

    /// Track a flight, printing live and extrapolated positions
    Track {
        /// Callsign (e.g. BAW117) or icao24:<hex> (e.g. icao24:4ca7b3)
        flight: String,

        /// Stop after this many seconds (default: until Ctrl+C)
        #[arg(long)]
        duration: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { force } => commands::init::run(cli.config, force),
        Commands::Resolve { flight } => commands::resolve::run(cli.config, &flight),
        Commands::Track { flight, duration } => {
            commands::track::run(cli.config, &flight, duration)
        }
    };

    if let Err(e) = result {
        e.exit();
    }
}
