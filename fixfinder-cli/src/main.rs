//! fixfinder CLI - Command-line interface
//!
//! Drives the acquisition engine against a scripted host so every branch of
//! the state machine can be exercised from a terminal.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fixfinder::logging::{default_log_dir, default_log_file, init_logging};

use commands::compare::CompareArgs;
use commands::config::ConfigCommands;
use commands::locate::LocateArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "fixfinder")]
#[command(version = fixfinder::VERSION)]
#[command(about = "Best-effort current position from precise, network and passive sources", long_about = None)]
struct Cli {
    /// Directory for the log file
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Also print log output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire one fix from the simulated host
    Locate(LocateArgs),

    /// Decide whether a candidate fix replaces the held one
    Compare(CompareArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Locate(args) => {
            let log_dir = cli
                .log_dir
                .unwrap_or_else(|| PathBuf::from(default_log_dir()));
            match init_logging(&log_dir, default_log_file(), cli.verbose) {
                Ok(guard) => {
                    tracing::debug!(path = %guard.path().display(), "Logging initialized");
                    let result = commands::locate::run(args);
                    drop(guard);
                    result
                }
                Err(e) => Err(CliError::LoggingInit(e.to_string())),
            }
        }
        Commands::Compare(args) => commands::compare::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        e.exit();
    }
}
