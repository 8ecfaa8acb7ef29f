//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show`, and `config init`.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use fixfinder::config::{config_file_path, ConfigFile};

use super::common::load_config;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration
    Show {
        /// Configuration file (default: ~/.fixfinder/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        /// Target path (default: ~/.fixfinder/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show { config } => run_show(config.as_deref()),
        ConfigCommands::Init { force, config } => {
            let path = config.unwrap_or_else(config_file_path);
            run_init(&path, force)
        }
    }
}

fn run_path() -> Result<(), CliError> {
    let path = config_file_path();
    println!("{}", path.display());
    if !path.exists() {
        println!("(file does not exist, defaults are in effect)");
    }
    Ok(())
}

fn run_show(path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(path)?;
    let deadline = match config.acquisition.default_deadline_ms {
        Some(ms) => format!("{} ms", ms),
        None => "(not set)".to_string(),
    };

    println!("[acquisition]");
    println!("  freshness_secs      = {}", config.acquisition.freshness_secs);
    println!("  cache_mode          = {}", config.acquisition.cache_mode);
    println!("  default_deadline_ms = {}", deadline);
    println!();
    println!("[subscription]");
    println!("  min_interval_secs   = {}", config.subscription.min_interval_secs);
    println!("  min_distance_meters = {}", config.subscription.min_distance_meters);
    println!();
    println!("[prompt]");
    println!("  debounce_secs       = {}", config.prompt.debounce_secs);

    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "'{}' already exists (use --force to overwrite)",
            path.display()
        )));
    }

    ConfigFile::default().save_to(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        run_init(&path, false).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, ConfigFile::default());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[acquisition]\nfreshness_secs = 5\n").unwrap();

        assert!(matches!(run_init(&path, false), Err(CliError::Config(_))));

        run_init(&path, true).unwrap();
        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded.acquisition.freshness_secs, 60);
    }
}
