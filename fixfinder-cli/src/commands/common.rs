//! Common types and utilities shared across CLI commands.

use std::path::Path;

use clap::ValueEnum;
use fixfinder::config::ConfigFile;
use fixfinder::{CacheMode, Fix, FixSource};

use crate::error::CliError;

/// Positioning source selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SourceArg {
    /// Satellite positioning
    Precise,
    /// Network-assisted positioning
    Network,
    /// Passive fixes from other clients
    Passive,
}

impl From<SourceArg> for FixSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Precise => FixSource::Precise,
            SourceArg::Network => FixSource::Network,
            SourceArg::Passive => FixSource::Passive,
        }
    }
}

/// Cache policy selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CacheModeArg {
    /// Use a cached fix younger than the freshness window
    Fresh,
    /// Use any cached fix regardless of age
    Any,
    /// Ignore cached fixes
    Live,
}

impl From<CacheModeArg> for CacheMode {
    fn from(arg: CacheModeArg) -> Self {
        match arg {
            CacheModeArg::Fresh => CacheMode::Fresh,
            CacheModeArg::Any => CacheMode::AcceptAny,
            CacheModeArg::Live => CacheMode::LiveOnly,
        }
    }
}

/// Load the configuration file from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "config file '{}' does not exist",
                    path.display()
                )));
            }
            ConfigFile::load_from(path)?
        }
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Print a fix in human-readable form.
pub fn print_fix(fix: &Fix) {
    println!("Location found:");
    println!("  Latitude:  {:.6}", fix.latitude());
    println!("  Longitude: {:.6}", fix.longitude());
    println!("  Accuracy:  {:.1} m", fix.accuracy());
    println!("  Source:    {}", fix.source());
    if let Some(elapsed) = fix.request_duration() {
        println!("  Elapsed:   {} ms", elapsed.as_millis());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_source_conversion() {
        assert_eq!(FixSource::from(SourceArg::Network), FixSource::Network);
    }

    #[test]
    fn test_cache_mode_conversion() {
        assert_eq!(CacheMode::from(CacheModeArg::Any), CacheMode::AcceptAny);
        assert_eq!(CacheMode::from(CacheModeArg::Live), CacheMode::LiveOnly);
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = load_config(Some(&temp.path().join("missing.ini")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[acquisition]\ncache_mode = live\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.acquisition.cache_mode, CacheMode::LiveOnly);
    }
}
