//! Configuration file handling for ~/.fixfinder/config.ini.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::availability::DEFAULT_PROMPT_DEBOUNCE_WINDOW;
use crate::engine::{CacheMode, EngineConfig, DEFAULT_FRESHNESS_WINDOW};
use crate::platform::{
    SubscriptionParams, DEFAULT_MIN_UPDATE_DISTANCE_METERS, DEFAULT_MIN_UPDATE_INTERVAL,
};

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

// =============================================================================
// Settings
// =============================================================================

/// `[acquisition]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionSettings {
    pub freshness_secs: u64,
    pub cache_mode: CacheMode,
    pub default_deadline_ms: Option<u64>,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            freshness_secs: DEFAULT_FRESHNESS_WINDOW.as_secs(),
            cache_mode: CacheMode::default(),
            default_deadline_ms: None,
        }
    }
}

/// `[subscription]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionSettings {
    pub min_interval_secs: u64,
    pub min_distance_meters: f64,
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            min_interval_secs: DEFAULT_MIN_UPDATE_INTERVAL.as_secs(),
            min_distance_meters: DEFAULT_MIN_UPDATE_DISTANCE_METERS,
        }
    }
}

/// `[prompt]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSettings {
    pub debounce_secs: u64,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            debounce_secs: DEFAULT_PROMPT_DEBOUNCE_WINDOW.as_secs(),
        }
    }
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub acquisition: AcquisitionSettings,
    pub subscription: SubscriptionSettings,
    pub prompt: PromptSettings,
}

impl ConfigFile {
    /// Load configuration from the default path (~/.fixfinder/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Engine configuration described by this file.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_freshness_window(Duration::from_secs(self.acquisition.freshness_secs))
            .with_cache_mode(self.acquisition.cache_mode)
            .with_default_deadline(self.acquisition.default_deadline_ms.map(Duration::from_millis))
            .with_subscription(SubscriptionParams {
                min_interval: Duration::from_secs(self.subscription.min_interval_secs),
                min_distance_meters: self.subscription.min_distance_meters,
            })
            .with_prompt_debounce_window(Duration::from_secs(self.prompt.debounce_secs))
    }
}

/// Get the path to the config directory (~/.fixfinder).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fixfinder")
}

/// Get the path to the config file (~/.fixfinder/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.acquisition.freshness_secs, 60);
        assert_eq!(config.acquisition.cache_mode, CacheMode::Fresh);
        assert!(config.acquisition.default_deadline_ms.is_none());
        assert_eq!(config.subscription.min_interval_secs, 60);
        assert_eq!(config.subscription.min_distance_meters, 10.0);
        assert_eq!(config.prompt.debounce_secs, 60);
    }

    #[test]
    fn test_default_config_matches_engine_defaults() {
        assert_eq!(ConfigFile::default().engine_config(), EngineConfig::default());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("absent.ini")).unwrap();

        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.acquisition.cache_mode = CacheMode::LiveOnly;
        config.acquisition.default_deadline_ms = Some(2_500);
        config.subscription.min_distance_meters = 25.5;
        config.prompt.debounce_secs = 90;
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_engine_config_conversion() {
        let mut config = ConfigFile::default();
        config.acquisition.freshness_secs = 5;
        config.acquisition.default_deadline_ms = Some(750);

        let engine = config.engine_config();
        assert_eq!(engine.freshness_window, Duration::from_secs(5));
        assert_eq!(engine.default_deadline, Some(Duration::from_millis(750)));
    }

    #[test]
    fn test_config_path_under_home() {
        let path = config_file_path();
        assert!(path.ends_with(".fixfinder/config.ini"));
    }
}
