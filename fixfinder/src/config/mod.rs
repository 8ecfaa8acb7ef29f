//! User configuration for fixfinder.
//!
//! Settings are read from `~/.fixfinder/config.ini`. A missing file means
//! defaults; a present file overlays only the keys it contains.
//!
//! ```text
//! [acquisition]
//! freshness_secs = 60
//! cache_mode = fresh
//! default_deadline_ms =
//!
//! [subscription]
//! min_interval_secs = 60
//! min_distance_meters = 10
//!
//! [prompt]
//! debounce_secs = 60
//! ```
//!
//! # Example
//!
//! ```ignore
//! use fixfinder::config::ConfigFile;
//!
//! let engine_config = ConfigFile::load()?.engine_config();
//! ```

mod file;
mod parser;
mod writer;

pub use file::{
    config_directory, config_file_path, AcquisitionSettings, ConfigFile, ConfigFileError,
    PromptSettings, SubscriptionSettings,
};
