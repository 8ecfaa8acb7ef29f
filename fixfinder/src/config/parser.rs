//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::{ConfigFile, ConfigFileError};
use crate::engine::CacheMode;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [acquisition] section
    if let Some(section) = ini.section(Some("acquisition")) {
        if let Some(v) = number::<u64>(section, "acquisition", "freshness_secs")? {
            config.acquisition.freshness_secs = v;
        }
        if let Some(v) = section.get("cache_mode") {
            config.acquisition.cache_mode =
                v.parse::<CacheMode>()
                    .map_err(|_| ConfigFileError::InvalidValue {
                        section: "acquisition".to_string(),
                        key: "cache_mode".to_string(),
                        value: v.to_string(),
                        reason: "must be one of: fresh, any, live".to_string(),
                    })?;
        }
        if let Some(v) = number::<u64>(section, "acquisition", "default_deadline_ms")? {
            if v == 0 {
                return Err(invalid(
                    "acquisition",
                    "default_deadline_ms",
                    "0",
                    "must be greater than zero (leave empty for no deadline)",
                ));
            }
            config.acquisition.default_deadline_ms = Some(v);
        }
    }

    // [subscription] section
    if let Some(section) = ini.section(Some("subscription")) {
        if let Some(v) = number::<u64>(section, "subscription", "min_interval_secs")? {
            config.subscription.min_interval_secs = v;
        }
        if let Some(v) = number::<f64>(section, "subscription", "min_distance_meters")? {
            if !v.is_finite() || v < 0.0 {
                return Err(invalid(
                    "subscription",
                    "min_distance_meters",
                    &v.to_string(),
                    "must be a non-negative number of meters",
                ));
            }
            config.subscription.min_distance_meters = v;
        }
    }

    // [prompt] section
    if let Some(section) = ini.section(Some("prompt")) {
        if let Some(v) = number::<u64>(section, "prompt", "debounce_secs")? {
            config.prompt.debounce_secs = v;
        }
    }

    Ok(config)
}

/// Read an optional numeric key. Empty values count as absent.
fn number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError> {
    let Some(raw) = section.get(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| invalid(section_name, key, trimmed, "expected a number"))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(text).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_ini_is_default() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_partial_overlay() {
        let config = parse("[acquisition]\ncache_mode = any\n").unwrap();

        assert_eq!(config.acquisition.cache_mode, CacheMode::AcceptAny);
        assert_eq!(config.acquisition.freshness_secs, 60);
    }

    #[test]
    fn test_empty_deadline_means_none() {
        let config = parse("[acquisition]\ndefault_deadline_ms =\n").unwrap();
        assert!(config.acquisition.default_deadline_ms.is_none());
    }

    #[test]
    fn test_invalid_cache_mode() {
        let err = parse("[acquisition]\ncache_mode = maybe\n").unwrap_err();

        match err {
            ConfigFileError::InvalidValue { section, key, .. } => {
                assert_eq!(section, "acquisition");
                assert_eq!(key, "cache_mode");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_number() {
        let err = parse("[subscription]\nmin_interval_secs = soon\n").unwrap_err();
        assert!(err.to_string().contains("subscription.min_interval_secs"));
    }

    #[test]
    fn test_negative_distance_rejected() {
        assert!(parse("[subscription]\nmin_distance_meters = -3\n").is_err());
    }

    #[test]
    fn test_zero_deadline_rejected() {
        assert!(parse("[acquisition]\ndefault_deadline_ms = 0\n").is_err());
    }
}
