//! INI serialization logic for converting `ConfigFile` → INI string.

use super::file::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let default_deadline_ms = config
        .acquisition
        .default_deadline_ms
        .map(|ms| ms.to_string())
        .unwrap_or_default();

    format!(
        r#"[acquisition]
; Maximum age (seconds) of a cached fix returned without waiting for a live one.
freshness_secs = {freshness_secs}
; Cache policy:
;   fresh - use a cached fix younger than freshness_secs
;   any   - use any cached fix regardless of age
;   live  - ignore cached fixes and always wait for a live fix
cache_mode = {cache_mode}
; Deadline (milliseconds) used when none is given. Empty = no deadline.
default_deadline_ms = {default_deadline_ms}

[subscription]
; Minimum interval (seconds) between live updates.
min_interval_secs = {min_interval_secs}
; Minimum distance (meters) between live updates.
min_distance_meters = {min_distance_meters}

[prompt]
; Minimum time (seconds) between two "enable high accuracy" prompts.
debounce_secs = {debounce_secs}
"#,
        freshness_secs = config.acquisition.freshness_secs,
        cache_mode = config.acquisition.cache_mode,
        default_deadline_ms = default_deadline_ms,
        min_interval_secs = config.subscription.min_interval_secs,
        min_distance_meters = config.subscription.min_distance_meters,
        debounce_secs = config.prompt.debounce_secs,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_contains_every_section() {
        let text = to_config_string(&ConfigFile::default());

        assert!(text.contains("[acquisition]"));
        assert!(text.contains("[subscription]"));
        assert!(text.contains("[prompt]"));
        assert!(text.contains("cache_mode = fresh"));
        assert!(text.contains("default_deadline_ms = \n"));
    }
}
