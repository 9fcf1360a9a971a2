use std::env;

use serde::Deserialize;

use crate::error::{Result, SensorError};

// ─── Environment keys ────────────────────────────────────────────

pub const ENV_HANDLERS: &str = "SENSOR_HANDLERS";
pub const ENV_REQUIRE_URLS: &str = "SENSOR_REQUIRE_URLS";
pub const ENV_TIME_CONDITION_MS: &str = "SENSOR_TIME_CONDITION_MS";

/// Pages slower than this are always reported.
pub const DEFAULT_TIME_CONDITION_MS: u64 = 1_000;

/// Sensor settings shared by every request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Handler identifiers, resolved through the handler registry.
    pub handlers: Vec<String>,
    /// URL fragments that force a page to be reported.
    pub require_urls: Vec<String>,
    /// Duration threshold in milliseconds (inclusive).
    pub time_condition_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            handlers: vec!["apache".into()],
            require_urls: Vec::new(),
            time_condition_ms: DEFAULT_TIME_CONDITION_MS,
        }
    }
}

impl SensorConfig {
    /// Defaults overridden by the `SENSOR_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injected variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_HANDLERS) {
            config.handlers = split_list(&raw);
        }
        if let Some(raw) = lookup(ENV_REQUIRE_URLS) {
            config.require_urls = split_list(&raw);
        }
        if let Some(raw) = lookup(ENV_TIME_CONDITION_MS) {
            config.time_condition_ms =
                raw.trim().parse().map_err(|e| SensorError::Config {
                    key: ENV_TIME_CONDITION_MS.into(),
                    message: format!("{raw:?}: {e}"),
                })?;
        }

        Ok(config)
    }
}

/// Comma-separated list, blanks dropped.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = SensorConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, SensorConfig::default());
    }

    #[test]
    fn reads_lists_and_threshold() {
        let config = SensorConfig::from_lookup(lookup_from(&[
            (ENV_HANDLERS, "apache, html"),
            (ENV_REQUIRE_URLS, "/course/view.php,,/admin/ "),
            (ENV_TIME_CONDITION_MS, " 250 "),
        ]))
        .unwrap();

        assert_eq!(config.handlers, ["apache", "html"]);
        assert_eq!(config.require_urls, ["/course/view.php", "/admin/"]);
        assert_eq!(config.time_condition_ms, 250);
    }

    #[test]
    fn bad_threshold_is_a_config_error() {
        let err = SensorConfig::from_lookup(lookup_from(&[(ENV_TIME_CONDITION_MS, "soon")]))
            .unwrap_err();
        assert!(matches!(err, SensorError::Config { ref key, .. } if key == ENV_TIME_CONDITION_MS));
    }

    #[test]
    fn deserializes_partial_json() {
        let config: SensorConfig =
            serde_json::from_str(r#"{"require_urls":["/quiz/"],"time_condition_ms":50}"#).unwrap();
        assert_eq!(config.handlers, ["apache"]);
        assert_eq!(config.require_urls, ["/quiz/"]);
        assert_eq!(config.time_condition_ms, 50);
    }
}
