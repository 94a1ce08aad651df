use std::{collections::BTreeMap, fs, io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::judge::HitWindows;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file")]
    Io(#[from] io::Error),

    #[error("Malformed config")]
    Json(#[from] serde_json::Error),

    #[error("Hit windows must be positive and strictly increasing")]
    InvalidWindows,
}

/// Settings that affect a play session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayConfig {
    /// Added to every judgment delta, in milliseconds.
    pub judge_offset: f64,
    /// Added to the lead-in, in milliseconds.
    pub universal_offset: f64,
    /// Lead-in before the first beat, in milliseconds.
    pub play_delay: f64,
    /// Time after the last note before the session ends, in milliseconds.
    pub end_delay: f64,
    pub autoplay: bool,
    pub hit_windows: HitWindows,
    pub key_bindings: KeyBindings,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            judge_offset: 0.0,
            universal_offset: 90.0,
            play_delay: 3000.0,
            end_delay: 3000.0,
            autoplay: false,
            hit_windows: HitWindows::default(),
            key_bindings: KeyBindings::default(),
        }
    }
}

impl PlayConfig {
    /// Loads config from `path`. A missing file gives the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Fields missing from `json` keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;
        config.key_bindings.fill_defaults();
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.hit_windows.is_valid() {
            return Err(ConfigError::InvalidWindows);
        }
        Ok(())
    }
}

/// Physical key names per lane, keyed by key count.
///
/// Key names are the `Debug` names of winit's `KeyCode`, e.g. `KeyZ` or `Space`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyBindings(BTreeMap<usize, Vec<String>>);

const DEFAULT_BINDINGS: [&[&str]; 9] = [
    &["Space"],
    &["KeyX", "KeyM"],
    &["KeyX", "Space", "KeyM"],
    &["KeyZ", "KeyX", "KeyM", "Comma"],
    &["KeyZ", "KeyX", "Space", "KeyM", "Comma"],
    &["KeyZ", "KeyX", "KeyC", "KeyN", "KeyM", "Comma"],
    &["KeyZ", "KeyX", "KeyC", "Space", "KeyN", "KeyM", "Comma"],
    &[
        "KeyZ",
        "KeyX",
        "KeyC",
        "ShiftLeft",
        "Space",
        "KeyN",
        "KeyM",
        "Comma",
    ],
    &[
        "KeyZ", "KeyX", "KeyC", "KeyV", "Space", "KeyB", "KeyN", "KeyM", "Comma",
    ],
];

impl Default for KeyBindings {
    fn default() -> Self {
        let bindings = DEFAULT_BINDINGS
            .iter()
            .enumerate()
            .map(|(index, keys)| (index + 1, keys.iter().map(|key| key.to_string()).collect()))
            .collect();
        Self(bindings)
    }
}

impl KeyBindings {
    /// Key names of every lane for `key_count` keys, if bound.
    pub fn lanes(&self, key_count: usize) -> Option<&[String]> {
        self.0.get(&key_count).map(Vec::as_slice)
    }

    /// Lane bound to `key` for a chart with `key_count` keys.
    pub fn lane_for(&self, key_count: usize, key: &str) -> Option<usize> {
        self.lanes(key_count)?
            .iter()
            .position(|bound| bound == key)
    }

    pub fn set(&mut self, key_count: usize, keys: Vec<String>) {
        self.0.insert(key_count, keys);
    }

    /// Adds the default layout for every key count that has none.
    pub fn fill_defaults(&mut self) {
        for (key_count, keys) in Self::default().0 {
            self.0.entry(key_count).or_insert(keys);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = PlayConfig::default();
        assert_eq!(config.judge_offset, 0.0);
        assert_eq!(config.universal_offset, 90.0);
        assert_eq!(config.play_delay, 3000.0);
        assert_eq!(config.end_delay, 3000.0);
        assert!(!config.autoplay);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_bindings_match_key_counts() {
        let bindings = KeyBindings::default();
        for key_count in 1..=9 {
            assert_eq!(bindings.lanes(key_count).unwrap().len(), key_count);
        }
        assert!(bindings.lanes(10).is_none());
    }

    #[test]
    fn test_lane_for() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.lane_for(4, "KeyZ"), Some(0));
        assert_eq!(bindings.lane_for(4, "Comma"), Some(3));
        assert_eq!(bindings.lane_for(4, "Space"), None);
        assert_eq!(bindings.lane_for(7, "Space"), Some(3));
        assert_eq!(bindings.lane_for(12, "KeyZ"), None);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PlayConfig::from_json(
            r#"{ "judge_offset": -12.5, "key_bindings": { "4": ["KeyD", "KeyF", "KeyJ", "KeyK"] } }"#,
        )
        .unwrap();

        assert_eq!(config.judge_offset, -12.5);
        assert_eq!(config.play_delay, 3000.0);
        assert_eq!(config.hit_windows, HitWindows::default());
        assert_eq!(config.key_bindings.lane_for(4, "KeyJ"), Some(2));
        assert_eq!(config.key_bindings.lane_for(5, "Space"), Some(2));
    }

    #[test]
    fn test_invalid_windows_rejected() {
        let result = PlayConfig::from_json(r#"{ "hit_windows": { "ok": { "window": 10.0, "score": 50 } } }"#);
        assert!(matches!(result, Err(ConfigError::InvalidWindows)));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            PlayConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
