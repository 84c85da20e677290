use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::persistence::DEFAULT_STORAGE_KEY;

pub const DEFAULT_STORE_DIR: &str = ".cvbuilder";
pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a whole number of milliseconds, got '{value}'")]
    InvalidDebounce { key: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Runtime configuration loaded from environment variables.
/// Every variable is optional.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub store_dir: PathBuf,
    pub storage_key: String,
    pub save_debounce: Duration,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            save_debounce: Duration::from_millis(DEFAULT_SAVE_DEBOUNCE_MS),
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let storage_key = match lookup("CVBUILDER_STORAGE_KEY") {
            Some(key) if key.trim().is_empty() => return Err(ConfigError::Empty("CVBUILDER_STORAGE_KEY")),
            Some(key) => key.trim().to_string(),
            None => defaults.storage_key,
        };

        let save_debounce = match lookup("CVBUILDER_SAVE_DEBOUNCE_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidDebounce {
                    key: "CVBUILDER_SAVE_DEBOUNCE_MS",
                    value: raw.clone(),
                })?,
            None => defaults.save_debounce,
        };

        Ok(Config {
            store_dir: lookup("CVBUILDER_STORE_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.store_dir),
            storage_key,
            save_debounce,
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.storage_key, "cv-builder-data");
        assert_eq!(config.save_debounce, Duration::from_millis(1000));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("CVBUILDER_STORE_DIR", "/tmp/cvs"),
            ("CVBUILDER_STORAGE_KEY", "alt"),
            ("CVBUILDER_SAVE_DEBOUNCE_MS", "250"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.store_dir, PathBuf::from("/tmp/cvs"));
        assert_eq!(config.storage_key, "alt");
        assert_eq!(config.save_debounce, Duration::from_millis(250));
        assert_eq!(config.rust_log, "debug");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("CVBUILDER_SAVE_DEBOUNCE_MS", "soon")])),
            Err(ConfigError::InvalidDebounce { .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("CVBUILDER_STORAGE_KEY", " ")])),
            Err(ConfigError::Empty(_))
        ));
    }
}
