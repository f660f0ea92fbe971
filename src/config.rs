// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use crate::models::VisitSettings;
use std::env;
use std::str::FromStr;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Base URL of a Photon instance; reverse geocoding is off when unset
    pub photon_api_url: Option<String>,
    /// Queue reverse geocoding jobs for places created during detection
    pub reverse_geocoding_enabled: bool,
    /// Detection defaults for users without stored settings
    pub visit_settings: VisitSettings,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8080,
            photon_api_url: None,
            reverse_geocoding_enabled: false,
            visit_settings: VisitSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let mut visit_settings = VisitSettings::default();
        if let Some(minutes) = parse_var("VISIT_TIME_THRESHOLD_MINUTES")? {
            visit_settings.time_threshold_minutes = minutes;
        }
        if let Some(minutes) = parse_var("VISIT_MERGE_THRESHOLD_MINUTES")? {
            visit_settings.maximum_visit_gap_minutes = minutes;
        }
        if let Some(enabled) = parse_flag("VISIT_DENSITY_NORMALIZATION")? {
            visit_settings.density_normalization = enabled;
        }

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            photon_api_url: env::var("PHOTON_API_URL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            reverse_geocoding_enabled: parse_flag("REVERSE_GEOCODING_ENABLED")?.unwrap_or(false),
            visit_settings,
        })
    }
}

/// Read and parse an optional variable.
fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name, value)),
        Err(_) => Ok(None),
    }
}

/// Read an optional boolean variable (`true`/`false`/`1`/`0`).
fn parse_flag(name: &'static str) -> Result<Option<bool>, ConfigError> {
    match env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::Invalid(name, value)),
        },
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set env vars for test
        env::set_var("PHOTON_API_URL", "https://photon.example.org ");
        env::set_var("REVERSE_GEOCODING_ENABLED", "true");
        env::set_var("VISIT_TIME_THRESHOLD_MINUTES", "45");
        env::set_var("VISIT_DENSITY_NORMALIZATION", "1");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(
            config.photon_api_url.as_deref(),
            Some("https://photon.example.org")
        );
        assert!(config.reverse_geocoding_enabled);
        assert_eq!(config.visit_settings.time_threshold_minutes, 45);
        assert!(config.visit_settings.density_normalization);
        assert_eq!(config.visit_settings.maximum_visit_gap_minutes, 30);

        env::set_var("VISIT_TIME_THRESHOLD_MINUTES", "soon");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("VISIT_TIME_THRESHOLD_MINUTES", _))
        ));

        for name in [
            "PHOTON_API_URL",
            "REVERSE_GEOCODING_ENABLED",
            "VISIT_TIME_THRESHOLD_MINUTES",
            "VISIT_DENSITY_NORMALIZATION",
        ] {
            env::remove_var(name);
        }
    }
}
