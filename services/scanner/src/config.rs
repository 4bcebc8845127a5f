//! services/scanner/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;
use turant_scan_core::{ScanOptions, ScanSettings, DEFAULT_PATIENT_ID, PATIENT_ID_PREFIX};

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub allowed_origin: String,
    pub scan_fps: u32,
    pub scan_qrbox: u32,
    pub navigation_delay: Duration,
    pub scan_timeout: Option<Duration>,
    pub fallback_patient_id: String,
    pub camera_reply_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address: SocketAddr = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:3000")?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin =
            lookup("ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:8080".to_string());

        // --- Scanner Settings ---
        let scan_fps: u32 = parse_or(&lookup, "SCAN_FPS", "10")?;
        if scan_fps == 0 {
            return Err(ConfigError::InvalidValue(
                "SCAN_FPS".to_string(),
                "frame rate must be positive".to_string(),
            ));
        }
        let scan_qrbox: u32 = parse_or(&lookup, "SCAN_QRBOX", "250")?;

        let navigation_delay =
            Duration::from_millis(parse_or(&lookup, "NAVIGATION_DELAY_MS", "800")?);

        // Zero disables the timeout.
        let scan_timeout_secs: u64 = parse_or(&lookup, "SCAN_TIMEOUT_SECS", "120")?;
        let scan_timeout = (scan_timeout_secs > 0).then(|| Duration::from_secs(scan_timeout_secs));

        let fallback_patient_id =
            lookup("FALLBACK_PATIENT_ID").unwrap_or_else(|| DEFAULT_PATIENT_ID.to_string());
        if !fallback_patient_id.starts_with(PATIENT_ID_PREFIX) {
            return Err(ConfigError::InvalidValue(
                "FALLBACK_PATIENT_ID".to_string(),
                format!("must start with '{}'", PATIENT_ID_PREFIX),
            ));
        }

        let camera_reply_timeout =
            Duration::from_millis(parse_or(&lookup, "CAMERA_REPLY_TIMEOUT_MS", "30000")?);

        Ok(Self {
            bind_address,
            log_level,
            allowed_origin,
            scan_fps,
            scan_qrbox,
            navigation_delay,
            scan_timeout,
            fallback_patient_id,
            camera_reply_timeout,
        })
    }

    /// The settings every scan controller is created with.
    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            options: ScanOptions {
                target_frame_rate: self.scan_fps,
                detection_box_size: self.scan_qrbox,
            },
            navigation_delay: self.navigation_delay,
            fallback_patient_id: self.fallback_patient_id.clone(),
            scan_timeout: self.scan_timeout,
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(name).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_without_variables() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.scan_fps, 10);
        assert_eq!(config.scan_qrbox, 250);
        assert_eq!(config.navigation_delay, Duration::from_millis(800));
        assert_eq!(config.scan_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.fallback_patient_id, DEFAULT_PATIENT_ID);
        assert_eq!(config.camera_reply_timeout, Duration::from_secs(30));
    }

    #[test]
    fn zero_timeout_disables_it() {
        let config = config_from(&[("SCAN_TIMEOUT_SECS", "0")]).unwrap();
        assert_eq!(config.scan_timeout, None);
        assert_eq!(config.scan_settings().scan_timeout, None);
    }

    #[test]
    fn scan_settings_carry_overrides() {
        let config = config_from(&[
            ("SCAN_FPS", "15"),
            ("SCAN_QRBOX", "300"),
            ("NAVIGATION_DELAY_MS", "1500"),
        ])
        .unwrap();
        let settings = config.scan_settings();
        assert_eq!(settings.options.target_frame_rate, 15);
        assert_eq!(settings.options.detection_box_size, 300);
        assert_eq!(settings.navigation_delay, Duration::from_millis(1500));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config_from(&[("BIND_ADDRESS", "localhost")]),
            Err(ConfigError::InvalidValue(name, _)) if name == "BIND_ADDRESS"
        ));
        assert!(matches!(
            config_from(&[("RUST_LOG", "chatty")]),
            Err(ConfigError::InvalidValue(name, _)) if name == "RUST_LOG"
        ));
        assert!(matches!(
            config_from(&[("SCAN_FPS", "0")]),
            Err(ConfigError::InvalidValue(name, _)) if name == "SCAN_FPS"
        ));
        assert!(matches!(
            config_from(&[("FALLBACK_PATIENT_ID", "PX-1")]),
            Err(ConfigError::InvalidValue(name, _)) if name == "FALLBACK_PATIENT_ID"
        ));
    }
}
