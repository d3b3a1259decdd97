//! Configuration management for the Pledg backend
//!
//! This module handles loading and validating configuration from environment
//! variables, with sane defaults for local demo runs.

use std::env;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// External BTC/INR price feed endpoint
    pub price_feed_url: String,

    /// Seconds between price feed refreshes
    pub price_refresh_secs: u64,

    /// Seconds between risk scan ticks over active loans
    pub risk_scan_secs: u64,

    /// Path of the persisted session document
    pub storage_path: String,

    /// Scale factor applied to simulated flow stage durations.
    /// 1.0 runs the demo timings; 0.0 completes flows immediately (tests).
    pub flow_time_scale: f64,

    /// CORS allowed origins (comma separated), permissive when unset
    pub cors_allowed_origins: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .map(|s| Environment::from_str(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let price_feed_url = env::var("PRICE_FEED_URL")
            .unwrap_or_else(|_| "https://lucky-wave-c3fe.wolf07279.workers.dev/".to_string());

        let price_refresh_secs = env::var("PRICE_REFRESH_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .unwrap_or(30);

        let risk_scan_secs = env::var("RISK_SCAN_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u64>()
            .unwrap_or(5);

        let storage_path =
            env::var("STORAGE_PATH").unwrap_or_else(|_| "pledg-storage.json".to_string());

        let flow_time_scale = env::var("FLOW_TIME_SCALE")
            .unwrap_or_else(|_| "1.0".to_string())
            .parse::<f64>()
            .unwrap_or(1.0)
            .max(0.0);

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS").ok();

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Config {
            environment,
            port,
            price_feed_url,
            price_refresh_secs,
            risk_scan_secs,
            storage_path,
            flow_time_scale,
            cors_allowed_origins,
            log_level,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            environment: Environment::Development,
            port: 3001,
            price_feed_url: "https://lucky-wave-c3fe.wolf07279.workers.dev/".to_string(),
            price_refresh_secs: 30,
            risk_scan_secs: 5,
            storage_path: "pledg-storage.json".to_string(),
            flow_time_scale: 1.0,
            cors_allowed_origins: None,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_str() {
        assert_eq!(
            Environment::from_str("dev").unwrap(),
            Environment::Development
        );
        assert_eq!(
            Environment::from_str("development").unwrap(),
            Environment::Development
        );
        assert_eq!(
            Environment::from_str("staging").unwrap(),
            Environment::Staging
        );
        assert_eq!(
            Environment::from_str("prod").unwrap(),
            Environment::Production
        );

        // Case insensitive
        assert_eq!(
            Environment::from_str("PROD").unwrap(),
            Environment::Production
        );

        // Invalid
        assert!(Environment::from_str("invalid").is_err());
    }

    #[test]
    fn test_environment_is_production() {
        assert!(!Environment::Development.is_production());
        assert!(!Environment::Staging.is_production());
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn test_default_intervals() {
        let config = Config::default();
        assert_eq!(config.price_refresh_secs, 30);
        assert_eq!(config.risk_scan_secs, 5);
        assert_eq!(config.flow_time_scale, 1.0);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidPort("abc".to_string());
        assert!(err.to_string().contains("abc"));
    }
}
