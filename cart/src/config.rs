//! Cart configuration
//!
//! Loaded from `CART_*` environment variables, each with a default.
//!
//! # Example
//!
//! ```no_run
//! use rocket_cart::config::CartConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CartConfig::from_env()?;
//! println!("Inventory API: {}", config.api_url);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default inventory API
pub const DEFAULT_API_URL: &str = "http://localhost:3333";

/// Default storage key for the persisted cart
pub const DEFAULT_STORAGE_KEY: &str = "@rocket-cart:cart";

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Cart configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Inventory API base URL
    pub api_url: String,
    /// HTTP client timeout in seconds (`None` = no timeout)
    pub http_timeout_secs: Option<u64>,
    /// Directory of the file-backed store
    pub storage_dir: PathBuf,
    /// Key the cart is persisted under
    pub storage_key: String,
    /// Capacity of the action broadcast channel
    pub broadcast_capacity: usize,
    /// How long an operation waits for its outcome (`None` = forever)
    pub command_timeout_secs: Option<u64>,
    /// How long shutdown waits for in-flight lookups
    pub shutdown_timeout_secs: u64,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Install the Prometheus recorder
    pub metrics_enabled: bool,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            http_timeout_secs: None,
            storage_dir: PathBuf::from(".rocket-cart"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            broadcast_capacity: 64,
            command_timeout_secs: None,
            shutdown_timeout_secs: 30,
            log_level: "info".to_string(),
            metrics_enabled: false,
        }
    }
}

impl CartConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the resulting configuration is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// Values that fail to parse fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the resulting configuration is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |name: &str| lookup(name).and_then(|raw| parse_or_warn(name, &raw));

        let config = Self {
            api_url: lookup("CART_API_URL").unwrap_or(defaults.api_url),
            http_timeout_secs: parsed("CART_HTTP_TIMEOUT_SECS").or(defaults.http_timeout_secs),
            storage_dir: lookup("CART_STORAGE_DIR").map_or(defaults.storage_dir, PathBuf::from),
            storage_key: lookup("CART_STORAGE_KEY").unwrap_or(defaults.storage_key),
            broadcast_capacity: parsed("CART_BROADCAST_CAPACITY")
                .unwrap_or(defaults.broadcast_capacity as u64)
                .try_into()
                .unwrap_or(defaults.broadcast_capacity),
            command_timeout_secs: parsed("CART_COMMAND_TIMEOUT_SECS")
                .or(defaults.command_timeout_secs),
            shutdown_timeout_secs: parsed("CART_SHUTDOWN_TIMEOUT_SECS")
                .unwrap_or(defaults.shutdown_timeout_secs),
            log_level: lookup("CART_LOG_LEVEL").unwrap_or(defaults.log_level),
            metrics_enabled: lookup("CART_METRICS_ENABLED")
                .and_then(|raw| parse_bool(&raw))
                .unwrap_or(defaults.metrics_enabled),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Validation("api_url cannot be empty".to_string()));
        }
        if self.storage_key.is_empty() {
            return Err(ConfigError::Validation(
                "storage_key cannot be empty".to_string(),
            ));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Validation(
                "broadcast_capacity must be > 0".to_string(),
            ));
        }
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "invalid log_level: {}. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    /// HTTP client timeout
    #[must_use]
    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }

    /// Operation timeout
    #[must_use]
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// Shutdown timeout
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn parse_or_warn<T: FromStr>(name: &str, raw: &str) -> Option<T> {
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(variable = name, value = raw, "Ignoring unparseable value, using default");
    }
    parsed
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
