//! # API Configuration
//!
//! Environment-based configuration for the API service. Every variable is
//! optional; a value that is present but malformed is an error, never a
//! silent fallback.

use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use drone_domain::MAXIMUM_BATTERY_CAPACITY;
use drone_fleet::FleetPolicy;
use drone_persistence::ScyllaConfig;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl Display) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Where fleet records live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process memory, lost on restart
    Memory,
    /// ScyllaDB cluster
    Scylla,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "scylla" => Ok(Self::Scylla),
            _ => Err("expected 'memory' or 'scylla'".to_string()),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub server_addr: SocketAddr,

    /// Logging level, used when `RUST_LOG` is unset
    pub log_level: String,

    pub store_backend: StoreBackend,

    /// ScyllaDB connection, only read with the `scylla` backend
    pub scylla: ScyllaConfig,

    /// Period of the battery discharge task
    pub battery_check_interval: Duration,

    pub policy: FleetPolicy,

    /// Serve the GraphQL Playground on `GET /graphql`
    pub enable_playground: bool,

    /// Expose `DELETE /drones`
    pub enable_admin_reset: bool,

    /// CORS allowed origins, `*` for any
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_level: "info".to_string(),
            store_backend: StoreBackend::Memory,
            scylla: ScyllaConfig::default(),
            battery_check_interval: Duration::from_secs(60),
            policy: FleetPolicy::default(),
            enable_playground: true,
            enable_admin_reset: false,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let interval_secs: u64 = parse(&lookup, "BATTERY_CHECK_INTERVAL_SECS", 60)?;
        if interval_secs == 0 {
            return Err(ConfigError::invalid(
                "BATTERY_CHECK_INTERVAL_SECS",
                "0",
                "must be at least 1 second",
            ));
        }

        let min_loading_battery: u8 = parse(
            &lookup,
            "MIN_LOADING_BATTERY",
            defaults.policy.min_loading_battery,
        )?;
        if min_loading_battery > MAXIMUM_BATTERY_CAPACITY {
            return Err(ConfigError::invalid(
                "MIN_LOADING_BATTERY",
                &min_loading_battery.to_string(),
                format!("must be at most {MAXIMUM_BATTERY_CAPACITY}"),
            ));
        }

        let scylla = ScyllaConfig {
            hosts: lookup("SCYLLA_HOSTS").map_or(defaults.scylla.hosts, |v| list(&v)),
            keyspace: lookup("SCYLLA_KEYSPACE").unwrap_or(defaults.scylla.keyspace),
            username: lookup("SCYLLA_USERNAME"),
            password: lookup("SCYLLA_PASSWORD"),
        };

        Ok(Self {
            server_addr: parse(&lookup, "SERVER_ADDR", defaults.server_addr)?,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            store_backend: parse(&lookup, "STORE_BACKEND", defaults.store_backend)?,
            scylla,
            battery_check_interval: Duration::from_secs(interval_secs),
            policy: FleetPolicy {
                min_loading_battery,
                discharge_per_tick: parse(
                    &lookup,
                    "BATTERY_DISCHARGE_PER_TICK",
                    defaults.policy.discharge_per_tick,
                )?,
            },
            enable_playground: flag(&lookup, "ENABLE_PLAYGROUND", defaults.enable_playground)?,
            enable_admin_reset: flag(&lookup, "ENABLE_ADMIN_RESET", defaults.enable_admin_reset)?,
            cors_origins: lookup("CORS_ORIGINS").map_or(defaults.cors_origins, |v| list(&v)),
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid(key, &value, e)),
        None => Ok(default),
    }
}

fn flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(default),
        Some("true" | "1") => Ok(true),
        Some("false" | "0") => Ok(false),
        Some(other) => Err(ConfigError::invalid(key, other, "expected true/false")),
    }
}

fn list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
