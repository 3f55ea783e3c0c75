//! Environment configuration for the API binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;

pub const BIND_ADDR_VAR: &str = "MARKET_BIND_ADDR";
pub const SNAPSHOT_PATH_VAR: &str = "MARKET_SNAPSHOT_PATH";
pub const SALES_WINDOW_VAR: &str = "MARKET_SALES_WINDOW_HOURS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SALES_WINDOW_HOURS: i64 = 24;
/// One hundred years.
pub const MAX_SALES_WINDOW_HOURS: i64 = 876_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// When set, the catalog is restored from and saved to this JSON file.
    pub snapshot_path: Option<PathBuf>,
    pub sales_window: Duration,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_addr = get(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid(BIND_ADDR_VAR, &raw_addr, e.to_string()))?;

        let snapshot_path = get(SNAPSHOT_PATH_VAR).map(PathBuf::from);

        let sales_window = match get(SALES_WINDOW_VAR) {
            None => Duration::hours(DEFAULT_SALES_WINDOW_HOURS),
            Some(raw) => {
                let hours = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| ConfigError::invalid(SALES_WINDOW_VAR, &raw, e.to_string()))?;
                if hours <= 0 {
                    return Err(ConfigError::invalid(SALES_WINDOW_VAR, &raw, "must be positive"));
                }
                if hours > MAX_SALES_WINDOW_HOURS {
                    return Err(ConfigError::invalid(
                        SALES_WINDOW_VAR,
                        &raw,
                        format!("must be at most {MAX_SALES_WINDOW_HOURS}"),
                    ));
                }
                Duration::try_hours(hours)
                    .ok_or_else(|| ConfigError::invalid(SALES_WINDOW_VAR, &raw, "out of range"))?
            }
        };

        Ok(Self {
            bind_addr,
            snapshot_path,
            sales_window,
        })
    }
}
