//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::EngineConfig;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Process memory threshold in MiB, 0 disables memory-pressure eviction
    pub max_memory_mb: u64,
    /// Maximum item age in seconds, 0 disables TTL expiry
    pub max_item_age: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Background sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_MEMORY_MB` - Memory threshold in MiB (default: 1500)
    /// - `MAX_ITEM_AGE` - Maximum item age in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 7171)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_memory_mb: parse_var("MAX_MEMORY_MB").unwrap_or(defaults.max_memory_mb),
            max_item_age: parse_var("MAX_ITEM_AGE").unwrap_or(defaults.max_item_age),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Builds the engine configuration from the process configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_memory_bytes: self.max_memory_mb.saturating_mul(1024 * 1024),
            max_item_age: Duration::from_secs(self.max_item_age),
            cleanup_interval: Duration::from_secs(self.cleanup_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_memory_mb: 1500,
            max_item_age: 300,
            server_port: 7171,
            cleanup_interval: 60,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
