//! Configuration for EmberKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{EmberError, Result};

/// Main configuration for an EmberKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path of the record file. A sidecar `{db_path}.lock` is created next
    /// to it for advisory locking, and `{db_path}.tmp` is used during rewrites.
    pub db_path: PathBuf,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Maximum number of resident cache entries
    pub cache_capacity: usize,

    /// Number of hash buckets, fixed for the lifetime of the cache
    pub cache_buckets: usize,

    /// Idle time after which a cache entry is treated as absent
    pub cache_ttl: Duration,

    /// How often the server drops expired cache entries (`None` disables
    /// the sweeper; expired entries are then only dropped when read)
    pub cache_sweep_interval: Option<Duration>,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Number of connection worker threads (and max concurrent clients)
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./emberkv.db"),
            cache_capacity: 1000,
            cache_buckets: 1000,
            cache_ttl: Duration::from_secs(60),
            cache_sweep_interval: None,
            listen_addr: "127.0.0.1:7878".to_string(),
            max_connections: 16,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject configurations the cache or server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(EmberError::Config(
                "cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.cache_buckets == 0 {
            return Err(EmberError::Config(
                "cache_buckets must be at least 1".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(EmberError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.cache_sweep_interval == Some(Duration::ZERO) {
            return Err(EmberError::Config(
                "cache_sweep_interval must be non-zero".to_string(),
            ));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(EmberError::Config("db_path must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the record file path
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.db_path = path.into();
        self
    }

    /// Set the maximum number of cache entries
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Set the number of cache hash buckets
    pub fn cache_buckets(mut self, buckets: usize) -> Self {
        self.config.cache_buckets = buckets;
        self
    }

    /// Set the cache idle TTL
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    /// Enable the server's expired-entry sweeper
    pub fn cache_sweep_interval(mut self, interval: Duration) -> Self {
        self.config.cache_sweep_interval = Some(interval);
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of connection workers
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
