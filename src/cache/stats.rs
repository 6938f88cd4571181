//! Cache Statistics
//!
//! Counters for hits, misses, expirations and evictions.

use serde::{Deserialize, Serialize};

/// Cache performance counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Reads answered from the cache
    pub hits: u64,
    /// Reads that found nothing (absent or expired)
    pub misses: u64,
    /// Entries dropped because their TTL had elapsed
    pub expirations: u64,
    /// Entries dropped by LRU eviction
    pub evictions: u64,
    /// Times the eviction bound was exceeded and the table was cleared
    pub safety_clears: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// hits / (hits + misses), or 0.0 before any read
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_safety_clear(&mut self) {
        self.safety_clears += 1;
    }
}
