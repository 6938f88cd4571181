//! Cache Entry definitions
//!
//! Resident entries and the copies handed out by `Cache::status`.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::CacheStats;

/// A resident cache entry. Never leaves the table by reference.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub(crate) key: Vec<u8>,
    /// Owned copy, never shared with the store's buffers
    pub(crate) value: Vec<u8>,
    pub(crate) hit_count: u64,
    pub(crate) last_accessed: Instant,
    /// Strictly increasing per table; orders entries whose instants compare equal
    pub(crate) stamp: u64,
}

impl CacheEntry {
    pub(crate) fn new(key: Vec<u8>, value: Vec<u8>, now: Instant, stamp: u64) -> Self {
        Self {
            key,
            value,
            hit_count: 0,
            last_accessed: now,
            stamp,
        }
    }

    /// Refresh recency
    pub(crate) fn touch(&mut self, now: Instant, stamp: u64) {
        self.last_accessed = now;
        self.stamp = stamp;
    }

    /// Idle for strictly longer than `ttl`
    pub(crate) fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_accessed) > ttl
    }

    /// LRU ordering key: older instant first, then older stamp
    pub(crate) fn recency(&self) -> (Instant, u64) {
        (self.last_accessed, self.stamp)
    }

    pub(crate) fn status(&self, now: Instant) -> CacheEntryStatus {
        CacheEntryStatus {
            key: self.key.clone(),
            value: self.value.clone(),
            hit_count: self.hit_count,
            idle_ms: now.saturating_duration_since(self.last_accessed).as_millis() as u64,
        }
    }
}

/// Point-in-time copy of one cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntryStatus {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub hit_count: u64,
    /// Milliseconds since the entry was last read or written
    pub idle_ms: u64,
}

/// Point-in-time copy of the whole cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub capacity: usize,
    pub bucket_count: usize,
    pub ttl_ms: u64,
    /// Most recently used first
    pub entries: Vec<CacheEntryStatus>,
    pub stats: CacheStats,
}

impl CacheStatus {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the snapshot of `key`, if it was resident
    pub fn entry(&self, key: &[u8]) -> Option<&CacheEntryStatus> {
        self.entries.iter().find(|e| e.key == key)
    }
}
