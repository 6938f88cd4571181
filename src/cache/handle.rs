//! Cache handle
//!
//! Thread-safe wrapper around an optionally-allocated `CacheTable`.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{EmberError, Result};

use super::{CacheStats, CacheStatus, CacheTable};

/// Shared in-memory cache
///
/// ## Lifecycle
/// `new` → `init` (allocates buckets; idempotent) → ... → `free`.
/// A cache that is not initialized behaves as empty for reads, rejects
/// writes with `CacheUninitialized`, and can be initialized again.
///
/// ## Concurrency
/// One `parking_lot::Mutex` guards the table. Every operation holds it only
/// for the in-memory work and hands out owned copies.
#[derive(Debug)]
pub struct Cache {
    table: Mutex<Option<CacheTable>>,
    bucket_count: usize,
    capacity: usize,
    ttl: Duration,
}

impl Cache {
    /// Describe a cache without allocating it
    pub fn new(bucket_count: usize, capacity: usize, ttl: Duration) -> Self {
        Self {
            table: Mutex::new(None),
            bucket_count,
            capacity,
            ttl,
        }
    }

    /// Describe a cache from the cache section of `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_buckets, config.cache_capacity, config.cache_ttl)
    }

    /// Allocate the bucket array
    ///
    /// Returns `false` (and does nothing) if already initialized.
    pub fn init(&self) -> bool {
        let mut table = self.table.lock();
        if table.is_some() {
            return false;
        }
        *table = Some(CacheTable::new(self.bucket_count, self.capacity, self.ttl));
        tracing::debug!(
            "Cache initialized: {} buckets, capacity {}, ttl {:?}",
            self.bucket_count,
            self.capacity,
            self.ttl
        );
        true
    }

    /// Release every entry and the bucket array
    pub fn free(&self) -> Result<()> {
        match self.table.lock().take() {
            Some(_) => Ok(()),
            None => Err(EmberError::CacheUninitialized),
        }
    }

    /// Insert or overwrite `key` with a copy of `value`
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut table = self.table.lock();
        let table = table.as_mut().ok_or(EmberError::CacheUninitialized)?;
        table.put(key, value, Instant::now());
        Ok(())
    }

    /// Read a copy of `key`'s value; expired or absent keys give `None`
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.table
            .lock()
            .as_mut()
            .and_then(|table| table.get(key, Instant::now()))
    }

    /// Drop `key` if present
    pub fn remove(&self, key: &[u8]) -> bool {
        self.table
            .lock()
            .as_mut()
            .map(|table| table.remove(key))
            .unwrap_or(false)
    }

    /// Drop every expired entry
    pub fn purge_expired(&self) -> usize {
        self.table
            .lock()
            .as_mut()
            .map(|table| table.purge_expired(Instant::now()))
            .unwrap_or(0)
    }

    /// Drop every entry but keep the cache initialized
    pub fn clear(&self) {
        if let Some(table) = self.table.lock().as_mut() {
            table.clear();
        }
    }

    /// Snapshot of every entry plus counters
    pub fn status(&self) -> Result<CacheStatus> {
        let table = self.table.lock();
        let table = table.as_ref().ok_or(EmberError::CacheUninitialized)?;
        Ok(CacheStatus {
            capacity: table.capacity(),
            bucket_count: table.bucket_count(),
            ttl_ms: table.ttl().as_millis() as u64,
            entries: table.snapshot(Instant::now()),
            stats: table.stats().clone(),
        })
    }

    /// Counters, if initialized
    pub fn stats(&self) -> Option<CacheStats> {
        self.table.lock().as_ref().map(|table| table.stats().clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.table.lock().is_some()
    }

    /// Resident entries (0 when not initialized)
    pub fn len(&self) -> usize {
        self.table.lock().as_ref().map(CacheTable::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
