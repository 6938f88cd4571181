//! Cache Table
//!
//! Fixed-bucket chained hash table with TTL expiry and LRU eviction.
//! All operations take the current instant explicitly; `Cache` supplies
//! `Instant::now()`.

use std::time::{Duration, Instant};

use super::entry::{CacheEntry, CacheEntryStatus};
use super::CacheStats;

/// Inserts between reconciliations of the running entry count
pub const RECONCILE_INTERVAL: usize = 64;

/// Eviction attempts allowed per insert before the table is cleared
pub const MAX_EVICTIONS_PER_INSERT: usize = 8;

/// djb2: `h = h * 33 + byte`, seeded with 5381
pub fn djb2(key: &[u8]) -> u64 {
    key.iter().fold(5381u64, |h, &b| {
        h.wrapping_shl(5).wrapping_add(h).wrapping_add(b as u64)
    })
}

/// The cache's table. Not synchronized; `Cache` wraps it in a mutex.
#[derive(Debug)]
pub struct CacheTable {
    buckets: Vec<Vec<CacheEntry>>,
    /// Max resident entries once an insert has finished evicting
    capacity: usize,
    ttl: Duration,
    /// Running resident count, reconciled every `RECONCILE_INTERVAL` inserts
    len: usize,
    inserts_since_reconcile: usize,
    next_stamp: u64,
    stats: CacheStats,
}

impl CacheTable {
    /// Allocate `bucket_count` empty chains (at least one)
    pub fn new(bucket_count: usize, capacity: usize, ttl: Duration) -> Self {
        let bucket_count = bucket_count.max(1);
        Self {
            buckets: (0..bucket_count).map(|_| Vec::new()).collect(),
            capacity,
            ttl,
            len: 0,
            inserts_since_reconcile: 0,
            next_stamp: 0,
            stats: CacheStats::new(),
        }
    }

    /// Insert or overwrite `key`
    ///
    /// Overwriting refreshes recency and keeps `hit_count`. A new entry starts
    /// at zero hits and may push the oldest entry out.
    pub fn put(&mut self, key: &[u8], value: &[u8], now: Instant) {
        let stamp = self.bump_stamp();
        let idx = self.bucket_index(key);

        if let Some(entry) = self.buckets[idx].iter_mut().find(|e| e.key == key) {
            entry.value = value.to_vec();
            entry.touch(now, stamp);
            return;
        }

        self.buckets[idx].push(CacheEntry::new(key.to_vec(), value.to_vec(), now, stamp));
        self.len += 1;

        self.inserts_since_reconcile += 1;
        if self.inserts_since_reconcile >= RECONCILE_INTERVAL {
            self.reconcile();
        }

        self.enforce_capacity();
    }

    /// Read `key`, counting the hit and refreshing recency
    ///
    /// An entry idle for longer than the TTL is dropped and reads as a miss.
    pub fn get(&mut self, key: &[u8], now: Instant) -> Option<Vec<u8>> {
        let stamp = self.bump_stamp();
        let idx = self.bucket_index(key);

        let pos = match self.buckets[idx].iter().position(|e| e.key == key) {
            Some(pos) => pos,
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if self.buckets[idx][pos].is_expired(now, self.ttl) {
            self.buckets[idx].remove(pos);
            self.len = self.len.saturating_sub(1);
            self.stats.record_expiration();
            self.stats.record_miss();
            tracing::trace!("Cache entry expired on read");
            return None;
        }

        let entry = &mut self.buckets[idx][pos];
        entry.hit_count += 1;
        entry.touch(now, stamp);
        self.stats.record_hit();
        Some(entry.value.clone())
    }

    /// Drop `key` if present
    pub fn remove(&mut self, key: &[u8]) -> bool {
        let idx = self.bucket_index(key);
        match self.buckets[idx].iter().position(|e| e.key == key) {
            Some(pos) => {
                self.buckets[idx].remove(pos);
                self.len = self.len.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    /// Drop every expired entry; returns how many were dropped
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let mut purged = 0;
        for bucket in &mut self.buckets {
            let before = bucket.len();
            bucket.retain(|e| !e.is_expired(now, ttl));
            purged += before - bucket.len();
        }
        self.len = self.len.saturating_sub(purged);
        for _ in 0..purged {
            self.stats.record_expiration();
        }
        purged
    }

    /// Drop everything, keeping the bucket array
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
        self.inserts_since_reconcile = 0;
    }

    /// Copies of every resident entry, most recently used first
    pub fn snapshot(&self, now: Instant) -> Vec<CacheEntryStatus> {
        let mut entries: Vec<&CacheEntry> = self.buckets.iter().flatten().collect();
        entries.sort_by(|a, b| b.recency().cmp(&a.recency()));
        entries.into_iter().map(|e| e.status(now)).collect()
    }

    /// Running resident count
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resident count by walking every chain
    pub fn counted_len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn bucket_index(&self, key: &[u8]) -> usize {
        (djb2(key) % self.buckets.len() as u64) as usize
    }

    fn bump_stamp(&mut self) -> u64 {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        stamp
    }

    /// Reset the running count to the true count
    fn reconcile(&mut self) {
        let counted = self.counted_len();
        if counted != self.len {
            tracing::warn!(
                "Cache count drifted: running={}, actual={}",
                self.len,
                counted
            );
        }
        self.len = counted;
        self.inserts_since_reconcile = 0;
    }

    /// Evict until within capacity, with a bounded number of attempts
    fn enforce_capacity(&mut self) {
        if self.len <= self.capacity {
            return;
        }
        // A drifted running count must never cost a live entry
        self.reconcile();

        let mut attempts = 0;

        while self.len > self.capacity {
            if attempts == MAX_EVICTIONS_PER_INSERT {
                tracing::warn!(
                    "Cache eviction bound of {} reached with {} entries, clearing cache",
                    MAX_EVICTIONS_PER_INSERT,
                    self.len
                );
                self.clear();
                self.stats.record_safety_clear();
                return;
            }
            attempts += 1;

            if !self.evict_lru() {
                // Running count claims entries that are not there
                self.reconcile();
            }
        }
    }

    /// Remove the entry with the oldest (last_accessed, stamp)
    fn evict_lru(&mut self) -> bool {
        let victim = self
            .buckets
            .iter()
            .enumerate()
            .flat_map(|(b, chain)| chain.iter().enumerate().map(move |(i, e)| (b, i, e)))
            .min_by_key(|(_, _, e)| e.recency())
            .map(|(b, i, _)| (b, i));

        match victim {
            Some((bucket, pos)) => {
                self.buckets[bucket].remove(pos);
                self.len = self.len.saturating_sub(1);
                self.stats.record_eviction();
                tracing::trace!("Evicted least recently used cache entry");
                true
            }
            None => false,
        }
    }
}
