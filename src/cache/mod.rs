//! Cache Module
//!
//! Bounded in-memory accelerator in front of the record file.
//!
//! ## Responsibilities
//! - Chained hash table with a bucket count fixed at init (djb2 hashing)
//! - Hit counting on every successful read
//! - Lazy TTL expiry: entries idle longer than the TTL read as absent
//! - LRU eviction once the resident count exceeds capacity
//!
//! ## Data Structure Choice
//! `Vec<Vec<CacheEntry>>` behind a single `parking_lot::Mutex`:
//! - Owned chains, no manual splicing
//! - One lock for the whole table; operations are short and never do I/O
//! - Eviction is a linear scan for the oldest entry, which is fine at the
//!   capacities this cache is meant for

mod entry;
mod handle;
mod stats;
mod table;

pub use entry::{CacheEntryStatus, CacheStatus};
pub use handle::Cache;
pub use stats::CacheStats;
pub use table::{djb2, CacheTable, MAX_EVICTIONS_PER_INSERT, RECONCILE_INTERVAL};
