//! Engine Module
//!
//! The coordinator that ties the record file and the cache together.
//!
//! ## Responsibilities
//! - Write-through `set`: record file first, then cache
//! - Read-through `get`: cache first, record file on miss, promote on hit
//! - Keep cache failures from ever failing a store operation
//! - Route protocol commands for the network layer

use std::path::Path;

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::cache::{Cache, CacheStatus};
use crate::config::Config;
use crate::error::{EmberError, Result};
use crate::protocol::{Command, Reply};
use crate::store::{Scan, Store};

/// The main engine
///
/// ## Concurrency Model
///
/// - **Store**: every operation takes the advisory lock on the record file's
///   sidecar for its whole scan or rewrite, so concurrent callers (threads
///   or processes) see whole-file states only.
///
/// - **Cache**: a single mutex inside `Cache`, held only for in-memory work.
///
/// - The two locks are never held together. A `get` that reads the store and
///   then promotes into the cache is not atomic as a pair; a stale cache
///   value can survive until its TTL or the next `set` of that key.
///
/// The engine is `Send + Sync` and is shared as `Arc<Engine>`.
#[derive(Debug)]
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Persistent record file
    store: Store,

    /// In-memory TTL/LRU cache
    cache: Cache,
}

impl Engine {
    /// Open an engine with the given config
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Open the store handle (does not create the record file)
    /// 3. Allocate the cache
    pub fn open(config: Config) -> Result<Self> {
        // Step 1: Refuse settings the cache cannot run with
        config.validate()?;

        // Step 2: Store handle; a missing file reads as empty
        let store = Store::open(&config.db_path)?;

        // Step 3: Cache is allocated eagerly so the first put succeeds
        let cache = Cache::from_config(&config);
        cache.init();

        tracing::info!(
            "Engine opened: db={}, cache capacity={}, ttl={:?}",
            config.db_path.display(),
            config.cache_capacity,
            config.cache_ttl
        );

        Ok(Self {
            config,
            store,
            cache,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified record file
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().db_path(path).build())
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers. A GET or REMOVE of an absent
    /// key is reported as `KeyNotFound`.
    pub fn execute(&self, command: Command) -> Result<Reply> {
        match command {
            Command::Get { key } => self
                .get(&key)?
                .map(Reply::Value)
                .ok_or(EmberError::KeyNotFound),
            Command::Set { key, value } => {
                self.set(&key, &value)?;
                Ok(Reply::Done)
            }
            Command::Remove { key } => {
                if self.remove(&key)? {
                    Ok(Reply::Done)
                } else {
                    Err(EmberError::KeyNotFound)
                }
            }
            Command::List => {
                let records = self.list()?.collect::<Result<Vec<_>>>()?;
                Ok(Reply::Records(records))
            }
            Command::CacheStatus => Ok(Reply::CacheStatus(self.cache_status()?)),
            Command::Cleanup => Ok(Reply::Count(self.deduplicate()? as u64)),
            Command::Ping => Ok(Reply::Pong),
        }
    }

    /// Insert or overwrite a key
    ///
    /// Steps:
    /// 1. Reject empty key or value
    /// 2. Upsert into the record file
    /// 3. Write the new value into the cache
    ///
    /// The store write is what decides success; a cache failure is logged
    /// and otherwise ignored.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        // Step 1: Validate input
        if key.is_empty() {
            return Err(EmberError::EmptyInput("key"));
        }
        if value.is_empty() {
            return Err(EmberError::EmptyInput("value"));
        }

        // Step 2: Persist
        self.store.upsert(key, value)?;

        // Step 3: Write-through
        if let Err(e) = self.cache.put(key, value) {
            tracing::warn!("Cache write after set failed: {}", e);
        }

        Ok(())
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. Cache (unexpired entry)
    /// 2. Record file, first matching record
    ///
    /// A value found on disk is promoted into the cache. An absent key does
    /// not touch the cache.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if key.is_empty() {
            return Err(EmberError::EmptyInput("key"));
        }

        // Step 1: Cache
        if let Some(value) = self.cache.get(key) {
            tracing::trace!("Cache hit");
            return Ok(Some(value));
        }

        // Step 2: Record file
        let value = match self.store.lookup(key)? {
            Some(value) => value,
            None => return Ok(None),
        };

        // Step 3: Read-through promotion
        if let Err(e) = self.cache.put(key, &value) {
            tracing::warn!("Cache promotion after get failed: {}", e);
        }

        Ok(Some(value))
    }

    /// Remove a key
    ///
    /// The cache copy goes first so a concurrent `get` cannot serve it after
    /// the record is gone. Returns whether the record file had the key.
    pub fn remove(&self, key: &[u8]) -> Result<bool> {
        if key.is_empty() {
            return Err(EmberError::EmptyInput("key"));
        }

        self.cache.remove(key);
        self.store.remove(key)
    }

    /// Every record on disk, in file order
    ///
    /// Reads the record file only; the cache is not consulted or updated.
    pub fn list(&self) -> Result<Scan> {
        self.store.scan()
    }

    /// Snapshot of the cache entries and counters
    pub fn cache_status(&self) -> Result<CacheStatus> {
        self.cache.status()
    }

    /// Drop duplicate keys from the record file, keeping the first of each
    ///
    /// Returns the number of records left.
    pub fn deduplicate(&self) -> Result<usize> {
        let kept = self.store.deduplicate()?;
        tracing::info!("Deduplicated record file: {} records kept", kept);
        Ok(kept)
    }

    /// Append `count` random alphanumeric pairs of `len` bytes each
    ///
    /// Pairs are appended without an existence check and bypass the cache.
    /// Returns the number of records written.
    pub fn populate(&self, count: usize, len: usize) -> Result<usize> {
        if len == 0 {
            return Err(EmberError::EmptyInput("key"));
        }

        let mut rng = rand::thread_rng();
        for _ in 0..count {
            let key: Vec<u8> = (&mut rng).sample_iter(&Alphanumeric).take(len).collect();
            let value: Vec<u8> = (&mut rng).sample_iter(&Alphanumeric).take(len).collect();
            self.store.append(&key, &value)?;
        }

        tracing::info!("Populated record file with {} random records", count);
        Ok(count)
    }

    /// Whether the configured record file exists
    pub fn store_exists(&self) -> bool {
        Store::exists(self.store.path())
    }

    /// Create the configured record file if it does not exist
    ///
    /// Returns `true` if a file was created.
    pub fn create_store(&self) -> Result<bool> {
        let created = Store::create_empty(self.store.path())?;
        if created {
            tracing::info!("Created empty record file {}", self.store.path().display());
        }
        Ok(created)
    }

    /// Close the engine gracefully
    ///
    /// Releases the cache. The record file needs no flushing; every store
    /// operation is durable when it returns.
    pub fn close(&self) -> Result<()> {
        self.cache.free()?;
        tracing::info!("Engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the record file path
    pub fn db_path(&self) -> &Path {
        self.store.path()
    }

    /// Get the store handle
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Get the cache handle
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
