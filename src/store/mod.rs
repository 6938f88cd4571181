//! Storage Module
//!
//! Durable storage of the full record set in a single flat file.
//!
//! ## Responsibilities
//! - Point lookup, append, upsert, remove and full scan over the record file
//! - Crash-safer mutation: read all, modify in memory, write a temp file,
//!   fsync, then atomically rename over the original
//! - Cross-process and cross-thread serialization through advisory locks
//! - First-occurrence deduplication of keys
//!
//! ## Files
//! ```text
//! {db_path}        record file (see `codec` for the framing)
//! {db_path}.lock   sidecar lock file, never renamed
//! {db_path}.tmp    rewrite target, renamed over {db_path} on commit
//! ```
//!
//! Locks live on the sidecar rather than on the record file itself: the
//! record file's inode is replaced on every rewrite, so a reader queued on
//! the old inode would otherwise read unlinked content once it got the lock.

mod file_store;
mod lock;
mod scan;

pub use file_store::Store;
pub use lock::{FileLock, LockMode};
pub use scan::Scan;
