//! File Store
//!
//! Single-file record store with temp-file-and-rename mutation.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::codec::{write_record, Record, RecordReader};
use crate::error::Result;

use super::{FileLock, LockMode, Scan};

/// Handle on a record file
///
/// ## Concurrency:
/// - Reads (`lookup`, `scan`) hold a shared advisory lock for the pass
/// - Mutations (`append`, `upsert`, `remove`, `deduplicate`) hold an
///   exclusive lock across read-modify-write-rename
/// - The handle itself is immutable; all methods take `&self`
#[derive(Debug, Clone)]
pub struct Store {
    /// Record file
    path: PathBuf,
    /// Sidecar lock file
    lock_path: PathBuf,
    /// Rewrite target, renamed over `path` on commit
    tmp_path: PathBuf,
}

impl Store {
    // =========================================================================
    // Internal Path Suffixes
    // =========================================================================
    const LOCK_SUFFIX: &'static str = ".lock";
    const TMP_SUFFIX: &'static str = ".tmp";

    /// Open a store at `path`
    ///
    /// Creates the parent directory if needed but not the record file: a
    /// missing record file reads as an empty store and is created by the
    /// first successful write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        Ok(Self {
            lock_path: Self::sibling(&path, Self::LOCK_SUFFIX),
            tmp_path: Self::sibling(&path, Self::TMP_SUFFIX),
            path,
        })
    }

    /// Whether a record file exists at `path`
    pub fn exists(path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }

    /// Create an empty record file at `path` if none exists
    ///
    /// Never truncates an existing file. Returns `true` if a file was created.
    pub fn create_empty(path: impl AsRef<Path>) -> Result<bool> {
        let store = Self::open(path)?;
        let _lock = FileLock::acquire(&store.lock_path, LockMode::Exclusive)?;

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&store.path)
        {
            Ok(file) => {
                file.sync_all()?;
                tracing::debug!("Created empty store at {}", store.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a key with a full scan under a shared lock
    ///
    /// Returns the value of the first record whose key matches.
    pub fn lookup(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let _lock = FileLock::acquire(&self.lock_path, LockMode::Shared)?;

        let file = match Self::open_existing(&self.path)? {
            Some(f) => f,
            None => return Ok(None),
        };

        for record in RecordReader::new(BufReader::new(file)) {
            let record = record?;
            if record.key == key {
                return Ok(Some(record.value));
            }
        }

        Ok(None)
    }

    /// Append one record without checking for an existing key
    ///
    /// Callers that need insert-or-update semantics use `upsert`.
    pub fn append(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let _lock = FileLock::acquire(&self.lock_path, LockMode::Exclusive)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = BufWriter::new(&file);
        write_record(&mut writer, key, value)?;
        writer.flush()?;
        drop(writer);
        file.sync_data()?;

        Ok(())
    }

    /// Insert or update `key`
    ///
    /// Every record with a matching key gets the new value; if none matched,
    /// the record is added at the end. The result is committed by rename, so
    /// a concurrent locked reader sees either the old or the new file.
    pub fn upsert(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let _lock = FileLock::acquire(&self.lock_path, LockMode::Exclusive)?;

        let mut records = self.read_all_locked()?;
        let mut found = false;
        for record in records.iter_mut().filter(|r| r.key == key) {
            record.value = value.to_vec();
            found = true;
        }
        if !found {
            records.push(Record::new(key, value));
        }

        tracing::debug!(
            "Upsert rewriting {} records ({})",
            records.len(),
            if found { "update" } else { "insert" }
        );
        self.rewrite_locked(&records, |_| Ok(()))
    }

    /// Remove every record for `key`
    ///
    /// Returns whether any record was found. The file is left untouched
    /// when nothing matched.
    pub fn remove(&self, key: &[u8]) -> Result<bool> {
        let _lock = FileLock::acquire(&self.lock_path, LockMode::Exclusive)?;

        let mut records = self.read_all_locked()?;
        let before = records.len();
        records.retain(|r| r.key != key);

        if records.len() == before {
            return Ok(false);
        }

        tracing::debug!("Remove rewriting {} records", records.len());
        self.rewrite_locked(&records, |_| Ok(()))?;
        Ok(true)
    }

    /// Snapshot the record file for a full pass
    pub fn scan(&self) -> Result<Scan> {
        let _lock = FileLock::acquire(&self.lock_path, LockMode::Shared)?;

        match fs::read(&self.path) {
            Ok(bytes) => Ok(Scan::new(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Scan::empty()),
            Err(e) => Err(e.into()),
        }
    }

    /// Keep only the first occurrence of each key, in scan order
    ///
    /// Returns the number of records kept.
    pub fn deduplicate(&self) -> Result<usize> {
        let _lock = FileLock::acquire(&self.lock_path, LockMode::Exclusive)?;

        let records = self.read_all_locked()?;
        let total = records.len();

        let mut seen = HashSet::with_capacity(total);
        let unique: Vec<Record> = records
            .into_iter()
            .filter(|r| seen.insert(r.key.clone()))
            .collect();

        if unique.len() < total {
            tracing::debug!(
                "Deduplicate dropping {} of {} records",
                total - unique.len(),
                total
            );
            self.rewrite_locked(&unique, |_| Ok(()))?;
        }

        Ok(unique.len())
    }

    /// Number of records currently on disk
    pub fn len(&self) -> Result<usize> {
        let mut count = 0;
        for record in self.scan()? {
            record?;
            count += 1;
        }
        Ok(count)
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Path of the record file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the sidecar lock file
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Decode the whole file (caller holds the lock)
    fn read_all_locked(&self) -> Result<Vec<Record>> {
        match Self::open_existing(&self.path)? {
            Some(file) => RecordReader::new(BufReader::new(file)).collect(),
            None => Ok(Vec::new()),
        }
    }

    /// Write `records` to the temp file, sync it, then rename it over the
    /// record file (caller holds the exclusive lock)
    ///
    /// `before_rename` runs after the temp file is durable and before the
    /// commit; an error from it aborts the rewrite like any other failure.
    fn rewrite_locked<F>(&self, records: &[Record], before_rename: F) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let pending = PendingFile::create(&self.tmp_path)?;

        {
            let mut writer = BufWriter::new(pending.file());
            for record in records {
                write_record(&mut writer, &record.key, &record.value)?;
            }
            writer.flush()?;
        }
        pending.file().sync_all()?;

        before_rename(pending.path())?;

        pending.commit(&self.path)
    }

    fn open_existing(path: &Path) -> Result<Option<File>> {
        match File::open(path) {
            Ok(f) => Ok(Some(f)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// "data/kv.db" + ".lock" → "data/kv.db.lock"
    fn sibling(path: &Path, suffix: &str) -> PathBuf {
        let mut name: OsString = path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }
}

/// Temp file that is deleted on drop unless committed
struct PendingFile {
    path: PathBuf,
    file: File,
    committed: bool,
}

impl PendingFile {
    fn create(path: &Path) -> Result<Self> {
        // A leftover from an interrupted rewrite is simply overwritten
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            committed: false,
        })
    }

    fn file(&self) -> &File {
        &self.file
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically rename over `target`
    fn commit(self, target: &Path) -> Result<()> {
        self.commit_with(target, sync_parent_dir)
    }

    /// Rename over `target`, then make the rename durable with `sync_dir`
    ///
    /// Once the rename succeeds the new contents are visible, so a failed
    /// directory sync is logged and the commit still reports success.
    fn commit_with<F>(mut self, target: &Path, sync_dir: F) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        fs::rename(&self.path, target)?;
        self.committed = true;

        if let Err(e) = sync_dir(target) {
            tracing::warn!(
                "Renamed {} but syncing its directory failed: {}",
                target.display(),
                e
            );
        }
        Ok(())
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Discarded aborted rewrite {}", self.path.display()),
            Err(e) => tracing::warn!("Failed to discard {}: {}", self.path.display(), e),
        }
    }
}

/// Make the rename itself durable
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
