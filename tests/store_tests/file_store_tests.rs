//! Tests for Store
//!
//! These tests verify:
//! - Lookup, append, upsert and remove on the record file
//! - Missing-file behavior and empty-file creation
//! - Deduplication keeping the first occurrence
//! - Concurrent writers through the advisory lock
//! - Malformed files surfacing as errors

use std::fs;
use std::sync::Arc;
use std::thread;

use emberkv::codec::{encode, Record};
use emberkv::store::{FileLock, LockMode, Store};
use emberkv::EmberError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open(temp_dir.path().join("kv.db")).unwrap();
    (temp_dir, store)
}

fn collect(store: &Store) -> Vec<Record> {
    store.scan().unwrap().map(Result::unwrap).collect()
}

// =============================================================================
// Open / Create Tests
// =============================================================================

#[test]
fn test_open_does_not_create_file() {
    let (_temp, store) = setup_temp_store();

    assert!(!Store::exists(store.path()));
    assert_eq!(store.lookup(b"anything").unwrap(), None);
    assert!(collect(&store).is_empty());
    assert!(store.is_empty().unwrap());
}

#[test]
fn test_open_creates_parent_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("dir").join("kv.db");

    let store = Store::open(&path).unwrap();
    store.upsert(b"k", b"v").unwrap();

    assert!(path.exists());
}

#[test]
fn test_create_empty_never_truncates() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("kv.db");

    assert!(Store::create_empty(&path).unwrap());
    assert!(Store::exists(&path));
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);

    let store = Store::open(&path).unwrap();
    store.upsert(b"keep", b"me").unwrap();

    assert!(!Store::create_empty(&path).unwrap());
    assert_eq!(store.lookup(b"keep").unwrap(), Some(b"me".to_vec()));
}

// =============================================================================
// Read / Write Tests
// =============================================================================

#[test]
fn test_upsert_inserts_then_updates() {
    let (_temp, store) = setup_temp_store();

    store.upsert(b"name", b"first").unwrap();
    store.upsert(b"other", b"x").unwrap();
    store.upsert(b"name", b"second").unwrap();

    assert_eq!(store.lookup(b"name").unwrap(), Some(b"second".to_vec()));
    assert_eq!(
        collect(&store),
        vec![Record::new("name", "second"), Record::new("other", "x")]
    );
}

#[test]
fn test_upsert_is_idempotent() {
    let (_temp, store) = setup_temp_store();

    store.upsert(b"k", b"v").unwrap();
    let once = fs::read(store.path()).unwrap();
    store.upsert(b"k", b"v").unwrap();
    let twice = fs::read(store.path()).unwrap();

    assert_eq!(once, twice);
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn test_upsert_updates_every_duplicate() {
    let (_temp, store) = setup_temp_store();
    store.append(b"dup", b"a").unwrap();
    store.append(b"mid", b"m").unwrap();
    store.append(b"dup", b"b").unwrap();

    store.upsert(b"dup", b"c").unwrap();

    assert_eq!(
        collect(&store),
        vec![
            Record::new("dup", "c"),
            Record::new("mid", "m"),
            Record::new("dup", "c"),
        ]
    );
}

#[test]
fn test_lookup_returns_first_match() {
    let (_temp, store) = setup_temp_store();
    store.append(b"k", b"first").unwrap();
    store.append(b"k", b"second").unwrap();

    assert_eq!(store.lookup(b"k").unwrap(), Some(b"first".to_vec()));
}

#[test]
fn test_file_layout_is_plain_concatenation() {
    let (_temp, store) = setup_temp_store();
    store.upsert(b"a\x1db", b"c\x1ed").unwrap();
    store.upsert(b"e", b"f").unwrap();

    let mut expected = encode(b"a\x1db", b"c\x1ed").to_vec();
    expected.extend_from_slice(&encode(b"e", b"f"));

    assert_eq!(fs::read(store.path()).unwrap(), expected);
}

#[test]
fn test_remove() {
    let (_temp, store) = setup_temp_store();
    store.append(b"gone", b"1").unwrap();
    store.append(b"stay", b"2").unwrap();
    store.append(b"gone", b"3").unwrap();

    assert!(store.remove(b"gone").unwrap());
    assert_eq!(store.lookup(b"gone").unwrap(), None);
    assert_eq!(collect(&store), vec![Record::new("stay", "2")]);
}

#[test]
fn test_remove_missing_leaves_file_untouched() {
    let (_temp, store) = setup_temp_store();
    store.upsert(b"k", b"v").unwrap();
    let before = fs::read(store.path()).unwrap();

    assert!(!store.remove(b"missing").unwrap());
    assert_eq!(fs::read(store.path()).unwrap(), before);
}

#[test]
fn test_remove_on_missing_file() {
    let (_temp, store) = setup_temp_store();

    assert!(!store.remove(b"k").unwrap());
    assert!(!Store::exists(store.path()));
}

// =============================================================================
// Deduplication Tests
// =============================================================================

#[test]
fn test_deduplicate_keeps_first_occurrence() {
    let (_temp, store) = setup_temp_store();
    store.append(b"a", b"1").unwrap();
    store.append(b"b", b"2").unwrap();
    store.append(b"a", b"3").unwrap();
    store.append(b"c", b"4").unwrap();
    store.append(b"b", b"5").unwrap();

    assert_eq!(store.deduplicate().unwrap(), 3);
    assert_eq!(
        collect(&store),
        vec![
            Record::new("a", "1"),
            Record::new("b", "2"),
            Record::new("c", "4"),
        ]
    );
}

#[test]
fn test_deduplicate_without_duplicates_is_noop() {
    let (_temp, store) = setup_temp_store();
    store.upsert(b"a", b"1").unwrap();
    store.upsert(b"b", b"2").unwrap();
    let before = fs::read(store.path()).unwrap();

    assert_eq!(store.deduplicate().unwrap(), 2);
    assert_eq!(fs::read(store.path()).unwrap(), before);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_malformed_file_surfaces_error() {
    let (_temp, store) = setup_temp_store();
    let mut bytes = encode(b"ok", b"1").to_vec();
    bytes.extend_from_slice(b"truncated");
    fs::write(store.path(), &bytes).unwrap();

    // The intact first record is still found
    assert_eq!(store.lookup(b"ok").unwrap(), Some(b"1".to_vec()));

    assert!(matches!(
        store.lookup(b"other"),
        Err(EmberError::MalformedRecord(_))
    ));

    let items: Vec<_> = store.scan().unwrap().collect();
    assert_eq!(items.len(), 2);
    assert!(items[1].is_err());

    // Mutations refuse to rewrite a file they cannot parse
    assert!(store.upsert(b"new", b"v").is_err());
    assert_eq!(fs::read(store.path()).unwrap(), bytes);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_upserts_all_land() {
    let (_temp, store) = setup_temp_store();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..20 {
                    let key = format!("t{}-k{}", t, i);
                    store.upsert(key.as_bytes(), b"v").unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len().unwrap(), 80);
    assert_eq!(store.deduplicate().unwrap(), 80);
}

#[test]
fn test_readers_see_whole_file_states() {
    let (_temp, store) = setup_temp_store();
    store.upsert(b"counter", b"0").unwrap();
    let store = Arc::new(store);

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 1..=50 {
                store.upsert(b"counter", i.to_string().as_bytes()).unwrap();
            }
        })
    };

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..50 {
                let records: Vec<Record> = store.scan().unwrap().map(Result::unwrap).collect();
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].key, b"counter");
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(store.lookup(b"counter").unwrap(), Some(b"50".to_vec()));
}

#[test]
fn test_exclusive_lock_blocks_writer() {
    let (_temp, store) = setup_temp_store();
    store.upsert(b"k", b"before").unwrap();

    let guard = FileLock::acquire(store.lock_path(), LockMode::Exclusive).unwrap();
    assert_eq!(guard.mode(), LockMode::Exclusive);

    let writer = {
        let store = store.clone();
        thread::spawn(move || store.upsert(b"k", b"after").unwrap())
    };

    thread::sleep(std::time::Duration::from_millis(100));
    assert_eq!(fs::read(store.path()).unwrap(), encode(b"k", b"before").to_vec());

    drop(guard);
    writer.join().unwrap();
    assert_eq!(store.lookup(b"k").unwrap(), Some(b"after".to_vec()));
}
