//! Store Scan
//!
//! One full pass over a snapshot of the record file.

use std::io::Cursor;

use crate::codec::{Record, RecordReader};
use crate::error::Result;

/// Lazy iterator over the records of one store snapshot
///
/// The raw file bytes are copied into memory while the shared lock is held,
/// and the lock is released before the first record is decoded. This trades
/// memory proportional to the file size for a lock hold time that does not
/// depend on how slowly the caller consumes the records. Decoding errors
/// surface as the item where they occur; iteration stops after the first one.
pub struct Scan {
    reader: RecordReader<Cursor<Vec<u8>>>,
}

impl Scan {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self {
            reader: RecordReader::new(Cursor::new(bytes)),
        }
    }

    pub(crate) fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Iterator for Scan {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next()
    }
}
