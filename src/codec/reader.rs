//! Record Reader
//!
//! Stream-decodes framed records. Framing violations are returned as
//! `MalformedRecord`; the reader never skips over a corrupt record.

use std::io::{BufRead, ErrorKind};

use crate::error::{EmberError, Result};

use super::{Record, ESCAPE, FIELD_SEP, RECORD_END};

/// Which half of a record is being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Key,
    Value,
}

impl Field {
    fn name(self) -> &'static str {
        match self {
            Field::Key => "key",
            Field::Value => "value",
        }
    }
}

/// Reads records one at a time from a buffered byte stream
pub struct RecordReader<R> {
    inner: R,
    /// Bytes consumed from the stream so far
    offset: u64,
    /// Records successfully decoded so far
    records_read: u64,
    /// Set after the first error so iteration stops
    failed: bool,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            records_read: 0,
            failed: false,
        }
    }

    /// Decode the next record
    ///
    /// Returns:
    /// - `Ok(Some(record))`: a complete record
    /// - `Ok(None)`: clean end of stream (no partial record pending)
    /// - `Err(MalformedRecord)`: framing violation
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let start = self.offset;

        // Clean EOF is only legal on a record boundary
        if self.peek_byte()?.is_none() {
            return Ok(None);
        }

        let key = self.read_field(Field::Key, start)?;
        let value = self.read_field(Field::Value, start)?;

        self.records_read += 1;
        Ok(Some(Record { key, value }))
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Records decoded so far
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Read one escaped field up to (and consuming) its terminator
    fn read_field(&mut self, field: Field, record_start: u64) -> Result<Vec<u8>> {
        let mut out = Vec::new();

        loop {
            let byte = match self.read_byte()? {
                Some(b) => b,
                None => {
                    return Err(self.malformed(
                        record_start,
                        format!("stream ended inside {}", field.name()),
                    ))
                }
            };

            match (byte, field) {
                (ESCAPE, _) => match self.read_byte()? {
                    Some(literal) => out.push(literal),
                    None => {
                        return Err(self.malformed(
                            record_start,
                            "escape byte at end of stream".to_string(),
                        ))
                    }
                },
                (FIELD_SEP, Field::Key) | (RECORD_END, Field::Value) => return Ok(out),
                (RECORD_END, Field::Key) => {
                    return Err(self.malformed(
                        record_start,
                        "record terminated before key/value separator".to_string(),
                    ))
                }
                (FIELD_SEP, Field::Value) => {
                    return Err(self.malformed(
                        record_start,
                        "unescaped separator inside value".to_string(),
                    ))
                }
                (literal, _) => out.push(literal),
            }
        }
    }

    fn malformed(&mut self, record_start: u64, reason: String) -> EmberError {
        self.failed = true;
        EmberError::MalformedRecord(format!(
            "record #{} at offset {}: {}",
            self.records_read + 1,
            record_start,
            reason
        ))
    }

    fn peek_byte(&mut self) -> Result<Option<u8>> {
        loop {
            match self.inner.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.peek_byte()?;
        if byte.is_some() {
            self.inner.consume(1);
            self.offset += 1;
        }
        Ok(byte)
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode the first record in `bytes`
///
/// Returns the record and the number of bytes it occupied, or `None` if
/// `bytes` is empty.
pub fn decode(bytes: &[u8]) -> Result<Option<(Record, usize)>> {
    let mut reader = RecordReader::new(bytes);
    match reader.next_record()? {
        Some(record) => Ok(Some((record, reader.offset() as usize))),
        None => Ok(None),
    }
}
