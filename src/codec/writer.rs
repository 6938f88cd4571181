//! Record Writer
//!
//! Encodes records into their framed, escaped byte form.

use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::Result;

use super::{Record, ESCAPE, FIELD_SEP, RECORD_END};

/// Encode one record: `escaped(key) FIELD_SEP escaped(value) RECORD_END`
pub fn encode(key: &[u8], value: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(encoded_len(key, value));
    put_escaped(&mut buf, key);
    buf.put_u8(FIELD_SEP);
    put_escaped(&mut buf, value);
    buf.put_u8(RECORD_END);
    buf.freeze()
}

/// Exact size of the encoded record, including escapes and both delimiters
pub fn encoded_len(key: &[u8], value: &[u8]) -> usize {
    let escapes = key
        .iter()
        .chain(value.iter())
        .filter(|&&b| Record::is_reserved(b))
        .count();
    key.len() + value.len() + escapes + 2
}

/// Write one framed record to `writer`
///
/// I/O faults propagate; nothing is flushed here, callers decide when to sync.
pub fn write_record<W: Write>(writer: &mut W, key: &[u8], value: &[u8]) -> Result<()> {
    writer.write_all(&encode(key, value))?;
    Ok(())
}

fn put_escaped(buf: &mut BytesMut, data: &[u8]) {
    for &byte in data {
        if Record::is_reserved(byte) {
            buf.put_u8(ESCAPE);
        }
        buf.put_u8(byte);
    }
}
