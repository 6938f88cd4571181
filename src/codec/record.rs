//! Record definitions
//!
//! The unit of storage and the reserved framing bytes.

use serde::{Deserialize, Serialize};

/// Escape byte (ASCII ESC). The byte after it is always taken literally.
pub const ESCAPE: u8 = 0x1B;

/// Separates the key from the value (ASCII GS)
pub const FIELD_SEP: u8 = 0x1D;

/// Terminates a record (ASCII RS)
pub const RECORD_END: u8 = 0x1E;

/// A single key-value pair as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Record {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Whether a byte must be escaped when written
    #[inline]
    pub fn is_reserved(byte: u8) -> bool {
        matches!(byte, ESCAPE | FIELD_SEP | RECORD_END)
    }
}
