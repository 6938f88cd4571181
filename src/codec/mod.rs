//! Record Codec Module
//!
//! Lossless framing of key-value records into a byte stream.
//!
//! ## Responsibilities
//! - Escape reserved bytes inside keys and values
//! - Frame each record with a field separator and a record terminator
//! - Stream-decode records, surfacing framing violations as errors
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ Record 1                                         │
//! │ ┌──────────────┬──────┬────────────────┬──────┐ │
//! │ │ escaped(key) │ 0x1D │ escaped(value) │ 0x1E │ │
//! │ └──────────────┴──────┴────────────────┴──────┘ │
//! ├──────────────────────────────────────────────────┤
//! │ Record 2                                         │
//! │ ┌──────────────┬──────┬────────────────┬──────┐ │
//! │ │ escaped(key) │ 0x1D │ escaped(value) │ 0x1E │ │
//! │ └──────────────┴──────┴────────────────┴──────┘ │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Escaping: any of `0x1B`, `0x1D`, `0x1E` inside a key or value is written
//! as `0x1B` followed by the byte itself. Every other byte is literal.

mod record;
mod writer;
mod reader;

pub use record::{Record, ESCAPE, FIELD_SEP, RECORD_END};
pub use writer::{encode, encoded_len, write_record};
pub use reader::{decode, RecordReader};
