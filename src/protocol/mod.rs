//! Protocol Module
//!
//! Defines the wire protocol between the server and its clients.
//!
//! ## Protocol Format (V1 - Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: GET          - Payload: key_len (4) + key
//! - 0x02: SET          - Payload: key_len (4) + key + value
//! - 0x03: REMOVE       - Payload: key_len (4) + key
//! - 0x04: LIST         - Payload: empty
//! - 0x05: CACHE_STATUS - Payload: empty
//! - 0x06: PING         - Payload: empty
//! - 0x07: CLEANUP      - Payload: empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND
//! - 0x02: ERROR
//! - 0x03: BAD_REQUEST
//!
//! GET answers with the raw value; LIST, CACHE_STATUS and CLEANUP answer
//! with a bincode-serialized `Vec<Record>`, `CacheStatus` or `u64`.

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::{Reply, Response, Status};
pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
