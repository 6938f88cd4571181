//! Response definitions
//!
//! Represents results of executed commands and their wire form.

use crate::cache::CacheStatus;
use crate::codec::Record;
use crate::error::{EmberError, Result};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    BadRequest = 0x03,
}

/// Successful outcome of `Engine::execute`
#[derive(Debug, Clone)]
pub enum Reply {
    /// Completed with nothing to return
    Done,
    /// Value of a GET
    Value(Vec<u8>),
    /// Every record of a LIST
    Records(Vec<Record>),
    /// Cache snapshot
    CacheStatus(CacheStatus),
    /// Records kept by CLEANUP
    Count(u64),
    Pong,
}

/// A response to send to client
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (value, serialized structure, or error message)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Create a BAD_REQUEST response
    pub fn bad_request(message: &str) -> Self {
        Self {
            status: Status::BadRequest,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Encode a successful reply
    pub fn from_reply(reply: Reply) -> Result<Self> {
        let payload = match reply {
            Reply::Done => None,
            Reply::Value(value) => Some(value),
            Reply::Records(records) => Some(bincode::serialize(&records)?),
            Reply::CacheStatus(status) => Some(bincode::serialize(&status)?),
            Reply::Count(count) => Some(bincode::serialize(&count)?),
            Reply::Pong => Some(b"PONG".to_vec()),
        };
        Ok(Self::ok(payload))
    }

    /// Map an execution result onto a status
    ///
    /// EmptyInput → BAD_REQUEST, KeyNotFound → NOT_FOUND, anything else → ERROR.
    pub fn from_result(result: Result<Reply>) -> Self {
        match result.and_then(Self::from_reply) {
            Ok(response) => response,
            Err(EmberError::KeyNotFound) => Self::not_found(),
            Err(e @ EmberError::EmptyInput(_)) => Self::bad_request(&e.to_string()),
            Err(EmberError::BadRequest(message)) => Self::bad_request(&message),
            Err(e) => Self::error(&e.to_string()),
        }
    }

    /// Payload bytes (empty when absent)
    pub fn payload_bytes(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or(&[])
    }

    /// Payload interpreted as an error message
    pub fn message(&self) -> String {
        String::from_utf8_lossy(self.payload_bytes()).into_owned()
    }
}
