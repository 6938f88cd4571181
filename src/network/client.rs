//! TCP Client
//!
//! Blocking client speaking the wire protocol, one request at a time.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::cache::CacheStatus;
use crate::codec::Record;
use crate::error::{EmberError, Result};
use crate::protocol::{read_response, write_command, Command, Response, Status};

/// Connection to an `emberkv-server`
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to `addr`
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| EmberError::Network(format!("Failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Apply the same timeout to reads and writes
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        self.writer.get_ref().set_write_timeout(timeout)?;
        Ok(())
    }

    /// Value for `key`, `None` if absent
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let response = self.call(&Command::Get { key: key.to_vec() })?;
        match response.status {
            Status::NotFound => Ok(None),
            _ => Ok(Some(Self::expect_ok(response)?.payload.unwrap_or_default())),
        }
    }

    /// Insert or overwrite `key`
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let response = self.call(&Command::Set {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;
        Self::expect_ok(response).map(|_| ())
    }

    /// Remove `key`; returns whether it existed
    pub fn remove(&mut self, key: &[u8]) -> Result<bool> {
        let response = self.call(&Command::Remove { key: key.to_vec() })?;
        match response.status {
            Status::NotFound => Ok(false),
            _ => Self::expect_ok(response).map(|_| true),
        }
    }

    /// Every record on the server's disk
    pub fn list(&mut self) -> Result<Vec<Record>> {
        let response = self.call(&Command::List)?;
        Self::decode_payload(Self::expect_ok(response)?)
    }

    /// The server's cache snapshot
    pub fn cache_status(&mut self) -> Result<CacheStatus> {
        let response = self.call(&Command::CacheStatus)?;
        Self::decode_payload(Self::expect_ok(response)?)
    }

    /// Deduplicate the server's record file; returns records kept
    pub fn cleanup(&mut self) -> Result<u64> {
        let response = self.call(&Command::Cleanup)?;
        Self::decode_payload(Self::expect_ok(response)?)
    }

    /// Health check
    pub fn ping(&mut self) -> Result<()> {
        let response = Self::expect_ok(self.call(&Command::Ping)?)?;
        match response.payload.as_deref() {
            Some(b"PONG") => Ok(()),
            _ => Err(EmberError::Protocol(format!(
                "Unexpected ping reply: {:?}",
                response.message()
            ))),
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn call(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// Turn non-OK statuses into errors
    fn expect_ok(response: Response) -> Result<Response> {
        match response.status {
            Status::Ok => Ok(response),
            Status::NotFound => Err(EmberError::KeyNotFound),
            Status::BadRequest => Err(EmberError::BadRequest(response.message())),
            Status::Error => Err(EmberError::Network(format!(
                "Server error: {}",
                response.message()
            ))),
        }
    }

    fn decode_payload<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        Ok(bincode::deserialize(response.payload_bytes())?)
    }
}
