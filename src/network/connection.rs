//! Connection Handler
//!
//! Serves one client: read command, execute, write response, repeat.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{EmberError, Result};
use crate::protocol::{read_command, write_response, Command, Response};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Shared engine
    engine: Arc<Engine>,

    /// Server shutdown flag, checked whenever a read times out
    shutdown: Arc<AtomicBool>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, engine: Arc<Engine>, shutdown: Arc<AtomicBool>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Request/response traffic; don't wait to coalesce small writes
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            engine,
            shutdown,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 disables a timeout)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let to_timeout = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));

        self.reader.get_ref().set_read_timeout(to_timeout(read_ms))?;
        self.writer.get_ref().set_write_timeout(to_timeout(write_ms))?;

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// An idle client is kept; the read timeout only bounds how long it takes
    /// to notice a server shutdown. Returns `Ok` when the client disconnects
    /// or the server shuts down, `Err` on a protocol or I/O failure.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(EmberError::Io(ref e)) if is_hangup(e.kind()) => {
                    tracing::debug!("Client {} gone ({:?})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(EmberError::Io(ref e)) if is_timeout(e.kind()) => {
                    if self.shutdown.load(Ordering::SeqCst) {
                        tracing::debug!("Closing idle client {} for shutdown", self.peer_addr);
                        return Ok(());
                    }
                    continue;
                }
                Err(e @ EmberError::Protocol(_)) => {
                    // Framing is lost; report and drop the connection
                    tracing::warn!("Bad request from {}: {}", self.peer_addr, e);
                    let _ = self.send_response(Response::bad_request(&e.to_string()));
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send_response(Response::error(&e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!("Received {:?} from {}", command.command_type(), self.peer_addr);

            let response = self.execute_command(command);

            match self.send_response(response) {
                Ok(()) => {}
                Err(EmberError::Io(ref e)) if is_hangup(e.kind()) => {
                    tracing::debug!(
                        "Client {} disconnected before the response was sent",
                        self.peer_addr
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            }
        }
    }

    /// Execute a command and map the outcome onto a response status
    fn execute_command(&self, command: Command) -> Response {
        Response::from_result(self.engine.execute(command))
    }

    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_hangup(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}

/// Read timeouts surface as `WouldBlock` on unix and `TimedOut` on windows
fn is_timeout(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
