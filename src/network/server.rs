//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.
//!
//! ```text
//!   accept loop ──(bounded channel)──▶ worker 1 ─▶ Connection::handle
//!   (non-blocking,                     worker 2 ─▶ Connection::handle
//!    polls shutdown)                   ...
//!                                      worker N (N = max_connections)
//!
//!   sweeper (if cache_sweep_interval is set) ─▶ Cache::purge_expired
//! ```

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{EmberError, Result};

use super::Connection;

/// TCP server for EmberKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// How long the accept loop sleeps when no connection is pending
    const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

    /// Bind `config.listen_addr`
    ///
    /// Port 0 binds an ephemeral port; see `local_addr`.
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            EmberError::Network(format!("Failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` is called (blocking)
    ///
    /// Open connections are closed once they are idle for a read timeout
    /// after shutdown; this returns when every worker has finished.
    pub fn run(&self) -> Result<()> {
        let workers = self.config.max_connections;
        let (tx, rx) = channel::bounded::<TcpStream>(workers);

        tracing::info!(
            "Listening on {} with {} workers",
            self.local_addr()?,
            workers
        );

        let scope_result = crossbeam::scope(|scope| {
            for id in 0..workers {
                let rx = rx.clone();
                scope.spawn(move |_| self.worker_loop(id, rx));
            }
            drop(rx);

            if let Some(interval) = self.config.cache_sweep_interval {
                scope.spawn(move |_| self.sweep_loop(interval));
            }

            let accepted = self.accept_loop(|stream| {
                // Blocks while every worker is busy and the queue is full
                tx.send(stream)
                    .map_err(|_| EmberError::Network("Worker pool is gone".to_string()))
            });

            // Workers drain the queue and exit once the sender is dropped
            drop(tx);
            accepted
        });

        match scope_result {
            Ok(result) => result,
            Err(_) => Err(EmberError::Network("A connection worker panicked".to_string())),
        }
    }

    /// Signal the server to shut down gracefully
    pub fn shutdown(&self) {
        tracing::info!("Shutdown requested");
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn accept_loop<F>(&self, mut dispatch: F) -> Result<()>
    where
        F: FnMut(TcpStream) -> Result<()>,
    {
        while !self.is_shutting_down() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    tracing::trace!("Accepted connection from {}", peer);
                    // Accepted sockets inherit non-blocking mode on some platforms
                    stream.set_nonblocking(false)?;
                    dispatch(stream)?;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(Self::ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(Self::ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Accept loop stopped");
        Ok(())
    }

    /// Drop expired cache entries every `interval` until shutdown
    fn sweep_loop(&self, interval: Duration) {
        let tick = interval.min(Self::ACCEPT_POLL_INTERVAL);
        let mut next_sweep = Instant::now() + interval;

        while !self.is_shutting_down() {
            thread::sleep(tick);
            if Instant::now() < next_sweep {
                continue;
            }
            next_sweep = Instant::now() + interval;

            let purged = self.engine.cache().purge_expired();
            if purged > 0 {
                tracing::debug!("Sweeper dropped {} expired cache entries", purged);
            }
        }
        tracing::trace!("Sweeper exiting");
    }

    fn worker_loop(&self, id: usize, rx: Receiver<TcpStream>) {
        for stream in rx.iter() {
            let engine = Arc::clone(&self.engine);
            let shutdown = Arc::clone(&self.shutdown);
            let result = Connection::new(stream, engine, shutdown).and_then(|mut conn| {
                conn.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;
                conn.handle()
            });

            if let Err(e) = result {
                tracing::debug!("Worker {} connection ended with error: {}", id, e);
            }
        }
        tracing::trace!("Worker {} exiting", id);
    }
}
