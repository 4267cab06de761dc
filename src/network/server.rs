//! TCP Server
//!
//! Accepts connections and serves each one on its own thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::sync::WaitGroup;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{write_response, Response};

use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// TCP server for SiltKV
///
/// One acceptor thread (the caller of [`run`](Server::run)) spawns a thread
/// per accepted connection. Once `max_connections` are open, new ones are
/// answered with an error and closed.
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: ShutdownHandle,
    active: Arc<AtomicUsize>,
}

/// Cloneable handle that stops a running server
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    /// Ask the server to stop accepting and wait for open connections
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Holds one slot of the connection cap until dropped
struct ConnectionSlot(Arc<AtomicUsize>);

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: ShutdownHandle(Arc::new(AtomicBool::new(false))),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Serve until shut down (blocking)
    ///
    /// After shutdown, returns once every open connection has ended (client
    /// disconnect or read timeout).
    pub fn run(self) -> Result<()> {
        let open_connections = WaitGroup::new();

        tracing::info!(
            addr = %self.local_addr()?,
            max_connections = self.config.max_connections,
            "server listening"
        );

        let mut next_id: u64 = 0;
        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    // Accepted sockets may inherit non-blocking mode
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!(peer = %addr, error = %e, "failed to configure socket");
                        continue;
                    }
                    let Some(slot) = self.claim_slot() else {
                        tracing::warn!(peer = %addr, "connection limit reached, refusing");
                        let mut stream = stream;
                        let _ = write_response(&mut stream, &Response::error("server busy"));
                        continue;
                    };
                    next_id += 1;
                    self.spawn_connection(next_id, stream, slot, open_connections.clone());
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }

        tracing::info!(
            open = self.active_connections(),
            "shutting down, waiting for open connections"
        );
        open_connections.wait();
        Ok(())
    }

    fn claim_slot(&self) -> Option<ConnectionSlot> {
        let max = self.config.max_connections;
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|_| ConnectionSlot(Arc::clone(&self.active)))
    }

    fn spawn_connection(&self, id: u64, stream: TcpStream, slot: ConnectionSlot, wg: WaitGroup) {
        let engine = Arc::clone(&self.engine);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        let spawned = thread::Builder::new()
            .name(format!("siltkv-conn-{}", id))
            .spawn(move || {
                let _slot = slot;
                let _wg = wg;

                let mut conn = match Connection::new(stream, engine) {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to set up connection");
                        return;
                    }
                };
                if let Err(e) = conn.set_timeouts(read_ms, write_ms) {
                    tracing::warn!(peer = %conn.peer_addr(), error = %e, "failed to set timeouts");
                    return;
                }
                if let Err(e) = conn.handle() {
                    tracing::debug!(peer = %conn.peer_addr(), error = %e, "connection ended with error");
                }
            });

        // On failure the closure, and with it the stream and slot, is dropped
        if let Err(e) = spawned {
            tracing::error!(error = %e, "failed to spawn connection thread");
        }
    }
}
