//! TCP Server
//!
//! Accepts connections and gives each its own handler thread.

use std::collections::HashMap;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::pool::ObjectPool;
use crate::protocol::RequestSlot;
use crate::store::MemStore;

use super::Connection;

/// How long the accept loop sleeps when no client is waiting
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Sockets of live connections, keyed by connection number
type OpenStreams = Arc<Mutex<HashMap<u64, TcpStream>>>;

/// TCP server for KVLDS
pub struct Server {
    config: Config,
    store: Arc<MemStore>,

    /// Shared by all connections: bounds requests in flight server-wide
    requests: ObjectPool<RequestSlot>,

    /// Live connection count
    active: Arc<AtomicUsize>,

    /// Handles used to close live connections on shutdown
    streams: OpenStreams,
    next_conn: u64,

    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Create a new server with the given config and store
    ///
    /// Fails with a configuration error if `config` does not validate.
    pub fn new(config: Config, store: Arc<MemStore>) -> Result<Self> {
        config.validate()?;
        let requests = ObjectPool::new("requests", config.request_pool_capacity);
        Ok(Self {
            config,
            store,
            requests,
            active: Arc::new(AtomicUsize::new(0)),
            streams: Arc::new(Mutex::new(HashMap::new())),
            next_conn: 0,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Bind the configured address and serve until shut down (blocking)
    pub fn run(&mut self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr)?;
        self.serve(listener)
    }

    /// Serve clients from an already bound listener (blocking)
    ///
    /// Once the shutdown flag is seen, every open connection is closed
    /// before returning.
    pub fn serve(&mut self, listener: TcpListener) -> Result<()> {
        listener.set_nonblocking(true)?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        while !self.shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, addr)) => self.spawn_connection(stream, addr)?,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_BACKOFF);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }
        }

        tracing::info!("Server shutting down");
        self.close_connections();
        Ok(())
    }

    fn spawn_connection(&mut self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        if self.active.load(Ordering::Acquire) >= self.config.max_connections {
            tracing::warn!(
                "Refusing {}: {} connections already open",
                addr,
                self.config.max_connections
            );
            return Ok(());
        }
        stream.set_nonblocking(false)?;
        let handle = stream.try_clone()?;

        let mut connection = match Connection::new(
            stream,
            Arc::clone(&self.store),
            self.requests.clone(),
            &self.config,
        ) {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!("Could not set up connection from {}: {}", addr, e);
                return Ok(());
            }
        };

        let conn_id = self.next_conn;
        self.next_conn += 1;
        self.streams.lock().insert(conn_id, handle);

        let active = Arc::clone(&self.active);
        let streams = Arc::clone(&self.streams);
        active.fetch_add(1, Ordering::AcqRel);
        thread::Builder::new()
            .name(format!("kvlds-conn-{}", addr))
            .spawn(move || {
                if let Err(e) = connection.handle() {
                    tracing::warn!("Connection {} ended with error: {}", connection.peer_addr(), e);
                }
                streams.lock().remove(&conn_id);
                active.fetch_sub(1, Ordering::AcqRel);
            })?;
        Ok(())
    }

    /// Shut down every tracked socket, waking handlers blocked on a read
    fn close_connections(&self) {
        let streams: Vec<TcpStream> = self.streams.lock().drain().map(|(_, s)| s).collect();
        if !streams.is_empty() {
            tracing::debug!("Closing {} open connections", streams.len());
        }
        for stream in streams {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    /// Stop accepting clients and close open connections
    ///
    /// Takes effect on the next pass of the accept loop. A request being
    /// answered at that moment may lose its response.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Flag with the same effect as [`Server::shutdown`], for use from other threads
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}
