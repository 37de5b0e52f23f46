//! Connection Handler
//!
//! Handles individual client connections.

use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};

use crate::config::Config;
use crate::error::{KvldsError, Result};
use crate::pool::ObjectPool;
use crate::protocol::{Request, RequestReader, RequestSlot};
use crate::store::MemStore;
use crate::wire::{StreamReader, StreamWriter};

/// Handles a single client connection
pub struct Connection {
    /// Request reader over the inbound half of the stream
    reader: RequestReader<StreamReader>,

    /// Packet writer over the outbound half (buffered, flushed per packet)
    writer: StreamWriter<TcpStream>,

    /// Completed reads, delivered by the read callback
    delivered: Receiver<Option<Request>>,
    deliver: Sender<Option<Request>>,

    /// Reference to the storage engine
    store: Arc<MemStore>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// `requests` is shared with every other connection, so it bounds the
    /// requests in flight server-wide.
    pub fn new(
        stream: TcpStream,
        store: Arc<MemStore>,
        requests: ObjectPool<RequestSlot>,
        config: &Config,
    ) -> Result<Self> {
        config.validate()?;

        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let transport = StreamReader::spawn(stream.try_clone()?, config.max_packet_size)?;
        let reads = ObjectPool::new("request reads", config.read_pool_capacity);
        let (deliver, delivered) = channel::bounded(1);

        Ok(Self {
            reader: RequestReader::with_pools(transport, reads, requests),
            writer: StreamWriter::new(stream),
            delivered,
            deliver,
            store,
            peer_addr,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads requests one at a time and answers each before reading the
    /// next. Returns when the client disconnects or sends garbage.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let Some(request) = self.next_request()? else {
                if self.reader.transport().is_closed() {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                } else {
                    tracing::warn!("Dropping client {} after a bad request", self.peer_addr);
                }
                return Ok(());
            };

            tracing::trace!("Received request from {}: {:?}", self.peer_addr, request);

            if let Err(e) = self.store.execute(&request, &mut self.writer) {
                if let KvldsError::Io(ref io_err) = e {
                    match io_err.kind() {
                        std::io::ErrorKind::ConnectionAborted
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::BrokenPipe => {
                            tracing::debug!(
                                "Client {} disconnected before response could be sent: {}",
                                self.peer_addr, e
                            );
                            return Ok(());
                        }
                        _ => {}
                    }
                }
                tracing::warn!("Error answering {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Read one request, blocking until it arrives or the read fails
    fn next_request(&mut self) -> Result<Option<Request>> {
        let deliver = self.deliver.clone();
        let _read = self.reader.read(move |request| {
            deliver
                .send(request)
                .map_err(|_| KvldsError::Transport("connection handler gone".to_string()))
        })?;

        self.reader.transport_mut().poll(None)?;

        self.delivered
            .try_recv()
            .map_err(|_| KvldsError::Transport("read completed without a result".to_string()))
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Wakes the decoder thread still blocked on the inbound half
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}
