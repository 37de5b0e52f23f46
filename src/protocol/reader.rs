//! Asynchronous request reader
//!
//! Reads one packet from a [`PacketReader`], parses it, and hands the
//! result to a callback.
//!
//! ## Lifecycle of one read
//! ```text
//!   read() ──▶ awaiting packet ──┬──▶ delivering ──▶ done
//!                                └──▶ cancelled
//! ```
//! - `read` never runs the callback itself; the transport does, later
//! - The callback gets `Some(request)` or `None` (transport or parse failure)
//!   and owns the request from then on
//! - `cancel` consumes the handle; afterwards the callback can never run

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{KvldsError, Result};
use crate::pool::{ObjectPool, Pooled};
use crate::wire::{Packet, PacketReader};

use super::parser::parse_request;
use super::request::{Request, RequestSlot};

/// Callback receiving the outcome of one read
pub type RequestCallback = Box<dyn FnOnce(Option<Request>) -> Result<()> + Send>;

/// Pool block holding the bookkeeping for one in-flight read
#[derive(Default)]
pub struct ReadSlot {
    callback: Option<RequestCallback>,
}

/// Shared between the returned handle and the transport's completion hook.
/// Whichever side takes the block first wins; the other finds `None`.
type ReadState = Arc<Mutex<Option<Pooled<ReadSlot>>>>;

/// Cancellation handle for one pending read
#[must_use = "dropping the handle leaves the read pending; pass it to cancel() to abort"]
pub struct ReadHandle<C> {
    state: ReadState,
    token: C,
}

impl<C> ReadHandle<C> {
    /// Whether the callback has yet to run
    pub fn is_pending(&self) -> bool {
        self.state.lock().is_some()
    }
}

impl<C> fmt::Debug for ReadHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadHandle")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Reads KVLDS requests from a packet transport
pub struct RequestReader<R: PacketReader> {
    transport: R,
    reads: ObjectPool<ReadSlot>,
    requests: ObjectPool<RequestSlot>,
}

impl<R: PacketReader> RequestReader<R> {
    /// Create a reader with pools sized from `config`
    ///
    /// Fails with [`KvldsError::Config`] if `config` does not validate.
    pub fn new(transport: R, config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_pools(
            transport,
            ObjectPool::new("request reads", config.read_pool_capacity),
            ObjectPool::new("requests", config.request_pool_capacity),
        ))
    }

    /// Create a reader drawing from existing pools
    ///
    /// Several readers may share the same pools, so the request pool bounds
    /// the requests outstanding across all of them.
    pub fn with_pools(
        transport: R,
        reads: ObjectPool<ReadSlot>,
        requests: ObjectPool<RequestSlot>,
    ) -> Self {
        Self {
            transport,
            reads,
            requests,
        }
    }

    /// Start reading one request
    ///
    /// Fails immediately if no read bookkeeping is available or the
    /// transport refuses the read; the callback is then never called.
    pub fn read<F>(&mut self, callback: F) -> Result<ReadHandle<R::Cancel>>
    where
        F: FnOnce(Option<Request>) -> Result<()> + Send + 'static,
    {
        let mut slot = self
            .reads
            .acquire()
            .ok_or(KvldsError::PoolExhausted(self.reads.name()))?;
        slot.callback = Some(Box::new(callback));

        let state: ReadState = Arc::new(Mutex::new(Some(slot)));
        let hook_state = Arc::clone(&state);
        let requests = self.requests.clone();

        // On failure the hook is dropped unrun, taking the slot with it
        let token = self
            .transport
            .read_packet(Box::new(move |packet| got_packet(&hook_state, &requests, packet)))?;

        Ok(ReadHandle { state, token })
    }

    /// Abort a pending read without running its callback
    pub fn cancel(&mut self, handle: ReadHandle<R::Cancel>) {
        self.transport.cancel(handle.token);
        if let Some(slot) = handle.state.lock().take() {
            self.reads.release(slot);
        }
    }

    pub fn transport(&self) -> &R {
        &self.transport
    }

    /// The transport, e.g. to drive its completions
    pub fn transport_mut(&mut self) -> &mut R {
        &mut self.transport
    }

    pub fn request_pool(&self) -> &ObjectPool<RequestSlot> {
        &self.requests
    }

    pub fn read_pool(&self) -> &ObjectPool<ReadSlot> {
        &self.reads
    }

    pub fn into_inner(self) -> R {
        self.transport
    }
}

/// Completion hook: parse what arrived and run the callback
fn got_packet(
    state: &ReadState,
    requests: &ObjectPool<RequestSlot>,
    packet: Option<Packet>,
) -> Result<()> {
    let Some(mut slot) = state.lock().take() else {
        // Cancelled after the transport had already committed to us
        return Ok(());
    };

    let request = match packet {
        Some(packet) => match parse_request(packet, requests) {
            Ok(request) => {
                tracing::trace!(id = request.id(), kind = %request.request_type(), "request parsed");
                Some(request)
            }
            // Nothing adopted the payload; it goes with the failure
            Err(failure) => {
                drop(failure);
                None
            }
        },
        None => {
            tracing::debug!("request read failed in transport");
            None
        }
    };

    let rc = match slot.callback.take() {
        Some(callback) => callback(request),
        None => Ok(()),
    };

    drop(slot);
    rc
}
