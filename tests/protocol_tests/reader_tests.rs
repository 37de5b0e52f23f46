//! Reader Tests
//!
//! Tests for the read → parse → deliver lifecycle and cancellation.

use std::sync::Arc;

use kvlds::protocol::{Command, Request, RequestReader, RequestType};
use kvlds::wire::{Packet, PacketCallback, PacketReader};
use kvlds::{Config, KvldsError, ObjectPool, Result};
use parking_lot::Mutex;

use crate::{key, request_pool};

// =============================================================================
// Test Transport
// =============================================================================

#[derive(Default)]
struct MockState {
    pending: Option<(u64, PacketCallback)>,
    next_token: u64,
    cancelled: Vec<u64>,
    refuse_reads: bool,
    /// Simulates a transport that already committed to delivering
    ignore_cancel: bool,
}

/// Transport whose completions are fired by hand
#[derive(Clone, Default)]
struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    fn complete(&self, packet: Option<Packet>) -> Result<()> {
        let (_, on_done) = self
            .state
            .lock()
            .pending
            .take()
            .expect("no read pending");
        on_done(packet)
    }

    fn is_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }
}

impl PacketReader for MockTransport {
    type Cancel = u64;

    fn read_packet(&mut self, on_done: PacketCallback) -> Result<u64> {
        let mut state = self.state.lock();
        if state.refuse_reads {
            return Err(KvldsError::Transport("refused".to_string()));
        }
        let token = state.next_token;
        state.next_token += 1;
        state.pending = Some((token, on_done));
        Ok(token)
    }

    fn cancel(&mut self, token: u64) {
        let mut state = self.state.lock();
        state.cancelled.push(token);
        if !state.ignore_cancel {
            state.pending = None;
        }
    }
}

/// Everything the callback was given, in order
type Delivered = Arc<Mutex<Vec<Option<Request>>>>;

fn setup(read_capacity: usize) -> (MockTransport, RequestReader<MockTransport>, Delivered) {
    let transport = MockTransport::default();
    let reader = RequestReader::with_pools(
        transport.clone(),
        ObjectPool::new("request reads", read_capacity),
        request_pool(8),
    );
    (transport, reader, Arc::new(Mutex::new(Vec::new())))
}

fn recorder(delivered: &Delivered) -> impl FnOnce(Option<Request>) -> Result<()> + Send + 'static {
    let delivered = Arc::clone(delivered);
    move |request| {
        delivered.lock().push(request);
        Ok(())
    }
}

fn get_packet(id: u64, k: &[u8]) -> Packet {
    Packet::new(id, Command::Get { key: key(k) }.encode())
}

// =============================================================================
// Delivery
// =============================================================================

#[test]
fn test_read_delivers_parsed_request() {
    let (transport, mut reader, delivered) = setup(4);

    let handle = reader.read(recorder(&delivered)).unwrap();
    assert!(handle.is_pending());
    assert!(delivered.lock().is_empty(), "callback ran inside read()");

    transport.complete(Some(get_packet(42, b"foo"))).unwrap();

    assert!(!handle.is_pending());
    let delivered = delivered.lock();
    assert_eq!(delivered.len(), 1);
    let request = delivered[0].as_ref().unwrap();
    assert_eq!(request.id(), 42);
    assert_eq!(request.request_type(), RequestType::Get);
    assert_eq!(request.key().unwrap(), b"foo");
}

#[test]
fn test_callback_owns_request() {
    let (transport, mut reader, delivered) = setup(4);

    let _handle = reader.read(recorder(&delivered)).unwrap();
    transport.complete(Some(get_packet(1, b"k"))).unwrap();

    assert_eq!(reader.read_pool().in_use(), 0);
    assert_eq!(reader.request_pool().in_use(), 1);

    delivered.lock().clear();
    assert_eq!(reader.request_pool().in_use(), 0);
}

#[test]
fn test_parse_failure_delivers_none() {
    let (transport, mut reader, delivered) = setup(4);

    let _handle = reader.read(recorder(&delivered)).unwrap();
    transport
        .complete(Some(Packet::new(1, vec![0xFF, 0xFF, 0xFF, 0xFF])))
        .unwrap();

    assert_eq!(delivered.lock().len(), 1);
    assert!(delivered.lock()[0].is_none());
    assert_eq!(reader.request_pool().in_use(), 0);
    assert_eq!(reader.read_pool().in_use(), 0);
}

#[test]
fn test_transport_failure_delivers_none() {
    let (transport, mut reader, delivered) = setup(4);

    let _handle = reader.read(recorder(&delivered)).unwrap();
    transport.complete(None).unwrap();

    assert_eq!(delivered.lock().len(), 1);
    assert!(delivered.lock()[0].is_none());
    assert_eq!(reader.read_pool().in_use(), 0);
}

#[test]
fn test_callback_error_propagates() {
    let (transport, mut reader, _) = setup(4);

    let _handle = reader
        .read(|_| Err(KvldsError::Protocol("callback failed".to_string())))
        .unwrap();
    let result = transport.complete(Some(get_packet(1, b"k")));

    assert!(matches!(result, Err(KvldsError::Protocol(_))));
    assert_eq!(reader.read_pool().in_use(), 0);
}

#[test]
fn test_sequential_reads() {
    let (transport, mut reader, delivered) = setup(1);

    for id in 0..10 {
        let _handle = reader.read(recorder(&delivered)).unwrap();
        transport.complete(Some(get_packet(id, b"k"))).unwrap();
    }

    let ids: Vec<u64> = delivered
        .lock()
        .iter()
        .map(|r| r.as_ref().unwrap().id())
        .collect();
    assert_eq!(ids, (0..10).collect::<Vec<_>>());
}

// =============================================================================
// Cancellation
// =============================================================================

#[test]
fn test_cancel_before_completion_never_calls_back() {
    let (transport, mut reader, delivered) = setup(4);

    let handle = reader.read(recorder(&delivered)).unwrap();
    reader.cancel(handle);

    assert!(!transport.is_pending());
    assert_eq!(transport.state.lock().cancelled, vec![0]);
    assert_eq!(reader.read_pool().in_use(), 0);
    assert!(delivered.lock().is_empty());
}

#[test]
fn test_late_completion_after_cancel_is_ignored() {
    let (transport, mut reader, delivered) = setup(4);
    transport.state.lock().ignore_cancel = true;

    let handle = reader.read(recorder(&delivered)).unwrap();
    reader.cancel(handle);
    transport.complete(Some(get_packet(1, b"k"))).unwrap();

    assert!(delivered.lock().is_empty());
    assert_eq!(reader.read_pool().in_use(), 0);
    assert_eq!(reader.request_pool().in_use(), 0);
}

#[test]
fn test_read_after_cancel() {
    let (transport, mut reader, delivered) = setup(1);

    let handle = reader.read(recorder(&delivered)).unwrap();
    reader.cancel(handle);

    let _handle = reader.read(recorder(&delivered)).unwrap();
    transport.complete(Some(get_packet(5, b"k"))).unwrap();

    assert_eq!(delivered.lock().len(), 1);
    assert_eq!(delivered.lock()[0].as_ref().unwrap().id(), 5);
}

// =============================================================================
// Synchronous Failures
// =============================================================================

#[test]
fn test_read_pool_exhaustion_fails_synchronously() {
    let (_transport, mut reader, delivered) = setup(1);

    let _first = reader.read(recorder(&delivered)).unwrap();
    let second = reader.read(recorder(&delivered));

    assert!(matches!(second, Err(KvldsError::PoolExhausted(_))));
    assert!(delivered.lock().is_empty());
}

#[test]
fn test_refused_read_releases_bookkeeping() {
    let (transport, mut reader, delivered) = setup(1);
    transport.state.lock().refuse_reads = true;

    let result = reader.read(recorder(&delivered));

    assert!(matches!(result, Err(KvldsError::Transport(_))));
    assert_eq!(reader.read_pool().in_use(), 0);
    assert!(delivered.lock().is_empty());
}

#[test]
fn test_new_rejects_zero_capacity_pools() {
    let config = Config::builder().request_pool_capacity(0).build();
    let result = RequestReader::new(MockTransport::default(), &config);
    assert!(matches!(result, Err(KvldsError::Config(_))));

    let config = Config::builder().read_pool_capacity(0).build();
    let result = RequestReader::new(MockTransport::default(), &config);
    assert!(matches!(result, Err(KvldsError::Config(_))));

    let reader = RequestReader::new(MockTransport::default(), &Config::default()).unwrap();
    assert_eq!(reader.request_pool().capacity(), 4096);
    assert_eq!(reader.read_pool().capacity(), 16);
}
