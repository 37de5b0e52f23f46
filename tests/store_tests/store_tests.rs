//! MemStore Tests
//!
//! Tests verify:
//! - Every request type executes with the right status
//! - Responses carry the request's correlation id
//! - RANGE bounds, size limit and continuation key

use kvlds::protocol::{
    decode_get, decode_params, decode_range, decode_status, parse_request, Command, RequestSlot,
    Status,
};
use kvlds::store::MemStore;
use kvlds::wire::Packet;
use kvlds::{Config, Key, ObjectPool};

// =============================================================================
// Helper Functions
// =============================================================================

fn key(bytes: &[u8]) -> Key<'_> {
    Key::new(bytes).unwrap()
}

/// Run one command against `store`, returning the single response packet
fn run(store: &MemStore, id: u64, command: Command<'_>) -> Packet {
    let pool: ObjectPool<RequestSlot> = ObjectPool::new("requests", 1);
    let request = parse_request(Packet::new(id, command.encode()), &pool).unwrap();

    let mut queue: Vec<Packet> = Vec::new();
    store.execute(&request, &mut queue).unwrap();
    assert_eq!(queue.len(), 1);

    let response = queue.pop().unwrap();
    assert_eq!(response.id, id);
    response
}

fn status(store: &MemStore, command: Command<'_>) -> Status {
    decode_status(&run(store, 1, command).buf).unwrap()
}

fn get(store: &MemStore, k: &[u8]) -> Option<Vec<u8>> {
    decode_get(&run(store, 1, Command::Get { key: key(k) }).buf).unwrap()
}

fn store_with(pairs: &[(&str, &str)]) -> MemStore {
    let store = MemStore::new();
    for (k, v) in pairs {
        store.set(k.as_bytes(), v.as_bytes());
    }
    store
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_params_reports_limits() {
    let config = Config::builder().key_max_len(64).value_max_len(200).build();
    let store = MemStore::with_config(&config);

    let response = run(&store, 3, Command::Params);
    assert_eq!(decode_params(&response.buf).unwrap(), (64, 200));
}

#[test]
fn test_set_then_get() {
    let store = MemStore::new();

    let s = status(&store, Command::Set { key: key(b"foo"), value: key(b"bar") });
    assert_eq!(s, Status::Ok);
    assert_eq!(get(&store, b"foo"), Some(b"bar".to_vec()));
}

#[test]
fn test_get_missing_key() {
    let store = MemStore::new();

    let response = run(&store, 1, Command::Get { key: key(b"nothing") });
    assert_eq!(response.buf, vec![0, 0, 0, 1]);
}

#[test]
fn test_add_only_when_absent() {
    let store = MemStore::new();

    assert_eq!(status(&store, Command::Add { key: key(b"k"), value: key(b"1") }), Status::Ok);
    assert_eq!(status(&store, Command::Add { key: key(b"k"), value: key(b"2") }), Status::Failed);
    assert_eq!(get(&store, b"k"), Some(b"1".to_vec()));
}

#[test]
fn test_modify_only_when_present() {
    let store = MemStore::new();

    assert_eq!(status(&store, Command::Modify { key: key(b"k"), value: key(b"1") }), Status::Failed);
    assert_eq!(get(&store, b"k"), None);

    store.set(b"k", b"0");
    assert_eq!(status(&store, Command::Modify { key: key(b"k"), value: key(b"1") }), Status::Ok);
    assert_eq!(get(&store, b"k"), Some(b"1".to_vec()));
}

#[test]
fn test_delete_is_idempotent() {
    let store = store_with(&[("k", "v")]);

    assert_eq!(status(&store, Command::Delete { key: key(b"k") }), Status::Ok);
    assert_eq!(status(&store, Command::Delete { key: key(b"k") }), Status::Ok);
    assert!(store.is_empty());
}

// =============================================================================
// Compare Operations Tests
// =============================================================================

#[test]
fn test_cas_swaps_on_match() {
    let store = store_with(&[("k", "old")]);

    let mismatch = Command::Cas { key: key(b"k"), oval: key(b"wrong"), value: key(b"new") };
    assert_eq!(status(&store, mismatch), Status::Failed);
    assert_eq!(get(&store, b"k"), Some(b"old".to_vec()));

    let matching = Command::Cas { key: key(b"k"), oval: key(b"old"), value: key(b"new") };
    assert_eq!(status(&store, matching), Status::Ok);
    assert_eq!(get(&store, b"k"), Some(b"new".to_vec()));
}

#[test]
fn test_cas_on_missing_key_fails() {
    let store = MemStore::new();

    let cas = Command::Cas { key: key(b"k"), oval: key(b""), value: key(b"v") };
    assert_eq!(status(&store, cas), Status::Failed);
    assert!(store.is_empty());
}

#[test]
fn test_cad_deletes_on_match() {
    let store = store_with(&[("k", "v")]);

    assert_eq!(status(&store, Command::Cad { key: key(b"k"), oval: key(b"x") }), Status::Failed);
    assert_eq!(store.len(), 1);

    assert_eq!(status(&store, Command::Cad { key: key(b"k"), oval: key(b"v") }), Status::Ok);
    assert!(store.is_empty());
}

// =============================================================================
// Range Tests
// =============================================================================

#[test]
fn test_range_returns_half_open_interval() {
    let store = store_with(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]);

    let response = run(&store, 1, Command::Range { max: 1024, start: key(b"b"), end: key(b"d") });
    let reply = decode_range(&response.buf).unwrap();

    assert_eq!(
        reply.pairs,
        vec![(b"b".to_vec(), b"2".to_vec()), (b"c".to_vec(), b"3".to_vec())]
    );
    assert_eq!(reply.next, b"d".to_vec());
}

#[test]
fn test_range_empty_end_means_unbounded() {
    let store = store_with(&[("a", "1"), ("zz", "2")]);

    let response = run(&store, 1, Command::Range { max: 1024, start: key(b""), end: key(b"") });
    let reply = decode_range(&response.buf).unwrap();

    assert_eq!(reply.pairs.len(), 2);
    assert!(reply.next.is_empty());
}

#[test]
fn test_range_respects_size_limit() {
    let store = store_with(&[("a", "11"), ("b", "22"), ("c", "33")]);

    // Each pair serializes to 5 bytes; 10 fits exactly two
    let response = run(&store, 1, Command::Range { max: 10, start: key(b""), end: key(b"") });
    let reply = decode_range(&response.buf).unwrap();

    assert_eq!(reply.pairs.len(), 2);
    assert_eq!(reply.next, b"c".to_vec());

    // Continue from where the first call stopped
    let response = run(&store, 2, Command::Range { max: 10, start: key(b"c"), end: key(b"") });
    let reply = decode_range(&response.buf).unwrap();
    assert_eq!(reply.pairs, vec![(b"c".to_vec(), b"33".to_vec())]);
    assert!(reply.next.is_empty());
}

#[test]
fn test_range_always_makes_progress() {
    let store = store_with(&[("a", "1"), ("b", "2")]);

    let response = run(&store, 1, Command::Range { max: 0, start: key(b""), end: key(b"") });
    let reply = decode_range(&response.buf).unwrap();

    assert_eq!(reply.pairs.len(), 1);
    assert_eq!(reply.next, b"b".to_vec());
}

#[test]
fn test_range_inverted_bounds_is_empty() {
    let store = store_with(&[("a", "1"), ("m", "2")]);

    let response = run(&store, 1, Command::Range { max: 1024, start: key(b"z"), end: key(b"b") });
    let reply = decode_range(&response.buf).unwrap();

    assert!(reply.pairs.is_empty());
    assert_eq!(reply.next, b"b".to_vec());
}
