//! Stream Transport Tests
//!
//! Tests for StreamReader / StreamWriter.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use kvlds::wire::{
    encode_frame, read_frame, Packet, PacketReader, PacketWriter, StreamReader, StreamWriter,
};
use kvlds::KvldsError;
use parking_lot::Mutex;

const MAX: usize = 1024;
const WAIT: Option<Duration> = Some(Duration::from_secs(5));

fn reader_over(frames: &[(u64, &[u8])]) -> StreamReader {
    let mut bytes = Vec::new();
    for (id, payload) in frames {
        bytes.extend(encode_frame(*id, payload).unwrap());
    }
    StreamReader::spawn(Cursor::new(bytes), MAX).unwrap()
}

/// Register a read whose outcome lands in the returned slot
fn read_into(reader: &mut StreamReader) -> (Arc<Mutex<Option<Option<Packet>>>>, kvlds::wire::ReadToken) {
    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    let token = reader
        .read_packet(Box::new(move |packet| {
            *sink.lock() = Some(packet);
            Ok(())
        }))
        .unwrap();
    (slot, token)
}

// =============================================================================
// StreamReader Tests
// =============================================================================

#[test]
fn test_poll_delivers_packets_in_order() {
    let mut reader = reader_over(&[(1, &b"one"[..]), (2, &b"two"[..])]);

    for (id, payload) in [(1u64, &b"one"[..]), (2, &b"two"[..])] {
        let (slot, _token) = read_into(&mut reader);
        assert!(slot.lock().is_none(), "completion ran inside read_packet");

        assert!(reader.poll(WAIT).unwrap());
        let packet = slot.lock().take().unwrap().unwrap();
        assert_eq!(packet.id, id);
        assert_eq!(packet.buf, payload);
    }
}

#[test]
fn test_end_of_stream_delivers_none() {
    let mut reader = reader_over(&[(1, &b"only"[..])]);

    let (slot, _token) = read_into(&mut reader);
    reader.poll(WAIT).unwrap();
    assert!(slot.lock().take().unwrap().is_some());

    let (slot, _token) = read_into(&mut reader);
    assert!(reader.poll(WAIT).unwrap());
    assert!(slot.lock().take().unwrap().is_none());
    assert!(reader.is_closed());

    // Further reads fail straight away
    let (slot, _token) = read_into(&mut reader);
    assert!(reader.poll(WAIT).unwrap());
    assert!(slot.lock().take().unwrap().is_none());
}

#[test]
fn test_poll_without_pending_read() {
    let mut reader = reader_over(&[(1, &b"x"[..])]);
    assert!(!reader.poll(Some(Duration::from_millis(10))).unwrap());
}

#[test]
fn test_second_pending_read_is_refused() {
    let mut reader = reader_over(&[]);

    let (_slot, _token) = read_into(&mut reader);
    let second = reader.read_packet(Box::new(|_| Ok(())));
    assert!(matches!(second, Err(KvldsError::Transport(_))));
}

#[test]
fn test_cancel_drops_callback_and_keeps_packet() {
    let mut reader = reader_over(&[(7, &b"kept"[..])]);

    let (cancelled, token) = read_into(&mut reader);
    reader.cancel(token);
    assert!(!reader.is_pending());
    assert!(!reader.poll(Some(Duration::from_millis(10))).unwrap());
    assert!(cancelled.lock().is_none());

    let (slot, _token) = read_into(&mut reader);
    assert!(reader.poll(WAIT).unwrap());
    assert_eq!(slot.lock().take().unwrap().unwrap().id, 7);
}

// =============================================================================
// StreamWriter Tests
// =============================================================================

#[test]
fn test_writer_frames_packets_in_order() {
    let mut writer = StreamWriter::new(Vec::new());
    writer.write_packet(1, b"a").unwrap();
    writer.write_packet(2, b"bc").unwrap();

    let mut cursor = Cursor::new(writer.get_ref().clone());
    assert_eq!(read_frame(&mut cursor, MAX).unwrap().unwrap().buf, b"a");
    assert_eq!(read_frame(&mut cursor, MAX).unwrap().unwrap().id, 2);
    assert!(read_frame(&mut cursor, MAX).unwrap().is_none());
}
