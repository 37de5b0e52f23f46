//! Packet framing
//!
//! Encoding and decoding of checksummed packet frames.

use std::io::{ErrorKind, Read};

use crate::error::{KvldsError, Result};

use super::Packet;

/// Header size: 8 byte id + 4 byte length + 4 byte header checksum
pub const HEADER_SIZE: usize = 16;

/// Trailer size: 4 byte payload checksum
pub const TRAILER_SIZE: usize = 4;

/// Bytes a frame adds around its payload
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + TRAILER_SIZE;

/// Encode one packet as a frame
///
/// Fails with `PacketTooLarge` if the payload length does not fit the
/// 4 byte length field.
pub fn encode_frame(id: u64, payload: &[u8]) -> Result<Vec<u8>> {
    let len = payload_len(payload.len())?;

    let mut frame = Vec::with_capacity(FRAME_OVERHEAD + payload.len());
    frame.extend_from_slice(&id.to_be_bytes());
    frame.extend_from_slice(&len.to_be_bytes());
    let header_crc = crc32fast::hash(&frame);
    frame.extend_from_slice(&header_crc.to_be_bytes());
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&crc32fast::hash(payload).to_be_bytes());
    Ok(frame)
}

/// Length field value for a payload of `len` bytes
fn payload_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| KvldsError::PacketTooLarge {
        len,
        max: u32::MAX as usize,
    })
}

/// Read one frame from a stream
///
/// Returns `Ok(None)` on a clean end of stream between frames.
pub fn read_frame<R: Read>(reader: &mut R, max_payload: usize) -> Result<Option<Packet>> {
    let mut header = [0u8; HEADER_SIZE];
    if !read_header(reader, &mut header)? {
        return Ok(None);
    }

    let expected = u32::from_be_bytes([header[12], header[13], header[14], header[15]]);
    if crc32fast::hash(&header[..12]) != expected {
        return Err(KvldsError::BadChecksum("packet header"));
    }

    let id = u64::from_be_bytes([
        header[0], header[1], header[2], header[3], header[4], header[5], header[6], header[7],
    ]);
    let len = u32::from_be_bytes([header[8], header[9], header[10], header[11]]) as usize;
    if len > max_payload {
        return Err(KvldsError::PacketTooLarge {
            len,
            max: max_payload,
        });
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    let mut trailer = [0u8; TRAILER_SIZE];
    reader.read_exact(&mut trailer)?;
    if crc32fast::hash(&buf) != u32::from_be_bytes(trailer) {
        return Err(KvldsError::BadChecksum("packet payload"));
    }

    Ok(Some(Packet { id, buf }))
}

/// Fill `header`, distinguishing EOF before the first byte from EOF mid-header
fn read_header<R: Read>(reader: &mut R, header: &mut [u8; HEADER_SIZE]) -> Result<bool> {
    let mut filled = 0;
    while filled < HEADER_SIZE {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(std::io::Error::from(ErrorKind::UnexpectedEof).into()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}
