//! Wire Module
//!
//! Packet transport contracts and a stream-backed implementation.
//!
//! ## Packet Frame
//! ```text
//! ┌─────────┬─────────┬──────────┬─────────────┬──────────┐
//! │ ID (8)  │ Len (4) │ HCRC (4) │   Payload   │ PCRC (4) │
//! └─────────┴─────────┴──────────┴─────────────┴──────────┘
//! ```
//! `HCRC` covers ID and Len, `PCRC` covers the payload.
//!
//! ## Contracts
//! - [`PacketReader`]: deliver the next packet to a one-shot callback, or
//!   cancel that delivery
//! - [`PacketWriter`]: queue one packet; the bytes are consumed before the
//!   call returns

mod frame;
mod stream;

pub use frame::{encode_frame, read_frame, FRAME_OVERHEAD, HEADER_SIZE, TRAILER_SIZE};
pub use stream::{ReadToken, StreamReader, StreamWriter};

use crate::error::Result;

/// A transport-level unit: correlation id plus opaque payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    /// Correlation id, owned by the framing and never interpreted here
    pub id: u64,

    /// Payload bytes
    pub buf: Vec<u8>,
}

impl Packet {
    pub fn new(id: u64, buf: Vec<u8>) -> Self {
        Self { id, buf }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Completion hook for a pending read
///
/// Called exactly once with the packet, or `None` if the transport failed.
pub type PacketCallback = Box<dyn FnOnce(Option<Packet>) -> Result<()> + Send>;

/// Source of inbound packets
pub trait PacketReader {
    /// Handle used to abort a pending read
    type Cancel;

    /// Register `on_done` to receive the next packet
    ///
    /// Must not invoke `on_done` before returning.
    fn read_packet(&mut self, on_done: PacketCallback) -> Result<Self::Cancel>;

    /// Abort a pending read; its callback is dropped without being called
    fn cancel(&mut self, token: Self::Cancel);
}

/// Sink for outbound packets
pub trait PacketWriter {
    /// Queue one packet. The payload is not retained after returning.
    fn write_packet(&mut self, id: u64, payload: &[u8]) -> Result<()>;
}

impl<W: PacketWriter + ?Sized> PacketWriter for &mut W {
    fn write_packet(&mut self, id: u64, payload: &[u8]) -> Result<()> {
        (**self).write_packet(id, payload)
    }
}

/// Collects written packets in memory, in submission order
impl PacketWriter for Vec<Packet> {
    fn write_packet(&mut self, id: u64, payload: &[u8]) -> Result<()> {
        self.push(Packet::new(id, payload.to_vec()));
        Ok(())
    }
}
