//! Error types for KVLDS
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::wire::Packet;

/// Result type alias using KvldsError
pub type Result<T> = std::result::Result<T, KvldsError>;

/// Unified error type for KVLDS operations
#[derive(Debug, Error)]
pub enum KvldsError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Framing Errors
    // -------------------------------------------------------------------------
    #[error("Frame checksum mismatch in {0}")]
    BadChecksum(&'static str),

    #[error("Packet too large: {len} bytes (max {max})")]
    PacketTooLarge { len: usize, max: usize },

    // -------------------------------------------------------------------------
    // Parse Errors
    // -------------------------------------------------------------------------
    #[error("Truncated {what}: need {needed} bytes at offset {offset}, have {available}")]
    Truncated {
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Unrecognized request type: 0x{0:08x}")]
    UnknownRequestType(u32),

    #[error("Trailing garbage in request: {0} bytes after last field")]
    TrailingBytes(usize),

    #[error("Key too long: {0} bytes (max 255)")]
    KeyTooLong(usize),

    // -------------------------------------------------------------------------
    // Resource Errors
    // -------------------------------------------------------------------------
    #[error("Pool exhausted: {0}")]
    PoolExhausted(&'static str),

    // -------------------------------------------------------------------------
    // Transport / Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A packet that could not be turned into a request
///
/// The packet is handed back untouched so the caller decides how to
/// dispose of its buffer.
#[derive(Debug)]
pub struct ParseFailure {
    /// Why parsing stopped
    pub error: KvldsError,

    /// The packet as it was received
    pub packet: Packet,
}

impl ParseFailure {
    pub(crate) fn new(error: KvldsError, packet: Packet) -> Self {
        Self { error, packet }
    }

    /// Give back the original packet
    pub fn into_packet(self) -> Packet {
        self.packet
    }
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "packet {:#018x}: {}", self.packet.id, self.error)
    }
}

impl std::error::Error for ParseFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
