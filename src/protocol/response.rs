//! Response builders
//!
//! Each builder sizes its payload exactly, encodes it, and queues it on a
//! [`PacketWriter`] under the request's correlation id.
//!
//! ## Payloads
//! - PARAMS: key_max (4) + value_max (4)
//! - STATUS: status (4)
//! - GET:    status (4) + ▸value (only when status is OK)
//! - RANGE:  status (4) + count (4) + ▸next + count × (▸key ▸value)

use bytes::{BufMut, BytesMut};

use crate::error::{KvldsError, Result};
use crate::key::Key;
use crate::wire::PacketWriter;

/// Response status codes
///
/// Zero means success; every other code is some flavour of failure. The
/// server only ever sends 0 and 1, but peers may use other codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The operation succeeded (GET: the key has a value)
    Ok,

    /// The operation did not apply (absent key, failed comparison, ...)
    Failed,

    /// Any other non-zero code, kept as received
    Other(u32),
}

impl Status {
    pub fn code(self) -> u32 {
        match self {
            Status::Ok => 0,
            Status::Failed => 1,
            Status::Other(code) => code,
        }
    }

    /// Map a wire code onto a status; 0 and 1 always get their named variant
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Status::Ok,
            1 => Status::Failed,
            code => Status::Other(code),
        }
    }

    pub fn is_success(self) -> bool {
        self.code() == 0
    }
}

impl From<u32> for Status {
    fn from(code: u32) -> Self {
        Status::from_code(code)
    }
}

/// Send a PARAMS response advertising the key and value length limits
pub fn params_response<W: PacketWriter + ?Sized>(
    writer: &mut W,
    id: u64,
    key_max_len: u32,
    value_max_len: u32,
) -> Result<()> {
    let mut buf = [0u8; 8];
    let mut out = &mut buf[..];
    out.put_u32(key_max_len);
    out.put_u32(value_max_len);

    writer.write_packet(id, &buf)
}

/// Send a SET/CAS/ADD/MODIFY/DELETE/CAD response
pub fn status_response<W: PacketWriter + ?Sized>(
    writer: &mut W,
    id: u64,
    status: Status,
) -> Result<()> {
    writer.write_packet(id, &status.code().to_be_bytes())
}

/// Send a GET response
///
/// `value` must be present exactly when `status` is a success (code 0).
pub fn get_response<W: PacketWriter + ?Sized>(
    writer: &mut W,
    id: u64,
    status: Status,
    value: Option<Key<'_>>,
) -> Result<()> {
    let value = match (status.is_success(), value) {
        (true, Some(value)) => Some(value),
        (false, None) => None,
        (_, value) => {
            return Err(KvldsError::Protocol(format!(
                "GET response with status {} {} a value",
                status.code(),
                if value.is_some() { "carries" } else { "lacks" }
            )))
        }
    };

    let len = 4 + value.map_or(0, |v| v.serial_size());
    let mut buf = BytesMut::with_capacity(len);
    buf.put_u32(status.code());
    if let Some(value) = value {
        value.serialize(&mut buf);
    }
    debug_assert_eq!(buf.len(), len);

    writer.write_packet(id, &buf)
}

/// Send a RANGE response with `keys[i]` paired to `values[i]`
///
/// Pairs are written in the order given.
///
/// # Panics
/// Panics if `keys` and `values` differ in length or hold more than
/// `u32::MAX` entries.
pub fn range_response<W: PacketWriter + ?Sized>(
    writer: &mut W,
    id: u64,
    next: Key<'_>,
    keys: &[Key<'_>],
    values: &[Key<'_>],
) -> Result<()> {
    assert_eq!(keys.len(), values.len(), "RANGE keys and values must pair up");
    let count = u32::try_from(keys.len()).expect("RANGE response holds more than 2^32-1 pairs");

    let len = keys
        .iter()
        .zip(values)
        .fold(8 + next.serial_size(), |len, (k, v)| {
            len + k.serial_size() + v.serial_size()
        });

    let mut buf = BytesMut::with_capacity(len);
    buf.put_u32(Status::Ok.code());
    buf.put_u32(count);
    next.serialize(&mut buf);
    for (key, value) in keys.iter().zip(values) {
        key.serialize(&mut buf);
        value.serialize(&mut buf);
    }
    debug_assert_eq!(buf.len(), len);

    writer.write_packet(id, &buf)
}
