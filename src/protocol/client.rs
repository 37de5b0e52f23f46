//! Client side of the protocol
//!
//! Builds request payloads and decodes response payloads, for peers that
//! talk to a KVLDS server.

use bytes::{Buf, BufMut};

use crate::error::{KvldsError, Result};
use crate::key::Key;

use super::request::RequestType;
use super::response::Status;

/// A request to be encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Params,
    Get { key: Key<'a> },
    Set { key: Key<'a>, value: Key<'a> },
    Add { key: Key<'a>, value: Key<'a> },
    Modify { key: Key<'a>, value: Key<'a> },
    Delete { key: Key<'a> },
    Cad { key: Key<'a>, oval: Key<'a> },
    Cas { key: Key<'a>, oval: Key<'a>, value: Key<'a> },
    Range { max: u32, start: Key<'a>, end: Key<'a> },
}

impl<'a> Command<'a> {
    pub fn request_type(&self) -> RequestType {
        match self {
            Command::Params => RequestType::Params,
            Command::Get { .. } => RequestType::Get,
            Command::Set { .. } => RequestType::Set,
            Command::Add { .. } => RequestType::Add,
            Command::Modify { .. } => RequestType::Modify,
            Command::Delete { .. } => RequestType::Delete,
            Command::Cad { .. } => RequestType::Cad,
            Command::Cas { .. } => RequestType::Cas,
            Command::Range { .. } => RequestType::Range,
        }
    }

    /// Encode the request payload: tag followed by the type's fields
    pub fn encode(&self) -> Vec<u8> {
        let mut payload: Vec<u8> = Vec::with_capacity(64);
        payload.put_u32(self.request_type().tag());
        match *self {
            Command::Params => {}
            Command::Get { key } | Command::Delete { key } => key.serialize(&mut payload),
            Command::Set { key, value }
            | Command::Add { key, value }
            | Command::Modify { key, value } => {
                key.serialize(&mut payload);
                value.serialize(&mut payload);
            }
            Command::Cad { key, oval } => {
                key.serialize(&mut payload);
                oval.serialize(&mut payload);
            }
            Command::Cas { key, oval, value } => {
                key.serialize(&mut payload);
                oval.serialize(&mut payload);
                value.serialize(&mut payload);
            }
            Command::Range { max, start, end } => {
                payload.put_u32(max);
                start.serialize(&mut payload);
                end.serialize(&mut payload);
            }
        }
        payload
    }
}

/// Decoded RANGE response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeReply {
    /// Where the next RANGE should start
    pub next: Vec<u8>,

    /// Returned pairs, in wire order
    pub pairs: Vec<(Vec<u8>, Vec<u8>)>,
}

/// Decode a PARAMS response into `(key_max_len, value_max_len)`
pub fn decode_params(payload: &[u8]) -> Result<(u32, u32)> {
    expect_len("PARAMS", payload, 8)?;
    let mut buf = payload;
    Ok((buf.get_u32(), buf.get_u32()))
}

/// Decode a STATUS response
pub fn decode_status(payload: &[u8]) -> Result<Status> {
    expect_len("STATUS", payload, 4)?;
    read_status("STATUS", payload)
}

/// Decode a GET response; `None` means any non-zero status (no value)
pub fn decode_get(payload: &[u8]) -> Result<Option<Vec<u8>>> {
    if !read_status("GET", payload)?.is_success() {
        expect_len("GET", payload, 4)?;
        return Ok(None);
    }
    let (value, used) = Key::parse_view(payload, 4)?;
    expect_len("GET", payload, 4 + used)?;
    Ok(Some(value.as_bytes().to_vec()))
}

/// Decode a RANGE response
pub fn decode_range(payload: &[u8]) -> Result<RangeReply> {
    let status = read_status("RANGE", payload)?;
    if !status.is_success() {
        return Err(KvldsError::Protocol(format!(
            "RANGE response with failure status {}",
            status.code()
        )));
    }
    if payload.len() < 8 {
        return Err(KvldsError::Protocol("RANGE response missing count".to_string()));
    }
    let count = (&payload[4..8]).get_u32() as usize;

    let mut pos = 8;
    let next = take_key(payload, &mut pos)?;
    // Every pair takes at least two bytes; don't trust `count` for capacity
    let mut pairs = Vec::with_capacity(count.min(payload.len() / 2));
    for _ in 0..count {
        let key = take_key(payload, &mut pos)?;
        let value = take_key(payload, &mut pos)?;
        pairs.push((key, value));
    }

    if pos != payload.len() {
        return Err(KvldsError::TrailingBytes(payload.len() - pos));
    }
    Ok(RangeReply { next, pairs })
}

fn take_key(payload: &[u8], pos: &mut usize) -> Result<Vec<u8>> {
    let (key, used) = Key::parse_view(payload, *pos)?;
    *pos += used;
    Ok(key.as_bytes().to_vec())
}

fn read_status(what: &str, payload: &[u8]) -> Result<Status> {
    if payload.len() < 4 {
        return Err(KvldsError::Protocol(format!(
            "{} response too short: {} bytes",
            what,
            payload.len()
        )));
    }
    Ok(Status::from_code((&payload[..4]).get_u32()))
}

fn expect_len(what: &str, payload: &[u8], len: usize) -> Result<()> {
    if payload.len() != len {
        return Err(KvldsError::Protocol(format!(
            "{} response is {} bytes, expected {}",
            what,
            payload.len(),
            len
        )));
    }
    Ok(())
}
