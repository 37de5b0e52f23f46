//! Request parser
//!
//! Turns one packet into one [`Request`].
//!
//! ## Payload Layout
//! ```text
//! ┌──────────┬──────────────────────────────────────┐
//! │ Type (4) │ Fields (per type, ▸ = encoded key)   │
//! └──────────┴──────────────────────────────────────┘
//! ```
//! - PARAMS:           (empty)
//! - GET, DELETE:      ▸key
//! - SET, ADD, MODIFY: ▸key ▸value
//! - CAD:              ▸key ▸oval
//! - CAS:              ▸key ▸oval ▸value
//! - RANGE:            max (4) ▸start ▸end
//!
//! The fields must end exactly where the payload does.

use std::ops::Range;

use bytes::Buf;

use crate::error::{KvldsError, ParseFailure, Result};
use crate::key::Key;
use crate::pool::ObjectPool;
use crate::wire::Packet;

use super::request::{Request, RequestSlot, RequestType};

/// Size of the request type tag
pub const TAG_SIZE: usize = 4;

/// Parse `packet` into a request drawn from `pool`
///
/// On failure the packet comes back inside the [`ParseFailure`].
pub fn parse_request(
    packet: Packet,
    pool: &ObjectPool<RequestSlot>,
) -> std::result::Result<Request, ParseFailure> {
    let Some(mut slot) = pool.acquire() else {
        return Err(ParseFailure::new(
            KvldsError::PoolExhausted(pool.name()),
            packet,
        ));
    };

    slot.id = packet.id;
    match parse_fields(&packet.buf, &mut slot) {
        Ok(()) => {
            // The slot now owns the payload
            slot.blob = packet.buf;
            Ok(Request::from_slot(slot))
        }
        Err(error) => {
            match &error {
                KvldsError::UnknownRequestType(tag) => {
                    tracing::warn!("Unrecognized request type received: 0x{:08x}", tag)
                }
                e => tracing::warn!("Error parsing request packet {:#x}: {}", packet.id, e),
            }
            // Dropping the slot resets it and hands it back
            Err(ParseFailure::new(error, packet))
        }
    }
}

/// Fill `slot` from `buf` following the layout table
fn parse_fields(buf: &[u8], slot: &mut RequestSlot) -> Result<()> {
    if buf.len() < TAG_SIZE {
        return Err(truncated("request type", 0, TAG_SIZE, buf.len()));
    }
    let tag = (&buf[..TAG_SIZE]).get_u32();
    let kind = RequestType::from_tag(tag).ok_or(KvldsError::UnknownRequestType(tag))?;
    slot.kind = kind;

    let mut pos = TAG_SIZE;
    match kind {
        RequestType::Params => {}
        RequestType::Get | RequestType::Delete => {
            slot.key = Some(grab_key(buf, &mut pos)?);
        }
        RequestType::Set | RequestType::Add | RequestType::Modify => {
            slot.key = Some(grab_key(buf, &mut pos)?);
            slot.value = Some(grab_key(buf, &mut pos)?);
        }
        RequestType::Cad => {
            slot.key = Some(grab_key(buf, &mut pos)?);
            slot.oval = Some(grab_key(buf, &mut pos)?);
        }
        RequestType::Cas => {
            slot.key = Some(grab_key(buf, &mut pos)?);
            slot.oval = Some(grab_key(buf, &mut pos)?);
            slot.value = Some(grab_key(buf, &mut pos)?);
        }
        RequestType::Range => {
            if buf.len() - pos < 4 {
                return Err(truncated("range max", pos, 4, buf.len() - pos));
            }
            slot.range_max = (&buf[pos..pos + 4]).get_u32();
            pos += 4;

            slot.range_start = Some(grab_key(buf, &mut pos)?);
            slot.range_end = Some(grab_key(buf, &mut pos)?);
        }
    }

    if pos != buf.len() {
        return Err(KvldsError::TrailingBytes(buf.len() - pos));
    }
    Ok(())
}

/// Take the key at `*pos`, advancing past it
///
/// Returns the byte range of the key data inside `buf`.
fn grab_key(buf: &[u8], pos: &mut usize) -> Result<Range<usize>> {
    let (key, used) = Key::parse_view(buf, *pos)?;
    let end = pos
        .checked_add(used)
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| truncated("key", *pos, used, buf.len() - *pos))?;

    let start = end - key.len();
    *pos = end;
    Ok(start..end)
}

fn truncated(what: &'static str, offset: usize, needed: usize, available: usize) -> KvldsError {
    KvldsError::Truncated {
        what,
        offset,
        needed,
        available,
    }
}
