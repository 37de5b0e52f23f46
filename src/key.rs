//! Key codec
//!
//! Keys and values travel as length-prefixed byte strings.
//!
//! ## Encoding
//! ```text
//! ┌─────────┬───────────────────────┐
//! │ Len (1) │  Bytes (0..=255)      │
//! └─────────┴───────────────────────┘
//! ```
//!
//! A [`Key`] is always a borrowed view: parsing never copies.

use bytes::BufMut;

use crate::error::{KvldsError, Result};

/// Longest byte string the one-byte length prefix can describe
pub const MAX_KEY_LEN: usize = u8::MAX as usize;

/// A non-owning view of a key or value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Key<'a> {
    bytes: &'a [u8],
}

impl Key<'static> {
    /// The zero-length key
    pub const EMPTY: Key<'static> = Key { bytes: &[] };
}

impl<'a> Key<'a> {
    /// Wrap a byte slice, refusing anything the prefix cannot describe
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() > MAX_KEY_LEN {
            return Err(KvldsError::KeyTooLong(bytes.len()));
        }
        Ok(Self { bytes })
    }

    /// Parse the key serialized at `offset` in `buf`
    ///
    /// Returns the view together with the number of bytes it occupies.
    pub fn parse_view(buf: &'a [u8], offset: usize) -> Result<(Self, usize)> {
        let len = match buf.get(offset) {
            Some(&len) => len as usize,
            None => {
                return Err(KvldsError::Truncated {
                    what: "key length",
                    offset,
                    needed: 1,
                    available: buf.len().saturating_sub(offset),
                })
            }
        };

        let start = offset + 1;
        let end = start.checked_add(len).filter(|&end| end <= buf.len());
        match end {
            Some(end) => Ok((Self { bytes: &buf[start..end] }, 1 + len)),
            None => Err(KvldsError::Truncated {
                what: "key",
                offset: start,
                needed: len,
                available: buf.len() - start,
            }),
        }
    }

    /// Bytes this key occupies once serialized
    pub fn serial_size(&self) -> usize {
        1 + self.bytes.len()
    }

    /// Append the serialized key to `dest`
    pub fn serialize<B: BufMut>(&self, dest: &mut B) {
        dest.put_u8(self.bytes.len() as u8);
        dest.put_slice(self.bytes);
    }

    /// The raw key bytes, without the length prefix
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl<'a> TryFrom<&'a [u8]> for Key<'a> {
    type Error = KvldsError;

    fn try_from(bytes: &'a [u8]) -> Result<Self> {
        Key::new(bytes)
    }
}

impl AsRef<[u8]> for Key<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

impl PartialEq<[u8]> for Key<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.bytes == other
    }
}

impl PartialEq<&[u8]> for Key<'_> {
    fn eq(&self, other: &&[u8]) -> bool {
        self.bytes == *other
    }
}

impl<const N: usize> PartialEq<&[u8; N]> for Key<'_> {
    fn eq(&self, other: &&[u8; N]) -> bool {
        self.bytes == &other[..]
    }
}
