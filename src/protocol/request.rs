//! Request definitions
//!
//! A parsed request owns the packet payload it came from; every key it
//! exposes is a view borrowed from that payload.

use std::fmt;
use std::ops::Range;

use crate::key::Key;
use crate::pool::Pooled;

/// Request types and their wire tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RequestType {
    Params = 0x0000_0100,
    Set = 0x0000_0110,
    Cas = 0x0000_0111,
    Add = 0x0000_0112,
    Modify = 0x0000_0113,
    Delete = 0x0000_0120,
    Cad = 0x0000_0121,
    Get = 0x0000_0130,
    Range = 0x0000_0131,
}

impl RequestType {
    /// Every request type, in tag order
    pub const ALL: [RequestType; 9] = [
        RequestType::Params,
        RequestType::Set,
        RequestType::Cas,
        RequestType::Add,
        RequestType::Modify,
        RequestType::Delete,
        RequestType::Cad,
        RequestType::Get,
        RequestType::Range,
    ];

    /// Look up the type for a wire tag
    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            RequestType::Params => "PARAMS",
            RequestType::Set => "SET",
            RequestType::Cas => "CAS",
            RequestType::Add => "ADD",
            RequestType::Modify => "MODIFY",
            RequestType::Delete => "DELETE",
            RequestType::Cad => "CAD",
            RequestType::Get => "GET",
            RequestType::Range => "RANGE",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pool block backing a [`Request`]
///
/// Field positions are byte ranges into `blob`, never copies.
#[derive(Debug)]
pub struct RequestSlot {
    pub(crate) id: u64,
    pub(crate) kind: RequestType,
    pub(crate) key: Option<Range<usize>>,
    pub(crate) oval: Option<Range<usize>>,
    pub(crate) value: Option<Range<usize>>,
    pub(crate) range_max: u32,
    pub(crate) range_start: Option<Range<usize>>,
    pub(crate) range_end: Option<Range<usize>>,
    pub(crate) blob: Vec<u8>,
}

impl Default for RequestSlot {
    fn default() -> Self {
        Self {
            id: 0,
            kind: RequestType::Params,
            key: None,
            oval: None,
            value: None,
            range_max: 0,
            range_start: None,
            range_end: None,
            blob: Vec::new(),
        }
    }
}

/// A parsed KVLDS request
///
/// Dropping the request frees its payload and hands its pool block back.
pub struct Request {
    slot: Pooled<RequestSlot>,
}

impl Request {
    pub(crate) fn from_slot(slot: Pooled<RequestSlot>) -> Self {
        Self { slot }
    }

    /// Correlation id copied from the packet
    pub fn id(&self) -> u64 {
        self.slot.id
    }

    pub fn request_type(&self) -> RequestType {
        self.slot.kind
    }

    /// Key for every type except PARAMS and RANGE
    pub fn key(&self) -> Option<Key<'_>> {
        self.view(&self.slot.key)
    }

    /// Expected current value for CAD and CAS
    pub fn old_value(&self) -> Option<Key<'_>> {
        self.view(&self.slot.oval)
    }

    /// New value for SET, ADD, MODIFY and CAS
    pub fn value(&self) -> Option<Key<'_>> {
        self.view(&self.slot.value)
    }

    /// Response size limit for RANGE
    pub fn range_max(&self) -> Option<u32> {
        (self.slot.kind == RequestType::Range).then_some(self.slot.range_max)
    }

    /// First key of a RANGE (inclusive)
    pub fn range_start(&self) -> Option<Key<'_>> {
        self.view(&self.slot.range_start)
    }

    /// End of a RANGE (exclusive; empty means end of keyspace)
    pub fn range_end(&self) -> Option<Key<'_>> {
        self.view(&self.slot.range_end)
    }

    /// The whole packet payload, tag included
    pub fn payload(&self) -> &[u8] {
        &self.slot.blob
    }

    fn view(&self, span: &Option<Range<usize>>) -> Option<Key<'_>> {
        // Spans come from a successful parse of `blob`, so each is in bounds
        // and no longer than a key can be.
        span.clone()
            .and_then(|span| Key::new(&self.slot.blob[span]).ok())
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Request");
        s.field("id", &self.id()).field("type", &self.request_type());
        if let Some(key) = self.key() {
            s.field("key", &key);
        }
        if let Some(oval) = self.old_value() {
            s.field("old_value", &oval);
        }
        if let Some(value) = self.value() {
            s.field("value", &value);
        }
        if let Some(max) = self.range_max() {
            s.field("range_max", &max)
                .field("range_start", &self.range_start())
                .field("range_end", &self.range_end());
        }
        s.finish()
    }
}
