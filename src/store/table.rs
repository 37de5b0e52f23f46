//! MemStore implementation
//!
//! BTreeMap-based store with RwLock for concurrency.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{KvldsError, Result};
use crate::key::Key;
use crate::protocol::{
    get_response, params_response, range_response, status_response, Request, RequestType,
    Status,
};
use crate::wire::PacketWriter;

/// In-memory ordered key-value store
pub struct MemStore {
    /// Key → value, ordered by key bytes
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,

    /// Limits reported by PARAMS
    key_max_len: u32,
    value_max_len: u32,
}

impl MemStore {
    /// Create an empty store advertising the default limits
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Create an empty store advertising the limits in `config`
    pub fn with_config(config: &Config) -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            key_max_len: config.key_max_len,
            value_max_len: config.value_max_len,
        }
    }

    /// Get a value by key (read lock)
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    /// Set a key to a value (write lock)
    pub fn set(&self, key: &[u8], value: &[u8]) {
        self.data.write().insert(key.to_vec(), value.to_vec());
    }

    /// Remove a key (write lock); returns whether it was present
    pub fn delete(&self, key: &[u8]) -> bool {
        self.data.write().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Execute `request` and queue its response on `writer`
    pub fn execute<W: PacketWriter + ?Sized>(&self, request: &Request, writer: &mut W) -> Result<()> {
        let id = request.id();
        match request.request_type() {
            RequestType::Params => {
                params_response(writer, id, self.key_max_len, self.value_max_len)
            }
            RequestType::Get => {
                let key = field(request.key(), "key")?;
                match self.get(key.as_bytes()) {
                    Some(value) => get_response(writer, id, Status::Ok, Some(Key::new(&value)?)),
                    None => get_response(writer, id, Status::Failed, None),
                }
            }
            RequestType::Set => {
                let key = field(request.key(), "key")?;
                let value = field(request.value(), "value")?;
                self.set(key.as_bytes(), value.as_bytes());
                status_response(writer, id, Status::Ok)
            }
            RequestType::Add => {
                let key = field(request.key(), "key")?;
                let value = field(request.value(), "value")?;
                let added = {
                    let mut data = self.data.write();
                    if data.contains_key(key.as_bytes()) {
                        false
                    } else {
                        data.insert(key.as_bytes().to_vec(), value.as_bytes().to_vec());
                        true
                    }
                };
                status_response(writer, id, outcome(added))
            }
            RequestType::Modify => {
                let key = field(request.key(), "key")?;
                let value = field(request.value(), "value")?;
                let modified = match self.data.write().get_mut(key.as_bytes()) {
                    Some(current) => {
                        *current = value.as_bytes().to_vec();
                        true
                    }
                    None => false,
                };
                status_response(writer, id, outcome(modified))
            }
            RequestType::Delete => {
                let key = field(request.key(), "key")?;
                self.delete(key.as_bytes());
                status_response(writer, id, Status::Ok)
            }
            RequestType::Cad => {
                let key = field(request.key(), "key")?;
                let oval = field(request.old_value(), "old value")?;
                let deleted = {
                    let mut data = self.data.write();
                    if data.get(key.as_bytes()).map(Vec::as_slice) == Some(oval.as_bytes()) {
                        data.remove(key.as_bytes());
                        true
                    } else {
                        false
                    }
                };
                status_response(writer, id, outcome(deleted))
            }
            RequestType::Cas => {
                let key = field(request.key(), "key")?;
                let oval = field(request.old_value(), "old value")?;
                let value = field(request.value(), "value")?;
                let swapped = match self.data.write().get_mut(key.as_bytes()) {
                    Some(current) if current.as_slice() == oval.as_bytes() => {
                        *current = value.as_bytes().to_vec();
                        true
                    }
                    _ => false,
                };
                status_response(writer, id, outcome(swapped))
            }
            RequestType::Range => {
                let max = request.range_max().unwrap_or(0) as usize;
                let start = field(request.range_start(), "range start")?;
                let end = field(request.range_end(), "range end")?;
                let (next, pairs) = self.scan(start.as_bytes(), end.as_bytes(), max);

                let next = match &next {
                    Some(next) => Key::new(next)?,
                    None => end,
                };
                let keys = pairs
                    .iter()
                    .map(|(k, _)| Key::new(k))
                    .collect::<Result<Vec<_>>>()?;
                let values = pairs
                    .iter()
                    .map(|(_, v)| Key::new(v))
                    .collect::<Result<Vec<_>>>()?;
                range_response(writer, id, next, &keys, &values)
            }
        }
    }

    /// Collect pairs in `[start, end)` worth at most `max` serialized bytes
    ///
    /// An empty `end` means the end of the keyspace. At least one pair is
    /// returned when any exists. Also returns the first key left out, if any.
    fn scan(&self, start: &[u8], end: &[u8], max: usize) -> (Option<Vec<u8>>, Vec<(Vec<u8>, Vec<u8>)>) {
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end)
        };
        if !end.is_empty() && start >= end {
            return (None, Vec::new());
        }

        let data = self.data.read();
        let mut pairs = Vec::new();
        let mut used = 0usize;
        for (key, value) in data.range::<[u8], _>((Bound::Included(start), upper)) {
            let size = 2 + key.len() + value.len();
            if !pairs.is_empty() && used + size > max {
                return (Some(key.clone()), pairs);
            }
            used += size;
            pairs.push((key.clone(), value.clone()));
        }
        (None, pairs)
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

fn field<'a>(view: Option<Key<'a>>, name: &str) -> Result<Key<'a>> {
    view.ok_or_else(|| KvldsError::Protocol(format!("request is missing its {}", name)))
}

fn outcome(applied: bool) -> Status {
    if applied {
        Status::Ok
    } else {
        Status::Failed
    }
}
