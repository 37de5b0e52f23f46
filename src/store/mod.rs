//! Store Module
//!
//! In-memory reference storage engine that answers parsed requests.
//!
//! ## Responsibilities
//! - Execute every request type against an ordered map
//! - Answer through the response builders
//! - Many concurrent readers, one writer at a time
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock:
//! - Ordered keys (required for RANGE)
//! - Simple and correct first

mod table;

pub use table::MemStore;
