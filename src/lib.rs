//! # KVLDS
//!
//! Request/response codec and request lifecycle for the KVLDS key-value
//! wire protocol:
//! - Zero-copy, bounds-checked request parsing
//! - Exactly-sized response packets
//! - Asynchronous read → parse → deliver with cancellation
//! - Fixed-capacity object pools as backpressure on the hot path
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Packet Transport (wire)                   │
//! │              read_packet / cancel / write_packet             │
//! └──────────────┬──────────────────────────────▲───────────────┘
//!                │ Packet                       │ Packet
//! ┌──────────────▼──────────────┐   ┌───────────┴───────────────┐
//! │        RequestReader        │   │     Response builders     │
//! │  (read pool, request pool)  │   │ params/status/get/range   │
//! └──────────────┬──────────────┘   └───────────▲───────────────┘
//!                │ Request                      │ results
//!                ▼                              │
//!        ┌───────────────────────────────────────────┐
//!        │           Storage engine (store)          │
//!        └───────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod key;
pub mod pool;
pub mod wire;
pub mod protocol;
pub mod store;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvldsError, ParseFailure, Result};
pub use config::Config;
pub use key::Key;
pub use pool::{ObjectPool, Pooled};
pub use protocol::{Request, RequestReader, RequestType, Status};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of KVLDS
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
