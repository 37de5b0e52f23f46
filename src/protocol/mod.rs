//! Protocol Module
//!
//! Request parsing, response building and the request read lifecycle for
//! the KVLDS wire protocol.
//!
//! ## Request Format
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Type (4) │     Fields (per type)       │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! ### Request Types
//! - 0x00000100: PARAMS - (empty)
//! - 0x00000110: SET    - key, value
//! - 0x00000111: CAS    - key, oval, value
//! - 0x00000112: ADD    - key, value
//! - 0x00000113: MODIFY - key, value
//! - 0x00000120: DELETE - key
//! - 0x00000121: CAD    - key, oval
//! - 0x00000130: GET    - key
//! - 0x00000131: RANGE  - max (4), start, end
//!
//! ### Status Codes
//! - 0: OK
//! - 1: FAILED
//!
//! All integers are big-endian; keys and values use the [`crate::key`]
//! encoding. The correlation id lives in the packet frame, not the payload.

mod client;
mod parser;
mod reader;
mod request;
mod response;

pub use client::{decode_get, decode_params, decode_range, decode_status, Command, RangeReply};
pub use parser::{parse_request, TAG_SIZE};
pub use reader::{ReadHandle, ReadSlot, RequestCallback, RequestReader};
pub use request::{Request, RequestSlot, RequestType};
pub use response::{get_response, params_response, range_response, status_response, Status};
