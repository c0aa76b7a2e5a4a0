//! Wire-level protocol types for the iTerm2 API.
//!
//! ## Module Structure
//!
//! - `request_id` - RequestId type and the per-connection IdGenerator
//! - `api` - prost envelope messages exchanged over the socket
//! - `codec` - Encoding of outbound requests, decoding of inbound frames

pub mod api;
mod codec;
mod request_id;

pub use codec::{CodecError, InboundMessage, decode, encode};
pub use request_id::{IdGenerator, RequestId};
