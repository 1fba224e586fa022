//! Protocol module - the Synergy wire vocabulary and its codec
//!
//! Every message body starts with a 4-byte ASCII identifier followed by
//! fields laid out by a printf-like template:
//! - `%1i` / `%2i` / `%4i`: big-endian signed integers
//! - `%s`: 4-byte big-endian length, then raw bytes
//! - `%4I`: 4-byte element count, then alternating tags and integers

mod codec;
mod message;
mod registry;
mod template;

pub use codec::*;
pub use message::*;
pub use registry::*;
pub use template::*;

/// Protocol major version spoken by this client
pub const PROTOCOL_MAJOR: i32 = 1;

/// Protocol minor version spoken by this client
pub const PROTOCOL_MINOR: i32 = 6;

/// Default port of a Synergy primary
pub const DEFAULT_PORT: u16 = 24800;
