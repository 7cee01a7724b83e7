//! procpack: a compact, self-delimiting binary codec for passing typed
//! values between processes.
//!
//! A packed value is a tree of tagged, length-prefixed nodes (§3-§4): every
//! node starts with a single tag byte encoding both its kind and the byte
//! width of whatever length or integer payload follows, so a reader can skip
//! or descend into any subtree without a schema. [`pack`] produces this
//! payload on its own; [`encode`] wraps it in the outer length frame used
//! when payloads are concatenated on a stream (§4.5, §6.1).
//!
//! Multi-byte integers, lengths, and identity byte-strings are little-endian.
//! Floats and complex numbers are encoded via `to_ne_bytes`/`from_ne_bytes`
//! on their bit patterns: this crate, like its wire format, assumes both ends
//! of a connection share the same native byte order. There is no on-wire
//! indication of endianness and no runtime byte-swap; mixed-endian peers are
//! out of scope (§9).
#![allow(dead_code)]

pub mod error;
mod writer;
mod marker;
mod depth_tracking;
mod value;
mod registry;
mod reconstruct;
mod integer;
mod ser;
mod de;
#[cfg(test)]
mod proptests;

pub use crate::depth_tracking::{set_max_depth, DEFAULT_MAX_DEPTH};
pub use crate::error::{Error, Result};
pub use crate::integer::pack_generic_int;
pub use crate::registry::{register, Constructor, Handle, ReconstructHook};
pub use crate::value::{Instance, Value};

/// Encode `value` to a self-delimiting payload with no outer frame.
///
/// This is what goes on the wire between a tag byte and the next sibling's
/// tag byte; use [`encode`] instead when payloads are written back-to-back
/// on a stream and need their own length prefix.
pub fn pack(value: &Value) -> Result<Vec<u8>> {
    ser::pack(value)
}

/// Encode `value` and prepend the outer `W | L(W)` frame (§4.5).
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    ser::encode(value)
}

/// Decode a single packed [`Value`] from `buf`.
///
/// `buf` must contain exactly one payload produced by [`pack`]; trailing
/// bytes are not an error, but are simply left unread (callers that frame
/// payloads with [`encode`] should strip the frame first and pass only the
/// inner payload).
pub fn unpack(buf: &[u8]) -> Result<Value> {
    de::unpack(buf)
}

/// Read the outer frame's length field written by [`encode`] and return it
/// as a signed integer, without decoding the payload it describes.
pub fn size(buf: &[u8]) -> Result<i64> {
    de::size(buf)
}
