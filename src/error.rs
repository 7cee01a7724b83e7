//! Library error types.
//!
use std::fmt;

/// A procpack `Result`, normally returning a procpack [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A procpack error. Encompasses any issue that can happen while packing or
/// unpacking a [`Value`](crate::Value), or while registering a handle in the
/// process-wide registry.
#[derive(Clone, Debug)]
pub enum Error {
    /// Decoding ran past the end of the input buffer.
    Eof {
        /// Byte offset at which the read was attempted.
        offset: usize,
        /// Number of bytes that would have been needed.
        needed: usize,
    },
    /// A tag byte was `0x00` or an undefined kind/width combination.
    InvalidTag {
        /// Byte offset of the tag.
        offset: usize,
        /// The offending tag byte.
        tag: u8,
    },
    /// A length prefix decoded to a negative value.
    BadLength {
        /// Byte offset of the length prefix.
        offset: usize,
    },
    /// UTF-8 validation failed while decoding a `Str` payload.
    BadEncoding {
        /// Byte offset of the payload.
        offset: usize,
    },
    /// Container nesting exceeded the per-thread recursion limit.
    Recursion,
    /// An integer was too large to represent even as an unsigned 64-bit value.
    Overflow,
    /// A `Class` or `Singleton` identity was not present in the registry at
    /// decode time.
    NotRegistered {
        /// Which kind of identity failed to resolve (`"class"` or `"singleton"`).
        kind: &'static str,
        /// A human-readable rendering of the identity, e.g. `<class 'M.Q'>`.
        identity: String,
    },
    /// A reduction descriptor had the wrong shape: not a tuple, wrong arity,
    /// or `args` not itself a tuple.
    BadReduce {
        /// What was expected and what was found instead.
        reason: String,
    },
    /// A value had no reducer and is not one of the built-in kinds.
    TypeUnpackable {
        /// Description of the offending value.
        reason: String,
    },
    /// A reconstruction step (`__setstate__` substitute, `extend`, `update`)
    /// failed.
    BadState {
        /// Description of which step failed and why.
        reason: String,
    },
    /// `register` was called with an identity already mapped to a different
    /// handle. Open question resolved in DESIGN.md: reject rather than
    /// silently overwrite.
    AlreadyRegistered {
        /// A human-readable rendering of the conflicting identity.
        identity: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Eof { offset, needed } => write!(
                f,
                "unexpected end of input at offset {}: needed {} more byte(s)",
                offset, needed
            ),
            Error::InvalidTag { offset, tag } => {
                write!(f, "invalid tag byte 0x{:02x} at offset {}", tag, offset)
            }
            Error::BadLength { offset } => write!(f, "negative length prefix at offset {}", offset),
            Error::BadEncoding { offset } => {
                write!(f, "invalid UTF-8 in string payload at offset {}", offset)
            }
            Error::Recursion => write!(f, "recursion limit exceeded"),
            Error::Overflow => write!(f, "integer too large to pack, even as unsigned 64-bit"),
            Error::NotRegistered { kind, identity } => {
                write!(f, "cannot unpack {}: {} is not registered", kind, identity)
            }
            Error::BadReduce { reason } => write!(f, "malformed reduction: {}", reason),
            Error::TypeUnpackable { reason } => write!(f, "value cannot be packed: {}", reason),
            Error::BadState { reason } => write!(f, "failed to reconstruct instance: {}", reason),
            Error::AlreadyRegistered { identity } => {
                write!(f, "{} is already registered to a different handle", identity)
            }
        }
    }
}

impl std::error::Error for Error {}
