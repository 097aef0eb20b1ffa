//! Bounds-checked binary cursor for the Jagex cache wire formats.
//!
//! Every structure in the cache — sector headers, reference tables,
//! archive chunk tables, definition opcode streams — is read through
//! [`ByteCursor`]: a fixed-capacity byte region with independent read and
//! write positions, big-endian multi-width accessors, the 1-or-2-byte
//! "smart" integer, and per-era terminated strings.

pub mod cursor;
pub mod error;

pub use cursor::{ByteCursor, StringMode};
pub use error::BufferError;

/// Result type for cursor operations.
pub type Result<T> = std::result::Result<T, BufferError>;
