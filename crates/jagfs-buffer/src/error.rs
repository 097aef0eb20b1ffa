//! Error types for cursor operations.

use thiserror::Error;

/// Errors raised by [`crate::ByteCursor`] accessors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// A read or write ran past the accessible region.
    #[error("access of {needed} bytes at position {pos} exceeds limit {limit}")]
    OutOfBounds {
        pos: usize,
        needed: usize,
        limit: usize,
    },

    /// A terminated string ran to the end of the region without its
    /// terminator byte.
    #[error("no {terminator:#04x} terminator for string starting at {start}")]
    UnterminatedString { start: usize, terminator: u8 },

    /// A bulk copy was given an invalid source or destination range.
    #[error("copy range {start}..{end} is invalid for a region of {len} bytes")]
    InvalidCopyRange {
        start: usize,
        end: usize,
        len: usize,
    },

    /// A position was moved outside the region.
    #[error("position {pos} exceeds capacity {capacity}")]
    InvalidPosition { pos: usize, capacity: usize },
}
