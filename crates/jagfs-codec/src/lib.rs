//! Container decompression for Jagex cache files.
//!
//! Every file stored in the cache travels inside a small container:
//! a compression-type byte, a compressed length, an uncompressed length
//! when compressed, the payload, and an optional trailing version field.
//! Keyed archives additionally get an XTEA pre-pass over the payload
//! before decompression.

pub mod decompress;
pub mod error;

pub use decompress::{decompress, decompress_bzip2, CompressionType, Container};
pub use error::Error;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, Error>;
