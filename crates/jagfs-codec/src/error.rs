//! Error types for container decompression.

use thiserror::Error;

/// Codec error types.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error from a decompressor.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown compression-type byte.
    #[error("unsupported compression type: {0:#04x}")]
    UnsupportedCompression(u8),

    /// Decompressed output did not match the declared length.
    #[error("corrupt archive: declared {expected} uncompressed bytes, got {actual}")]
    CorruptArchive { expected: usize, actual: usize },

    /// Container header or payload ran past the end of the region.
    #[error("truncated container: {0}")]
    Truncated(#[from] jagfs_buffer::BufferError),

    /// XTEA pre-pass failed.
    #[error("decryption error: {0}")]
    Crypto(#[from] jagfs_crypto::CryptoError),

    /// A declared payload length was negative.
    #[error("invalid payload length: {0}")]
    InvalidLength(i32),
}
