//! Error types for entity decoding.

use thiserror::Error;

/// Decoder error types.
#[derive(Error, Debug)]
pub enum Error {
    /// An opcode the record's table does not know. Payload widths are
    /// opcode-specific, so there is no skip-and-continue recovery.
    #[error("unknown opcode {opcode} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    /// A record's stream ended mid-field.
    #[error("buffer error: {0}")]
    Buffer(#[from] jagfs_buffer::BufferError),

    /// Store-level failure while fetching content.
    #[error("store error: {0}")]
    Store(#[from] jagfs_store::Error),

    /// A content archive the decoder requires is absent from the cache.
    #[error("missing archive {archive_id} in index {index_id}")]
    MissingArchive { index_id: u8, archive_id: u32 },
}
