//! Error types for store operations.

use std::io;

use thiserror::Error;

/// Store error types.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while opening cache channels.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Index pointer is outside the index channel.
    #[error("file {file_id} not found in index {index_id}")]
    FileNotFound { index_id: u8, file_id: u32 },

    /// No such index channel was loaded.
    #[error("index channel {0} is not loaded")]
    IndexNotLoaded(u8),

    /// A sector's index-id byte disagreed with the requested index.
    #[error("file type mismatch: expected index {expected}, sector claims {actual}")]
    FileTypeMismatch { expected: u8, actual: u8 },

    /// A sector's file-id field disagreed with the requested file.
    #[error("file id mismatch: expected {expected}, sector claims {actual}")]
    FileIdMismatch { expected: u32, actual: u32 },

    /// A sector appeared out of sequence in its chain.
    #[error("chunk mismatch: expected sequence {expected}, sector claims {actual}")]
    ChunkMismatch { expected: u32, actual: u32 },

    /// A chain pointed outside the data channel.
    #[error("sector {sector} lies outside the data channel")]
    SectorOutOfRange { sector: u32 },

    /// Reference table data ended before its declared counts were satisfied.
    #[error("truncated reference table: {0}")]
    TruncatedReferenceTable(jagfs_buffer::BufferError),

    /// An archive cannot have fewer than one member.
    #[error("invalid archive size: {0}")]
    InvalidArchiveSize(usize),

    /// The archive's chunk deltas did not account for its payload exactly.
    #[error("archive chunk accounting failed: payload ends at {actual}, table starts at {expected}")]
    ChunkAccounting { expected: usize, actual: usize },

    /// Archive region was too small for its trailing tables.
    #[error("truncated archive: {0}")]
    TruncatedArchive(jagfs_buffer::BufferError),

    /// A named archive member referenced bytes outside the archive.
    #[error("named archive entry {name_hash:#010x} has an invalid payload range")]
    InvalidNamedEntry { name_hash: i32 },

    /// Codec failure on a path where it is fatal (metadata channels).
    #[error("codec error: {0}")]
    Codec(#[from] jagfs_codec::Error),

    /// Cursor failure outside the reference-table decoder.
    #[error("buffer error: {0}")]
    Buffer(#[from] jagfs_buffer::BufferError),
}
