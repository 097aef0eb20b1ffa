//! Storage engine for the Jagex game-asset cache.
//!
//! The cache is a sector-chained blob store: a monolithic data channel of
//! fixed 520-byte sectors, plus per-content-type index channels of 6-byte
//! records pointing at the head of each file's chain. On top of that sit
//! reference tables (per-index metadata: checksums, versions, member
//! lists) and archives (one decompressed blob split into member regions).
//!
//! Two on-disk generations exist. [`ModernCache`] reads the
//! `main_file_cache.dat2` store with its idx255 metadata channel;
//! [`LegacyCache`] reads the early `main_file_cache.dat` store with five
//! fixed index channels and named-file archives. Both share one sector
//! walker and implement [`CacheFormat`].

pub mod archive;
pub mod error;
pub mod legacy;
pub mod modern;
pub mod reference;
pub mod sector;

pub use archive::{name_hash, Archive, NamedArchive};
pub use error::Error;
pub use legacy::{DefinitionIndex, LegacyCache, RegionManifestEntry};
pub use modern::{IndexType, ModernCache};
pub use reference::{identifier_hash, ChildEntry, Entry, ReferenceTable};
pub use sector::SectorStore;

use jagfs_codec::Container;
use jagfs_crypto::XteaKey;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The capability shared by both cache generations: resolving an
/// `(index, file)` pair to the raw container bytes by walking the sector
/// chain. Era-specific wiring (metadata channels, archive containers)
/// lives on the concrete types.
pub trait CacheFormat {
    /// Reassemble the raw bytes of a stored file.
    fn raw_file(&self, index_id: u8, file_id: u32) -> Result<Vec<u8>>;
}

/// Decompress raw container bytes, converting codec failures into an
/// "entry absent" result.
///
/// Content lookups treat a failed decompress/decrypt as a skippable entry;
/// metadata-channel reads must not use this and propagate codec errors.
pub(crate) fn decompress_lenient(
    raw: &[u8],
    keys: Option<&XteaKey>,
) -> Option<Container> {
    if raw.is_empty() {
        return None;
    }
    match jagfs_codec::decompress(raw, keys) {
        Ok(container) => Some(container),
        Err(err) => {
            tracing::warn!("treating undecodable entry as absent: {err}");
            None
        }
    }
}
