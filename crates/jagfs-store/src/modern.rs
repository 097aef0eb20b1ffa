//! The modern-generation cache facade.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use jagfs_codec::Container;
use jagfs_crypto::XteaKey;

use crate::archive::Archive;
use crate::reference::ReferenceTable;
use crate::sector::{SectorStore, META_INDEX_ID};
use crate::{decompress_lenient, CacheFormat, Result};

/// The modern data channel file.
pub const MAIN_DATA: &str = "main_file_cache.dat2";
/// The metadata index channel file.
pub const META_INDEX: &str = "main_file_cache.idx255";
/// Highest probeable content index channel.
const MAX_CONTENT_INDEX: u8 = 253;

/// Well-known content index ids of the modern generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IndexType {
    Skeleton = 0,
    Skin = 1,
    /// Item/NPC/location definition configs.
    Definitions = 2,
    Widgets = 3,
    SoundEffects = 4,
    Maps = 5,
    Music = 6,
    Models = 7,
    Sprites = 8,
    Textures = 9,
    Huffman = 10,
    Jingles = 11,
    ClientScripts = 12,
}

impl IndexType {
    /// The index channel id.
    pub const fn id(self) -> u8 {
        self as u8
    }
}

/// A modern-generation cache: `main_file_cache.dat2`, probed content
/// index channels, and the idx255 metadata channel with one reference
/// table per content index.
#[derive(Debug)]
pub struct ModernCache {
    directory: PathBuf,
    store: SectorStore,
    tables: BTreeMap<u8, ReferenceTable>,
}

impl ModernCache {
    /// Open a cache directory.
    ///
    /// The data channel and metadata channel are required; content index
    /// channels are probed from 0 and collection stops at the first
    /// missing file. Reference tables are decoded eagerly — a metadata
    /// entry that fails to decompress is fatal, since the cache cannot
    /// function without its own indices.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        let data = fs::read(directory.join(MAIN_DATA))?;
        let mut store = SectorStore::new(data, 0);
        store.insert_index_channel(META_INDEX_ID, fs::read(directory.join(META_INDEX))?);

        for index_id in 0..=MAX_CONTENT_INDEX {
            let path = directory.join(format!("main_file_cache.idx{index_id}"));
            let Ok(bytes) = fs::read(&path) else {
                break;
            };
            store.insert_index_channel(index_id, bytes);
        }

        let mut tables = BTreeMap::new();
        for index_id in store.index_ids().filter(|&id| id != META_INDEX_ID) {
            let raw = store.read(META_INDEX_ID, u32::from(index_id))?;
            let container = jagfs_codec::decompress(&raw, None)?;
            let table = ReferenceTable::decode(&container.data)?;
            debug!(
                "decoded reference table for index {index_id}: {} entries",
                table.len()
            );
            tables.insert(index_id, table);
        }

        info!(
            "opened modern cache at {}: {} content indices",
            directory.display(),
            tables.len()
        );
        Ok(Self {
            directory,
            store,
            tables,
        })
    }

    /// The cache directory this instance was opened from.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of content index channels collected.
    pub fn index_count(&self) -> usize {
        self.tables.len()
    }

    /// The reference table for a content index.
    pub fn reference_table(&self, index_id: u8) -> Option<&ReferenceTable> {
        self.tables.get(&index_id)
    }

    /// Fetch and decompress a flat file.
    ///
    /// Codec failures (bad compression, wrong keys) surface as `None`:
    /// the entry is skippable, not fatal. Store-level failures propagate.
    pub fn file(
        &self,
        index_id: u8,
        file_id: u32,
        keys: Option<&XteaKey>,
    ) -> Result<Option<Container>> {
        let raw = self.store.read(index_id, file_id)?;
        Ok(decompress_lenient(&raw, keys))
    }

    /// Fetch, decompress and split an archive, sized by its reference
    /// table entry's member count.
    ///
    /// Returns `None` when the index has no entry for `archive_id` or the
    /// container cannot be decoded; split failures are fatal.
    pub fn archive(
        &self,
        index_id: u8,
        archive_id: u32,
        keys: Option<&XteaKey>,
    ) -> Result<Option<Archive>> {
        let Some(entry) = self
            .tables
            .get(&index_id)
            .and_then(|table| table.entry(archive_id))
        else {
            return Ok(None);
        };
        let member_count = entry.child_count();

        let Some(container) = self.file(index_id, archive_id, keys)? else {
            return Ok(None);
        };
        Archive::split(&container.data, member_count).map(Some)
    }

    /// Verify a raw container against its reference-table CRC.
    ///
    /// Returns `None` when the table has no entry for the file.
    pub fn verify_crc(&self, index_id: u8, file_id: u32) -> Result<Option<bool>> {
        let Some(entry) = self
            .tables
            .get(&index_id)
            .and_then(|table| table.entry(file_id))
        else {
            return Ok(None);
        };
        let raw = self.store.read(index_id, file_id)?;
        let actual = crc32fast::hash(&raw) as i32;
        Ok(Some(actual == entry.crc))
    }
}

impl CacheFormat for ModernCache {
    fn raw_file(&self, index_id: u8, file_id: u32) -> Result<Vec<u8>> {
        self.store.read(index_id, file_id)
    }
}
