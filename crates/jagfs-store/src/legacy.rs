//! The early-generation cache facade.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::info;

use jagfs_buffer::{ByteCursor, StringMode};

use crate::archive::NamedArchive;
use crate::sector::SectorStore;
use crate::{CacheFormat, Result};

/// The early data channel file.
pub const LEGACY_MAIN_DATA: &str = "main_file_cache.dat";
/// The early generation ships a fixed set of index channels.
pub const LEGACY_INDEX_COUNT: u8 = 5;

/// Config-archive file id within index 0.
pub const DEFINITION_ARCHIVE_ID: u32 = 2;
/// Version-list archive file id within index 0.
pub const VERSION_LIST_ARCHIVE_ID: u32 = 5;
/// Widget archive file id within index 0.
pub const WIDGET_ARCHIVE_ID: u32 = 3;
/// Media (2D graphics) archive file id within index 0.
pub const MEDIA_ARCHIVE_ID: u32 = 4;

/// Offset of one definition within a `.dat` member, keyed by id.
///
/// The early config archive carries `obj.idx`/`npc.idx`/`loc.idx` members
/// whose u16 record sizes accumulate into offsets into the matching
/// `.dat` member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinitionIndex {
    pub id: u32,
    pub offset: usize,
}

/// One record of the version-list archive's `map_index` manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionManifestEntry {
    /// Packed region id (`(x << 8) | y`).
    pub id: u16,
    /// File id of the tile archive within the maps index.
    pub map_file: u16,
    /// File id of the location archive within the maps index.
    pub landscape_file: u16,
    /// Whether the region is members-only content.
    pub members: bool,
}

/// An early-generation cache: `main_file_cache.dat` plus five fixed
/// index channels, named-file archives and gzip-wrapped content files.
#[derive(Debug)]
pub struct LegacyCache {
    directory: PathBuf,
    store: SectorStore,
}

impl LegacyCache {
    /// Open a cache directory. All five index channels are required.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        let data = fs::read(directory.join(LEGACY_MAIN_DATA))?;
        // The early store numbers channels from 1 in sector headers.
        let mut store = SectorStore::new(data, 1);
        for index_id in 0..LEGACY_INDEX_COUNT {
            let path = directory.join(format!("main_file_cache.idx{index_id}"));
            store.insert_index_channel(index_id, fs::read(&path)?);
        }

        info!("opened legacy cache at {}", directory.display());
        Ok(Self { directory, store })
    }

    /// The cache directory this instance was opened from.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Fetch and decode a named-file archive from index 0.
    pub fn archive(&self, archive_id: u32) -> Result<NamedArchive> {
        let raw = self.store.read(0, archive_id)?;
        NamedArchive::decode(&raw)
    }

    /// Fetch a gzip-wrapped content file (maps, models) and decompress it.
    pub fn gzip_file(&self, index_id: u8, file_id: u32) -> Result<ByteCursor> {
        let raw = self.store.read(index_id, file_id)?;
        let mut out = Vec::new();
        GzDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
        Ok(ByteCursor::from_vec(out).with_string_mode(StringMode::NulTerminated))
    }

    /// Parse a `.idx` member of the config archive into definition
    /// offsets for its sibling `.dat` member.
    pub fn definition_indices(
        archive: &NamedArchive,
        name: &str,
    ) -> Result<Vec<DefinitionIndex>> {
        let Some(mut member) = archive.member_named(name) else {
            return Ok(Vec::new());
        };
        let count = member.read_u16()? as u32;
        let mut indices = Vec::with_capacity(count as usize);
        let mut offset = 2usize;
        for id in 0..count {
            indices.push(DefinitionIndex { id, offset });
            offset += member.read_u16()? as usize;
        }
        Ok(indices)
    }

    /// Parse the version-list archive's `map_index` manifest.
    pub fn region_manifest(archive: &NamedArchive) -> Result<Vec<RegionManifestEntry>> {
        let Some(mut member) = archive.member_named("map_index") else {
            return Ok(Vec::new());
        };
        let count = member.capacity() / 7;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(RegionManifestEntry {
                id: member.read_u16()?,
                map_file: member.read_u16()?,
                landscape_file: member.read_u16()?,
                members: member.read_u8()? == 1,
            });
        }
        Ok(entries)
    }
}

impl CacheFormat for LegacyCache {
    fn raw_file(&self, index_id: u8, file_id: u32) -> Result<Vec<u8>> {
        self.store.read(index_id, file_id)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::archive::{name_hash, NamedArchive};

    use super::*;

    /// A flat (envelope-compressed) named archive, so members need no
    /// per-member BZIP2 in fixtures.
    fn flat_archive(files: &[(&str, &[u8])]) -> NamedArchive {
        let mut table = Vec::new();
        let mut payloads = Vec::new();
        table.extend_from_slice(&(files.len() as u16).to_be_bytes());
        for (name, content) in files {
            table.extend_from_slice(&name_hash(name).to_be_bytes());
            table.extend_from_slice(&(content.len() as u32).to_be_bytes()[1..]);
            table.extend_from_slice(&(content.len() as u32).to_be_bytes()[1..]);
            payloads.extend_from_slice(content);
        }
        let mut body = table;
        body.extend_from_slice(&payloads);

        // Equal sizes mark the envelope as uncompressed; compress with
        // BZIP2 level 1 and strip the magic for the "compressed" shape.
        use std::io::Write;
        let mut encoder =
            bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::new(1));
        encoder.write_all(&body).unwrap();
        let stream = encoder.finish().unwrap();

        let mut out = Vec::new();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        out.extend_from_slice(&((stream.len() - 4) as u32).to_be_bytes()[1..]);
        out.extend_from_slice(&stream[4..]);
        NamedArchive::decode(&out).unwrap()
    }

    #[test]
    fn definition_indices_accumulate_offsets() {
        // Three records of sizes 10, 4, 7; offsets start after the count.
        let mut idx = Vec::new();
        idx.extend_from_slice(&3u16.to_be_bytes());
        for size in [10u16, 4, 7] {
            idx.extend_from_slice(&size.to_be_bytes());
        }
        let archive = flat_archive(&[("obj.idx", &idx)]);
        let indices = LegacyCache::definition_indices(&archive, "obj.idx").unwrap();
        assert_eq!(
            indices,
            vec![
                DefinitionIndex { id: 0, offset: 2 },
                DefinitionIndex { id: 1, offset: 12 },
                DefinitionIndex { id: 2, offset: 16 },
            ]
        );
    }

    #[test]
    fn missing_index_member_is_empty() {
        let archive = flat_archive(&[("npc.idx", &[0u8, 0])]);
        assert!(LegacyCache::definition_indices(&archive, "obj.idx")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn region_manifest_parses_seven_byte_records() {
        let mut manifest = Vec::new();
        for (id, map_file, landscape_file, members) in
            [(0x3232u16, 10u16, 11u16, 1u8), (0x3233, 12, 13, 0)]
        {
            manifest.extend_from_slice(&id.to_be_bytes());
            manifest.extend_from_slice(&map_file.to_be_bytes());
            manifest.extend_from_slice(&landscape_file.to_be_bytes());
            manifest.push(members);
        }
        let archive = flat_archive(&[("map_index", &manifest)]);
        let entries = LegacyCache::region_manifest(&archive).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            RegionManifestEntry {
                id: 0x3232,
                map_file: 10,
                landscape_file: 11,
                members: true,
            }
        );
        assert!(!entries[1].members);
    }
}
