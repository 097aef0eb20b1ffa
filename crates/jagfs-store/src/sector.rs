//! The sector-chained file store.

use std::collections::BTreeMap;

use byteorder::{BigEndian, ByteOrder};
use tracing::trace;

use crate::error::Error;
use crate::Result;

/// Size of one index-channel record: `{size: u24, first_sector: u24}`.
pub const INDEX_ENTRY_SIZE: usize = 6;
/// Size of a sector header: `{file_id: u16, chunk: u16, next: u24, index: u8}`.
pub const SECTOR_HEADER_SIZE: usize = 8;
/// Payload bytes per sector.
pub const SECTOR_DATA_SIZE: usize = 512;
/// Total sector size.
pub const SECTOR_SIZE: usize = SECTOR_HEADER_SIZE + SECTOR_DATA_SIZE;
/// Index id of the metadata channel in the modern generation.
pub const META_INDEX_ID: u8 = 255;

#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    size: u32,
    first_sector: u32,
}

#[derive(Debug, Clone, Copy)]
struct SectorHeader {
    file_id: u16,
    chunk: u16,
    next_sector: u32,
    index_id: u8,
}

impl SectorHeader {
    fn parse(bytes: &[u8]) -> Self {
        Self {
            file_id: BigEndian::read_u16(&bytes[0..2]),
            chunk: BigEndian::read_u16(&bytes[2..4]),
            next_sector: BigEndian::read_u24(&bytes[4..7]),
            index_id: bytes[7],
        }
    }
}

/// The raw channel buffers of one cache, read eagerly at open time and
/// immutable afterwards.
///
/// `id_offset` covers the one layout difference between the generations:
/// the early store numbers its channels from 1 in sector headers while
/// callers address them from 0.
#[derive(Debug)]
pub struct SectorStore {
    data: Vec<u8>,
    index_channels: BTreeMap<u8, Vec<u8>>,
    id_offset: u8,
}

impl SectorStore {
    /// Wrap a data channel. Index channels are attached with
    /// [`SectorStore::insert_index_channel`].
    pub fn new(data: Vec<u8>, id_offset: u8) -> Self {
        Self {
            data,
            index_channels: BTreeMap::new(),
            id_offset,
        }
    }

    /// Attach an index channel buffer under `index_id`.
    pub fn insert_index_channel(&mut self, index_id: u8, bytes: Vec<u8>) {
        self.index_channels.insert(index_id, bytes);
    }

    /// Whether a channel is attached under `index_id`.
    pub fn has_index(&self, index_id: u8) -> bool {
        self.index_channels.contains_key(&index_id)
    }

    /// Ids of the attached index channels, in order.
    pub fn index_ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.index_channels.keys().copied()
    }

    /// Number of records an index channel can address.
    pub fn file_count(&self, index_id: u8) -> Result<u32> {
        let channel = self
            .index_channels
            .get(&index_id)
            .ok_or(Error::IndexNotLoaded(index_id))?;
        Ok((channel.len() / INDEX_ENTRY_SIZE) as u32)
    }

    fn index_entry(&self, index_id: u8, file_id: u32) -> Result<IndexEntry> {
        let channel = self
            .index_channels
            .get(&index_id)
            .ok_or(Error::IndexNotLoaded(index_id))?;

        let ptr = file_id as usize * INDEX_ENTRY_SIZE;
        let Some(record) = channel.get(ptr..ptr + INDEX_ENTRY_SIZE) else {
            return Err(Error::FileNotFound { index_id, file_id });
        };

        Ok(IndexEntry {
            size: BigEndian::read_u24(&record[0..3]),
            first_sector: BigEndian::read_u24(&record[3..6]),
        })
    }

    /// Reassemble a stored file by walking its sector chain.
    ///
    /// Every visited sector's file id, index id and chunk sequence must
    /// match expectations exactly; a mismatch means the store itself is
    /// corrupt and the read fails without recovery.
    pub fn read(&self, index_id: u8, file_id: u32) -> Result<Vec<u8>> {
        let entry = self.index_entry(index_id, file_id)?;
        trace!(
            "reading index {index_id} file {file_id}: {} bytes from sector {}",
            entry.size, entry.first_sector
        );

        let mut out = Vec::with_capacity(entry.size as usize);
        let mut remaining = entry.size as usize;
        let mut sector = entry.first_sector;
        let mut chunk: u16 = 0;

        while remaining > 0 {
            let ptr = sector as usize * SECTOR_SIZE;
            let Some(block) = self.data.get(ptr..ptr + SECTOR_SIZE) else {
                return Err(Error::SectorOutOfRange { sector });
            };
            let header = SectorHeader::parse(block);

            if header.index_id != index_id.wrapping_add(self.id_offset) {
                return Err(Error::FileTypeMismatch {
                    expected: index_id,
                    actual: header.index_id,
                });
            }
            if u32::from(header.file_id) != (file_id & 0xFFFF) {
                return Err(Error::FileIdMismatch {
                    expected: file_id,
                    actual: u32::from(header.file_id),
                });
            }
            if header.chunk != chunk {
                return Err(Error::ChunkMismatch {
                    expected: u32::from(chunk),
                    actual: u32::from(header.chunk),
                });
            }

            let take = remaining.min(SECTOR_DATA_SIZE);
            out.extend_from_slice(&block[SECTOR_HEADER_SIZE..SECTOR_HEADER_SIZE + take]);
            remaining -= take;

            if remaining > 0 && header.next_sector == 0 {
                return Err(Error::SectorOutOfRange { sector: 0 });
            }
            sector = header.next_sector;
            chunk = chunk.wrapping_add(1);
        }

        Ok(out)
    }
}
