//! Reference-table decoding.
//!
//! A reference table holds details for all files of a single content
//! type: checksums, versions and archive members, with optional fields
//! for identifier hashes and whirlpool digests.

use std::collections::BTreeMap;

use jagfs_buffer::{ByteCursor, Result as BufferResult};

use crate::error::Error;
use crate::Result;

/// Flag bit: entries carry identifier name hashes.
pub const FLAG_IDENTIFIERS: u8 = 0x01;
/// Flag bit: entries carry 64-byte whirlpool digests.
pub const FLAG_WHIRLPOOL: u8 = 0x02;

/// A member file of an archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    /// Identifier name hash; -1 when the table carries none.
    pub identifier: i32,
}

impl Default for ChildEntry {
    fn default() -> Self {
        Self { identifier: -1 }
    }
}

/// Metadata for one archive within an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Identifier name hash; -1 when the table carries none.
    pub identifier: i32,
    /// CRC-32 of the raw (still compressed) container.
    pub crc: i32,
    /// Whirlpool digest when the table carries them.
    pub whirlpool: Option<[u8; 64]>,
    /// Version number.
    pub version: i32,
    /// Member files keyed by child id.
    pub children: BTreeMap<u32, ChildEntry>,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            identifier: -1,
            crc: 0,
            whirlpool: None,
            version: 0,
            children: BTreeMap::new(),
        }
    }
}

impl Entry {
    /// Number of member files the archive holds; this sizes the archive
    /// split.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Per-index metadata decoded from the metadata channel.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    /// Table format; formats of 6 and above carry a version.
    pub format: u8,
    /// Table version when `format >= 6`.
    pub version: Option<i32>,
    /// Optional-field flags.
    pub flags: u8,
    /// Entries keyed by archive id.
    pub entries: BTreeMap<u32, Entry>,
}

impl ReferenceTable {
    /// Decode a table from its decompressed bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        decode_inner(data).map_err(Error::TruncatedReferenceTable)
    }

    /// Whether entries carry identifier hashes.
    pub fn named(&self) -> bool {
        self.flags & FLAG_IDENTIFIERS != 0
    }

    /// Look up an entry by archive id.
    pub fn entry(&self, id: u32) -> Option<&Entry> {
        self.entries.get(&id)
    }

    /// Look up an entry by its identifier hash (see [`identifier_hash`]).
    pub fn entry_by_identifier(&self, identifier: i32) -> Option<(u32, &Entry)> {
        if identifier == -1 {
            return None;
        }
        self.entries
            .iter()
            .find(|(_, entry)| entry.identifier == identifier)
            .map(|(id, entry)| (*id, entry))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One past the highest archive id, the capacity a dense id array
    /// would need.
    pub fn capacity(&self) -> u32 {
        self.entries
            .keys()
            .next_back()
            .map_or(0, |id| id + 1)
    }
}

/// Decode a delta-encoded ascending id list: each u16 delta accumulates
/// onto the previous id. The same scheme encodes entry ids and, per
/// entry, child ids.
fn read_delta_ids(cur: &mut ByteCursor, count: usize) -> BufferResult<Vec<u32>> {
    let mut ids = Vec::with_capacity(count);
    let mut accumulator = 0u32;
    for _ in 0..count {
        accumulator = accumulator.wrapping_add(u32::from(cur.read_u16()?));
        ids.push(accumulator);
    }
    Ok(ids)
}

fn decode_inner(data: &[u8]) -> BufferResult<ReferenceTable> {
    let mut cur = ByteCursor::from_vec(data.to_vec());
    let mut table = ReferenceTable {
        format: cur.read_u8()?,
        ..ReferenceTable::default()
    };
    if table.format >= 6 {
        table.version = Some(cur.read_i32()?);
    }
    table.flags = cur.read_u8()?;

    let count = cur.read_u16()? as usize;
    let ids = read_delta_ids(&mut cur, count)?;
    for &id in &ids {
        table.entries.insert(id, Entry::default());
    }

    if table.flags & FLAG_IDENTIFIERS != 0 {
        for &id in &ids {
            let identifier = cur.read_i32()?;
            if let Some(entry) = table.entries.get_mut(&id) {
                entry.identifier = identifier;
            }
        }
    }

    for &id in &ids {
        let crc = cur.read_i32()?;
        if let Some(entry) = table.entries.get_mut(&id) {
            entry.crc = crc;
        }
    }

    if table.flags & FLAG_WHIRLPOOL != 0 {
        for &id in &ids {
            let mut digest = [0u8; 64];
            cur.read_exact(&mut digest)?;
            if let Some(entry) = table.entries.get_mut(&id) {
                entry.whirlpool = Some(digest);
            }
        }
    }

    for &id in &ids {
        let version = cur.read_i32()?;
        if let Some(entry) = table.entries.get_mut(&id) {
            entry.version = version;
        }
    }

    let mut child_counts = Vec::with_capacity(ids.len());
    for _ in &ids {
        child_counts.push(cur.read_u16()? as usize);
    }

    let mut child_ids = Vec::with_capacity(ids.len());
    for &count in &child_counts {
        child_ids.push(read_delta_ids(&mut cur, count)?);
    }
    for (&id, children) in ids.iter().zip(&child_ids) {
        if let Some(entry) = table.entries.get_mut(&id) {
            for &child in children {
                entry.children.insert(child, ChildEntry::default());
            }
        }
    }

    if table.flags & FLAG_IDENTIFIERS != 0 {
        for (&id, children) in ids.iter().zip(&child_ids) {
            for &child in children {
                let identifier = cur.read_i32()?;
                if let Some(child_entry) = table
                    .entries
                    .get_mut(&id)
                    .and_then(|entry| entry.children.get_mut(&child))
                {
                    child_entry.identifier = identifier;
                }
            }
        }
    }

    Ok(table)
}

/// Identifier hash over a logical file name, as stored in named
/// reference tables. Map region files are looked up this way
/// (`m{x}_{y}` / `l{x}_{y}`).
pub fn identifier_hash(name: &str) -> i32 {
    let mut hash: i32 = 0;
    for c in name.chars() {
        hash = (c as i32).wrapping_add((hash << 5).wrapping_sub(hash));
    }
    hash
}
