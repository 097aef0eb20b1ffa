//! Archive containers: one decompressed blob split into member regions.
//!
//! The modern generation appends a chunk-count byte and a per-chunk,
//! per-member delta grid to the blob; members are numbered. The early
//! generation instead opens with a named-file table (hash, sizes) ahead
//! of concatenated payloads; members are looked up by name hash.

use std::collections::HashMap;

use tracing::trace;

use jagfs_buffer::{ByteCursor, StringMode};
use jagfs_codec::decompress_bzip2;

use crate::error::Error;
use crate::Result;

/// A split archive with numbered members.
#[derive(Debug)]
pub struct Archive {
    members: Vec<ByteCursor>,
}

impl Archive {
    /// Split a decompressed blob into `member_count` members using the
    /// trailing chunk-delta table.
    pub fn split(data: &[u8], member_count: usize) -> Result<Self> {
        if member_count < 1 {
            return Err(Error::InvalidArchiveSize(member_count));
        }

        let mut cur = ByteCursor::from_vec(data.to_vec());
        let len = cur.capacity();
        if len == 0 {
            return Err(Error::InvalidArchiveSize(member_count));
        }

        cur.set_read_pos(len - 1).map_err(Error::TruncatedArchive)?;
        let chunk_count = cur.read_u8()? as usize;

        let table_len = chunk_count * member_count * 4;
        let table_start = len
            .checked_sub(1 + table_len)
            .ok_or(Error::ChunkAccounting {
                expected: table_len + 1,
                actual: len,
            })?;

        // First pass over the delta grid: per-chunk slice sizes and
        // per-member totals.
        cur.set_read_pos(table_start).map_err(Error::TruncatedArchive)?;
        let mut chunk_sizes = vec![vec![0usize; member_count]; chunk_count];
        let mut totals = vec![0usize; member_count];
        for chunk in 0..chunk_count {
            let mut running: i32 = 0;
            for member in 0..member_count {
                let delta = cur.read_i32()?;
                running = running.wrapping_add(delta);
                if running < 0 {
                    return Err(Error::ChunkAccounting {
                        expected: table_start,
                        actual: cur.read_pos(),
                    });
                }
                chunk_sizes[chunk][member] = running as usize;
                totals[member] += running as usize;
            }
        }

        let mut members: Vec<ByteCursor> = totals
            .iter()
            .map(|&total| ByteCursor::with_capacity(total))
            .collect();

        // Second pass from the front, slicing each chunk's run of member
        // regions in table order.
        let mut pos = 0usize;
        for chunk_row in &chunk_sizes {
            for (member, &size) in chunk_row.iter().enumerate() {
                let end = pos + size;
                if end > table_start {
                    return Err(Error::ChunkAccounting {
                        expected: table_start,
                        actual: end,
                    });
                }
                members[member].write_bytes(&data[pos..end])?;
                pos = end;
            }
        }

        // The payload walk must land exactly at the delta grid.
        if pos != table_start {
            return Err(Error::ChunkAccounting {
                expected: table_start,
                actual: pos,
            });
        }

        trace!(
            "split archive: {member_count} members, {chunk_count} chunks, {len} bytes"
        );
        Ok(Self { members })
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the archive has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Borrow a member region.
    pub fn member(&self, index: usize) -> Option<&ByteCursor> {
        self.members.get(index)
    }

    /// Consume the archive into its member regions.
    pub fn into_members(self) -> Vec<ByteCursor> {
        self.members
    }
}

/// Case-insensitive hash over a member's logical name in the early
/// generation's archives, with Java's 32-bit wrapping.
pub fn name_hash(name: &str) -> i32 {
    let mut hash: i32 = 0;
    for c in name.to_ascii_uppercase().chars() {
        hash = hash.wrapping_mul(61).wrapping_add(c as i32 - 32);
    }
    hash
}

/// An early-generation archive with members addressed by name hash.
///
/// Members are decompressed once at decode time; when the whole archive
/// travels inside a single BZIP2 envelope its members are stored flat.
#[derive(Debug)]
pub struct NamedArchive {
    members: HashMap<i32, Vec<u8>>,
}

impl NamedArchive {
    /// Decode an early archive from its raw cache-file bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut cur = ByteCursor::from_vec(data.to_vec());
        let uncompressed_len = cur.read_u24()?;
        let compressed_len = cur.read_u24()?;

        let whole_compressed = uncompressed_len != compressed_len;
        let body = if whole_compressed {
            let remainder = cur.read_bytes(cur.remaining())?;
            decompress_bzip2(&remainder)?
        } else {
            cur.read_bytes(cur.remaining())?
        };

        let mut body_cur = ByteCursor::from_vec(body);
        let count = body_cur.read_u16()? as usize;

        struct RawEntry {
            name_hash: i32,
            compressed_size: usize,
            offset: usize,
        }

        let mut entries = Vec::with_capacity(count);
        let mut offset = body_cur.read_pos() + count * 10;
        for _ in 0..count {
            let name_hash = body_cur.read_i32()?;
            let _uncompressed_size = body_cur.read_u24()? as usize;
            let compressed_size = body_cur.read_u24()? as usize;
            entries.push(RawEntry {
                name_hash,
                compressed_size,
                offset,
            });
            offset += compressed_size;
        }

        let body = body_cur.into_vec();
        let mut members = HashMap::with_capacity(count);
        for entry in entries {
            let Some(payload) = body.get(entry.offset..entry.offset + entry.compressed_size)
            else {
                return Err(Error::InvalidNamedEntry {
                    name_hash: entry.name_hash,
                });
            };
            // Inside a compressed envelope the members are flat;
            // otherwise each member is its own headerless BZIP2 stream.
            let data = if whole_compressed {
                payload.to_vec()
            } else {
                decompress_bzip2(payload)?
            };
            members.insert(entry.name_hash, data);
        }

        trace!("decoded named archive: {} members", members.len());
        Ok(Self { members })
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the archive has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Fetch a member by logical name, as an early-era cursor.
    pub fn member_named(&self, name: &str) -> Option<ByteCursor> {
        self.member_hashed(name_hash(name))
    }

    /// Fetch a member by precomputed name hash.
    pub fn member_hashed(&self, name_hash: i32) -> Option<ByteCursor> {
        self.members.get(&name_hash).map(|data| {
            ByteCursor::from_vec(data.clone()).with_string_mode(StringMode::NulTerminated)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use bzip2::write::BzEncoder;
    use pretty_assertions::assert_eq;

    use super::*;

    /// Build a splittable blob: members cut into `chunk_count` chunks,
    /// concatenated chunk-major, with the trailing delta grid.
    pub(crate) fn build_chunked_blob(members: &[&[u8]], chunk_count: usize) -> Vec<u8> {
        let mut payload = Vec::new();
        let mut sizes = vec![vec![0i32; members.len()]; chunk_count];

        for (chunk, row) in sizes.iter_mut().enumerate() {
            for (m, member) in members.iter().enumerate() {
                let per = member.len() / chunk_count;
                let start = chunk * per;
                let end = if chunk + 1 == chunk_count { member.len() } else { start + per };
                payload.extend_from_slice(&member[start..end]);
                row[m] = (end - start) as i32;
            }
        }

        for chunk in 0..chunk_count {
            let mut previous = 0i32;
            for m in 0..members.len() {
                let size = sizes[chunk][m];
                payload.extend_from_slice(&(size - previous).to_be_bytes());
                previous = size;
            }
        }
        payload.push(chunk_count as u8);
        payload
    }

    #[test]
    fn split_reconstructs_members_exactly() {
        let members: [&[u8]; 3] = [b"first member payload", b"2nd", b"the third member"];
        for chunk_count in [1usize, 2, 3] {
            let blob = build_chunked_blob(&members, chunk_count);
            let archive = Archive::split(&blob, members.len()).unwrap();
            assert_eq!(archive.len(), 3);
            for (i, expected) in members.iter().enumerate() {
                assert_eq!(archive.member(i).unwrap().as_slice(), *expected);
            }
        }
    }

    #[test]
    fn concatenating_members_reconstructs_the_payload() {
        // Chunk accounting law: with one chunk, members in table order
        // are the payload in order.
        let members: [&[u8]; 2] = [b"alpha", b"beta-beta"];
        let blob = build_chunked_blob(&members, 1);
        let archive = Archive::split(&blob, 2).unwrap();
        let mut reconstructed = Vec::new();
        for member in archive.into_members() {
            reconstructed.extend_from_slice(member.as_slice());
        }
        assert_eq!(&blob[..reconstructed.len()], reconstructed.as_slice());
    }

    #[test]
    fn zero_members_is_invalid() {
        assert!(matches!(
            Archive::split(b"x", 0),
            Err(Error::InvalidArchiveSize(0))
        ));
    }

    #[test]
    fn an_oversized_grid_fails_accounting() {
        // Chunk count byte claims more table than the blob holds.
        let blob = vec![0u8, 0, 0, 9];
        assert!(matches!(
            Archive::split(&blob, 4),
            Err(Error::ChunkAccounting { .. })
        ));
    }

    #[test]
    fn leftover_payload_fails_accounting() {
        let members: [&[u8]; 2] = [b"aaaa", b"bb"];
        let mut blob = build_chunked_blob(&members, 1);
        // Inject an extra payload byte ahead of the grid.
        blob.insert(6, 0xEE);
        assert!(matches!(
            Archive::split(&blob, 2),
            Err(Error::ChunkAccounting { .. })
        ));
    }

    #[test]
    fn name_hash_matches_reference_values() {
        // Values computed with the original reader's hash.
        assert_eq!(name_hash("obj.idx"), -1667598946);
        assert_eq!(name_hash("npc.idx"), 1489126980);
        assert_eq!(name_hash("loc.idx"), 682997061);
        assert_eq!(name_hash("map_index"), 1987120305);
        // Case-insensitive.
        assert_eq!(name_hash("OBJ.IDX"), name_hash("obj.idx"));
    }

    fn bzip2_body(payload: &[u8]) -> Vec<u8> {
        let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::new(1));
        encoder.write_all(payload).unwrap();
        let stream = encoder.finish().unwrap();
        stream[4..].to_vec() // the cache strips the magic
    }

    fn named_archive_bytes(files: &[(&str, &[u8])], whole_compressed: bool) -> Vec<u8> {
        let mut table = Vec::new();
        let mut payloads = Vec::new();
        table.extend_from_slice(&(files.len() as u16).to_be_bytes());
        for (name, content) in files {
            let stored = if whole_compressed {
                content.to_vec()
            } else {
                bzip2_body(content)
            };
            table.extend_from_slice(&name_hash(name).to_be_bytes());
            table.extend_from_slice(&(content.len() as u32).to_be_bytes()[1..]);
            table.extend_from_slice(&(stored.len() as u32).to_be_bytes()[1..]);
            payloads.extend_from_slice(&stored);
        }

        let mut body = table;
        body.extend_from_slice(&payloads);

        let mut out = Vec::new();
        if whole_compressed {
            let compressed = bzip2_body(&body);
            out.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
            out.extend_from_slice(&(compressed.len() as u32).to_be_bytes()[1..]);
            out.extend_from_slice(&compressed);
        } else {
            out.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
            out.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
            out.extend_from_slice(&body);
        }
        out
    }

    #[test]
    fn named_archive_with_per_member_compression() {
        let files: [(&str, &[u8]); 2] =
            [("obj.idx", b"object index payload"), ("npc.dat", b"npc data payload")];
        let archive = NamedArchive::decode(&named_archive_bytes(&files, false)).unwrap();
        assert_eq!(archive.len(), 2);
        let member = archive.member_named("obj.idx").unwrap();
        assert_eq!(member.as_slice(), b"object index payload");
        assert_eq!(member.string_mode(), StringMode::NulTerminated);
        assert!(archive.member_named("missing.dat").is_none());
    }

    #[test]
    fn named_archive_with_whole_envelope_compression() {
        let files: [(&str, &[u8]); 2] =
            [("map_index", b"manifest bytes here"), ("loc.dat", b"location data")];
        let archive = NamedArchive::decode(&named_archive_bytes(&files, true)).unwrap();
        assert_eq!(
            archive.member_named("map_index").unwrap().as_slice(),
            b"manifest bytes here"
        );
        assert_eq!(
            archive.member_named("loc.dat").unwrap().as_slice(),
            b"location data"
        );
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let files: [(&str, &[u8]); 1] = [("obj.idx", b"payload")];
        let archive = NamedArchive::decode(&named_archive_bytes(&files, true)).unwrap();
        assert!(archive.member_named("OBJ.IDX").is_some());
    }
}
