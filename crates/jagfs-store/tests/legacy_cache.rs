//! End-to-end tests over an on-disk early-generation cache fixture.

use std::fs;
use std::io::Write;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use jagfs_store::legacy::DEFINITION_ARCHIVE_ID;
use jagfs_store::{name_hash, CacheFormat, LegacyCache};

const INDEX_ENTRY_SIZE: usize = 6;
const SECTOR_SIZE: usize = 520;
const SECTOR_DATA_SIZE: usize = 512;

/// Append `content` as a sector chain. `header_id` is the index byte
/// stamped into sector headers — the early store numbers channels from 1.
fn write_file(
    data: &mut Vec<u8>,
    index: &mut Vec<u8>,
    header_id: u8,
    file_id: u32,
    content: &[u8],
) {
    if data.is_empty() {
        data.resize(SECTOR_SIZE, 0);
    }

    let first_sector = data.len() / SECTOR_SIZE;
    let record_ptr = file_id as usize * INDEX_ENTRY_SIZE;
    if index.len() < record_ptr + INDEX_ENTRY_SIZE {
        index.resize(record_ptr + INDEX_ENTRY_SIZE, 0);
    }
    index[record_ptr..record_ptr + 3].copy_from_slice(&(content.len() as u32).to_be_bytes()[1..]);
    index[record_ptr + 3..record_ptr + 6]
        .copy_from_slice(&(first_sector as u32).to_be_bytes()[1..]);

    let chunks: Vec<&[u8]> = content.chunks(SECTOR_DATA_SIZE).collect();
    for (seq, chunk) in chunks.iter().enumerate() {
        let this_sector = data.len() / SECTOR_SIZE;
        let next = if seq + 1 < chunks.len() { (this_sector + 1) as u32 } else { 0 };
        data.extend_from_slice(&(file_id as u16).to_be_bytes());
        data.extend_from_slice(&(seq as u16).to_be_bytes());
        data.extend_from_slice(&next.to_be_bytes()[1..]);
        data.push(header_id);
        let mut payload = [0u8; SECTOR_DATA_SIZE];
        payload[..chunk.len()].copy_from_slice(chunk);
        data.extend_from_slice(&payload);
    }
}

/// A named archive in a compressed envelope (members stored flat).
fn named_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
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

    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::new(1));
    encoder.write_all(&body).unwrap();
    let stream = encoder.finish().unwrap();

    let mut out = Vec::new();
    out.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
    out.extend_from_slice(&((stream.len() - 4) as u32).to_be_bytes()[1..]);
    out.extend_from_slice(&stream[4..]); // magic stripped on disk
    out
}

fn build_cache(dir: &Path) {
    let mut obj_idx = Vec::new();
    obj_idx.extend_from_slice(&2u16.to_be_bytes());
    obj_idx.extend_from_slice(&5u16.to_be_bytes());
    obj_idx.extend_from_slice(&9u16.to_be_bytes());

    let config =
        named_archive(&[("obj.idx", obj_idx.as_slice()), ("obj.dat", b"definition stream")]);

    let mut gzipped = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    gzipped.write_all(b"gzip-wrapped map bytes").unwrap();
    let map_file = gzipped.finish().unwrap();

    let mut data = Vec::new();
    let mut channels: Vec<Vec<u8>> = vec![Vec::new(); 5];
    write_file(&mut data, &mut channels[0], 1, DEFINITION_ARCHIVE_ID, &config);
    write_file(&mut data, &mut channels[4], 5, 0, &map_file);

    fs::write(dir.join("main_file_cache.dat"), data).unwrap();
    for (i, channel) in channels.iter().enumerate() {
        fs::write(dir.join(format!("main_file_cache.idx{i}")), channel).unwrap();
    }
}

#[test]
fn open_requires_all_five_index_channels() {
    let dir = TempDir::new().unwrap();
    build_cache(dir.path());
    fs::remove_file(dir.path().join("main_file_cache.idx3")).unwrap();
    assert!(LegacyCache::open(dir.path()).is_err());
}

#[test]
fn named_archive_round_trips_through_the_store() {
    let dir = TempDir::new().unwrap();
    build_cache(dir.path());
    let cache = LegacyCache::open(dir.path()).unwrap();

    let archive = cache.archive(DEFINITION_ARCHIVE_ID).unwrap();
    assert_eq!(archive.len(), 2);
    assert_eq!(
        archive.member_named("obj.dat").unwrap().as_slice(),
        b"definition stream"
    );

    let indices = LegacyCache::definition_indices(&archive, "obj.idx").unwrap();
    assert_eq!(indices.len(), 2);
    assert_eq!(indices[0].offset, 2);
    assert_eq!(indices[1].offset, 7);
}

#[test]
fn gzip_files_decompress_with_the_early_string_mode() {
    let dir = TempDir::new().unwrap();
    build_cache(dir.path());
    let cache = LegacyCache::open(dir.path()).unwrap();

    let cursor = cache.gzip_file(4, 0).unwrap();
    assert_eq!(cursor.as_slice(), b"gzip-wrapped map bytes");
}

#[test]
fn raw_reads_validate_the_shifted_index_byte() {
    let dir = TempDir::new().unwrap();
    build_cache(dir.path());
    let cache = LegacyCache::open(dir.path()).unwrap();

    // Channel 0's sectors carry index byte 1; the walk accepts them when
    // the caller asks for channel 0.
    assert!(cache.raw_file(0, DEFINITION_ARCHIVE_ID).is_ok());
}
