//! Map region decoding: terrain tiles and location-object placements.
//!
//! A region is a 64x64 tile square on four levels. Its tile file is an
//! opcode-range stream per tile; its location file is a pair of nested
//! smart-integer delta streams. Region files are found through the maps
//! index's identifier hashes (`m{x}_{y}` for tiles, `l{x}_{y}` for
//! locations), and location files may be XTEA-encrypted.

use std::collections::BTreeMap;

use tracing::info;

use jagfs_buffer::ByteCursor;
use jagfs_crypto::XteaKey;
use jagfs_store::{identifier_hash, IndexType, ModernCache};

use crate::Result;

/// Region side length in tiles.
pub const REGION_SIZE: i32 = 64;
/// Number of vertical levels.
pub const LEVEL_COUNT: u8 = 4;

/// One terrain tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub level: u8,
    pub height: Option<u8>,
    pub attr_opcode: u8,
    pub overlay_id: i8,
    pub overlay_path: u8,
    pub overlay_orientation: u8,
    pub underlay_id: u8,
    pub flags: u8,
}

impl Tile {
    /// Whether the tile is a bridge (flag bit 0x2).
    pub const fn bridge(&self) -> bool {
        self.flags & 0x2 != 0
    }

    /// Whether the tile blocks movement (flag bit 0x1).
    pub const fn non_walkable(&self) -> bool {
        self.flags & 0x1 != 0
    }
}

/// One placed location object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationPlacement {
    pub object_id: i32,
    pub x: i32,
    pub y: i32,
    pub level: u8,
    pub kind: u8,
    pub orientation: u8,
}

/// A decoded region.
#[derive(Debug, Clone, Default)]
pub struct RegionData {
    pub tiles: Vec<Tile>,
    pub locations: Vec<LocationPlacement>,
}

/// All decoded map content.
#[derive(Debug, Clone, Default)]
pub struct MapData {
    pub tiles: Vec<Tile>,
    pub locations: Vec<LocationPlacement>,
}

/// Decode a region's tile stream.
///
/// `keep_all` retains every tile; otherwise only flagged tiles are
/// collected.
pub fn decode_tiles(
    cursor: &mut ByteCursor,
    world_x: i32,
    world_y: i32,
    keep_all: bool,
) -> Result<Vec<Tile>> {
    let mut tiles = Vec::new();

    for level in 0..LEVEL_COUNT {
        for x in 0..REGION_SIZE {
            for y in 0..REGION_SIZE {
                let mut tile = Tile {
                    x: x + world_x,
                    y: y + world_y,
                    level,
                    ..Tile::default()
                };

                loop {
                    let opcode = cursor.read_u8()?;
                    if opcode == 0 {
                        break;
                    } else if opcode == 1 {
                        tile.height = Some(cursor.read_u8()?);
                        break;
                    } else if opcode <= 49 {
                        tile.attr_opcode = opcode;
                        tile.overlay_id = cursor.read_i8()?;
                        tile.overlay_path = (opcode - 2) / 4;
                        tile.overlay_orientation = (opcode - 2) & 3;
                    } else if opcode <= 81 {
                        tile.flags = opcode - 49;
                    } else {
                        tile.underlay_id = opcode - 81;
                    }
                }

                if tile.flags > 0 || keep_all {
                    tiles.push(tile);
                }
            }
        }
    }

    Ok(tiles)
}

/// Decode a region's location-placement stream.
pub fn decode_locations(
    cursor: &mut ByteCursor,
    world_x: i32,
    world_y: i32,
) -> Result<Vec<LocationPlacement>> {
    let mut locations = Vec::new();
    let mut object_id: i32 = -1;

    loop {
        let id_delta = cursor.read_smart()?;
        if id_delta == 0 {
            break;
        }
        object_id += id_delta;

        let mut packed_position: i32 = 0;
        loop {
            let position_delta = cursor.read_smart()?;
            if position_delta == 0 {
                break;
            }
            packed_position += position_delta - 1;

            let x = ((packed_position >> 6) & 0x3F) + world_x;
            let y = (packed_position & 0x3F) + world_y;
            let level = ((packed_position >> 12) & 0x3) as u8;
            let metadata = cursor.read_u8()?;

            locations.push(LocationPlacement {
                object_id,
                x,
                y,
                level,
                kind: metadata >> 2,
                orientation: metadata & 0x3,
            });
        }
    }

    Ok(locations)
}

/// Decode one region by its region coordinates.
///
/// Returns `None` when the maps index has no tile file for the region.
/// A location file that is missing or cannot be decrypted yields a
/// region with no placements, per the codec's absent-entry policy.
pub fn decode_region(
    cache: &ModernCache,
    region_x: u8,
    region_y: u8,
    keys: Option<&XteaKey>,
) -> Result<Option<RegionData>> {
    let Some(table) = cache.reference_table(IndexType::Maps.id()) else {
        return Ok(None);
    };

    let world_x = i32::from(region_x) * REGION_SIZE;
    let world_y = i32::from(region_y) * REGION_SIZE;

    let tile_hash = identifier_hash(&format!("m{region_x}_{region_y}"));
    let Some((tile_file, _)) = table.entry_by_identifier(tile_hash) else {
        return Ok(None);
    };
    let Some(container) = cache.file(IndexType::Maps.id(), tile_file, None)? else {
        return Ok(None);
    };
    let mut cursor = container.into_cursor();
    let tiles = decode_tiles(&mut cursor, world_x, world_y, false)?;

    let mut locations = Vec::new();
    let location_hash = identifier_hash(&format!("l{region_x}_{region_y}"));
    if let Some((location_file, _)) = table.entry_by_identifier(location_hash) {
        if let Some(container) = cache.file(IndexType::Maps.id(), location_file, keys)? {
            let mut cursor = container.into_cursor();
            locations = decode_locations(&mut cursor, world_x, world_y)?;
        }
    }

    Ok(Some(RegionData { tiles, locations }))
}

/// Decode every region present in the maps index.
///
/// `keys` maps packed region ids (`(x << 8) | y`) to their XTEA keys;
/// regions without a key entry try an unkeyed read.
pub fn decode_regions(
    cache: &ModernCache,
    keys: &BTreeMap<u16, XteaKey>,
) -> Result<MapData> {
    let mut map = MapData::default();
    let mut valid_regions = 0usize;
    let mut missing_locations = 0usize;

    for region in 0u16..=0x7FFF {
        let region_x = (region >> 8) as u8;
        let region_y = (region & 0xFF) as u8;
        let Some(data) =
            decode_region(cache, region_x, region_y, keys.get(&region))?
        else {
            continue;
        };

        valid_regions += 1;
        if data.locations.is_empty() {
            missing_locations += 1;
        }
        map.tiles.extend(data.tiles);
        map.locations.extend(data.locations);
    }

    info!(
        "decoded {} map tiles and {} location placements ({missing_locations}/{valid_regions} regions without placements)",
        map.tiles.len(),
        map.locations.len()
    );
    Ok(map)
}
