//! Location-object (scenery) definition decoding.
//!
//! The generations diverge on a handful of opcodes — the early table has
//! a description string and a wider option range, the modern one grew
//! morph and scaling opcodes — so the table branches on the record's era.

use std::collections::BTreeMap;

use tracing::info;

use jagfs_buffer::ByteCursor;
use jagfs_store::{IndexType, LegacyCache, ModernCache, NamedArchive};

use crate::opcode::{
    decode_record, decode_record_into, optional_option, optional_u16, ranged_slot,
    unknown_opcode, OpcodeDecode,
};
use crate::{Era, Error, Result};

/// Archive id of the location-object configs within the definitions index.
pub const LOCATION_ARCHIVE_ID: u32 = 6;

/// A location-object definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationObjectDefinition {
    pub id: u32,
    pub era: Era,
    pub name: Option<String>,
    /// Examine text; early generation only.
    pub description: Option<String>,
    pub size_x: i32,
    pub size_y: i32,
    pub solid: bool,
    pub non_walkable: bool,
    pub blocks_projectile: bool,
    pub has_options: bool,
    /// Right-click options; the early table addresses nine slots.
    pub options: [Option<String>; 9],
    pub adjust_to_terrain: bool,
    pub non_flat_shading: bool,
    pub animation_id: i32,
    pub face: u8,
    pub translate_x: i32,
    pub translate_y: i32,
    pub translate_level: i32,
}

impl Default for LocationObjectDefinition {
    fn default() -> Self {
        Self {
            id: 0,
            era: Era::Modern,
            name: None,
            description: None,
            size_x: 1,
            size_y: 1,
            solid: true,
            non_walkable: true,
            blocks_projectile: true,
            has_options: false,
            options: Default::default(),
            adjust_to_terrain: false,
            non_flat_shading: false,
            animation_id: -1,
            face: 0,
            translate_x: 0,
            translate_y: 0,
            translate_level: 0,
        }
    }
}

impl OpcodeDecode for LocationObjectDefinition {
    fn apply(&mut self, opcode: u8, cursor: &mut ByteCursor) -> Result<()> {
        match opcode {
            1 => {
                let count = cursor.read_u8()? as usize;
                for _ in 0..count {
                    cursor.read_u16()?; // model id
                    cursor.read_u8()?; // model type
                }
            }
            2 => self.name = Some(cursor.read_string()?),
            3 if self.era == Era::Early => self.description = Some(cursor.read_string()?),
            5 => {
                let count = cursor.read_u8()? as usize;
                for _ in 0..count {
                    cursor.read_u16()?; // model id
                }
            }
            14 => self.size_x = i32::from(cursor.read_u8()?),
            15 => self.size_y = i32::from(cursor.read_u8()?),
            17 => self.solid = false,
            18 => {
                // The early table clears walkability here; the modern one
                // clears projectile blocking.
                if self.era == Era::Early {
                    self.non_walkable = false;
                } else {
                    self.blocks_projectile = false;
                }
            }
            19 => self.has_options = cursor.read_u8()? == 1,
            21 => self.adjust_to_terrain = true,
            22 => self.non_flat_shading = true,
            23 => {}
            24 => self.animation_id = optional_u16(cursor.read_u16()?),
            28 => {
                cursor.read_u8()?;
            }
            29 | 39 => {
                cursor.read_i8()?; // ambient / contrast
            }
            30..=38 => {
                if self.era == Era::Modern && opcode > 34 {
                    return Err(unknown_opcode(opcode, cursor));
                }
                let slot = ranged_slot(opcode, 30, self.options.len(), cursor)?;
                let option = cursor.read_string()?;
                self.options[slot] = if self.era == Era::Modern {
                    optional_option(option)
                } else {
                    Some(option)
                };
            }
            40 => {
                let count = cursor.read_u8()? as usize;
                for _ in 0..count {
                    cursor.read_u16()?; // recolor source
                    cursor.read_u16()?; // recolor target
                }
            }
            60 | 65..=68 => {
                cursor.read_u16()?; // minimap icon / model scale / map scene
            }
            62 | 64 | 73 | 74 => {}
            69 => self.face = cursor.read_u8()?,
            70 => self.translate_x = i32::from(cursor.read_i16()?),
            71 => self.translate_y = i32::from(cursor.read_i16()?),
            72 => self.translate_level = i32::from(cursor.read_i16()?),
            75 => {
                cursor.read_u8()?;
            }
            77 => {
                cursor.read_u16()?; // varbit id
                cursor.read_u16()?; // setting id
                let count = cursor.read_u8()? as usize;
                // The modern grid carries one extra trailing morph id.
                let reads = if self.era == Era::Modern { count + 1 } else { count };
                for _ in 0..reads {
                    cursor.read_u16()?;
                }
            }
            78 if self.era == Era::Modern => {
                cursor.read_u16()?;
                cursor.read_u8()?;
            }
            79 if self.era == Era::Modern => {
                cursor.read_u16()?;
                cursor.read_u16()?;
                cursor.read_u8()?;
                let count = cursor.read_u8()? as usize;
                for _ in 0..count {
                    cursor.read_u16()?;
                }
            }
            _ => return Err(unknown_opcode(opcode, cursor)),
        }
        Ok(())
    }
}

/// Decode every location-object definition from the modern config archive.
pub fn decode_locations(
    cache: &ModernCache,
) -> Result<BTreeMap<u32, LocationObjectDefinition>> {
    let archive = cache
        .archive(IndexType::Definitions.id(), LOCATION_ARCHIVE_ID, None)?
        .ok_or(Error::MissingArchive {
            index_id: IndexType::Definitions.id(),
            archive_id: LOCATION_ARCHIVE_ID,
        })?;

    let mut locations = BTreeMap::new();
    for (id, mut member) in archive.into_members().into_iter().enumerate() {
        let mut definition: LocationObjectDefinition = decode_record(&mut member)?;
        definition.id = id as u32;
        locations.insert(id as u32, definition);
    }

    info!("decoded {} location object definitions", locations.len());
    Ok(locations)
}

/// Decode every location-object definition from an early-generation
/// config archive (`loc.idx` offsets into `loc.dat`).
pub fn decode_legacy_locations(
    cache: &LegacyCache,
) -> Result<BTreeMap<u32, LocationObjectDefinition>> {
    let archive = cache.archive(jagfs_store::legacy::DEFINITION_ARCHIVE_ID)?;
    decode_legacy_locations_from(&archive)
}

/// Decode early location objects from an already-fetched config archive.
pub fn decode_legacy_locations_from(
    archive: &NamedArchive,
) -> Result<BTreeMap<u32, LocationObjectDefinition>> {
    let indices = LegacyCache::definition_indices(archive, "loc.idx")?;
    let Some(mut data) = archive.member_named("loc.dat") else {
        return Ok(BTreeMap::new());
    };

    let mut locations = BTreeMap::new();
    for index in indices {
        data.set_read_pos(index.offset)?;
        let mut definition = LocationObjectDefinition {
            era: Era::Early,
            id: index.id,
            ..LocationObjectDefinition::default()
        };
        decode_record_into(&mut definition, &mut data)?;
        locations.insert(index.id, definition);
    }

    info!("decoded {} early location object definitions", locations.len());
    Ok(locations)
}
