//! NPC definition decoding.
//!
//! The two generations share this opcode table; only string termination
//! differs, and that is carried by the cursor.

use std::collections::BTreeMap;

use tracing::info;

use jagfs_buffer::ByteCursor;
use jagfs_store::{IndexType, LegacyCache, ModernCache, NamedArchive};

use crate::opcode::{
    decode_record, decode_record_into, optional_option, optional_u16, ranged_slot,
    unknown_opcode, OpcodeDecode,
};
use crate::{Era, Error, Result};

/// Archive id of the NPC configs within the definitions index.
pub const NPC_ARCHIVE_ID: u32 = 9;

/// The animation set attached to an NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpcAnimations {
    pub stand: i32,
    pub walk: i32,
    pub turn_around: i32,
    pub turn_right: i32,
    pub turn_left: i32,
}

impl Default for NpcAnimations {
    fn default() -> Self {
        Self {
            stand: -1,
            walk: -1,
            turn_around: -1,
            turn_right: -1,
            turn_left: -1,
        }
    }
}

/// An NPC definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpcDefinition {
    pub id: u32,
    pub era: Era,
    pub name: Option<String>,
    pub description: Option<String>,
    pub models: Vec<u16>,
    pub boundary: i32,
    pub size_x: i32,
    pub size_y: i32,
    pub animations: NpcAnimations,
    pub turn_degrees: i32,
    /// Right-click options; the table addresses ten slots.
    pub options: [Option<String>; 10],
    pub head_models: Vec<u16>,
    pub minimap_visible: bool,
    pub render_priority: bool,
    pub combat_level: i32,
    pub head_icon: i32,
    pub clickable: bool,
}

impl Default for NpcDefinition {
    fn default() -> Self {
        Self {
            id: 0,
            era: Era::Modern,
            name: None,
            description: None,
            models: Vec::new(),
            boundary: 1,
            size_x: 128,
            size_y: 128,
            animations: NpcAnimations::default(),
            turn_degrees: 32,
            options: Default::default(),
            head_models: Vec::new(),
            minimap_visible: true,
            render_priority: false,
            combat_level: -1,
            head_icon: -1,
            clickable: true,
        }
    }
}

impl OpcodeDecode for NpcDefinition {
    fn apply(&mut self, opcode: u8, cursor: &mut ByteCursor) -> Result<()> {
        match opcode {
            1 => {
                let count = cursor.read_u8()? as usize;
                self.models = Vec::with_capacity(count);
                for _ in 0..count {
                    self.models.push(cursor.read_u16()?);
                }
            }
            2 => self.name = Some(cursor.read_string()?),
            3 => self.description = Some(cursor.read_string()?),
            12 => self.boundary = i32::from(cursor.read_i8()?),
            13 => self.animations.stand = i32::from(cursor.read_u16()?),
            14 => self.animations.walk = i32::from(cursor.read_u16()?),
            17 => {
                self.animations.walk = i32::from(cursor.read_u16()?);
                self.animations.turn_around = i32::from(cursor.read_u16()?);
                self.animations.turn_right = i32::from(cursor.read_u16()?);
                self.animations.turn_left = i32::from(cursor.read_u16()?);
            }
            30..=39 => {
                let slot = ranged_slot(opcode, 30, self.options.len(), cursor)?;
                self.options[slot] = optional_option(cursor.read_string()?);
            }
            40 => {
                let count = cursor.read_u8()? as usize;
                for _ in 0..count {
                    cursor.read_u16()?; // recolor source
                    cursor.read_u16()?; // recolor target
                }
            }
            60 => {
                let count = cursor.read_u8()? as usize;
                self.head_models = Vec::with_capacity(count);
                for _ in 0..count {
                    self.head_models.push(cursor.read_u16()?);
                }
            }
            90..=92 => {
                cursor.read_u16()?;
            }
            93 => self.minimap_visible = false,
            95 => self.combat_level = i32::from(cursor.read_u16()?),
            97 => self.size_x = i32::from(cursor.read_u16()?),
            98 => self.size_y = i32::from(cursor.read_u16()?),
            99 => self.render_priority = true,
            100 | 101 => {
                cursor.read_i8()?; // brightness / contrast
            }
            102 => self.head_icon = i32::from(cursor.read_u16()?),
            103 => self.turn_degrees = i32::from(cursor.read_u16()?),
            106 => {
                let _varbit_id = optional_u16(cursor.read_u16()?);
                let _setting_id = optional_u16(cursor.read_u16()?);
                let count = cursor.read_u8()? as usize;
                for _ in 0..count {
                    cursor.read_u16()?; // morph target id
                }
            }
            _ => return Err(unknown_opcode(opcode, cursor)),
        }
        Ok(())
    }
}

/// Decode every NPC definition from the modern config archive.
pub fn decode_npcs(cache: &ModernCache) -> Result<BTreeMap<u32, NpcDefinition>> {
    let archive = cache
        .archive(IndexType::Definitions.id(), NPC_ARCHIVE_ID, None)?
        .ok_or(Error::MissingArchive {
            index_id: IndexType::Definitions.id(),
            archive_id: NPC_ARCHIVE_ID,
        })?;

    let mut npcs = BTreeMap::new();
    for (id, mut member) in archive.into_members().into_iter().enumerate() {
        let mut definition: NpcDefinition = decode_record(&mut member)?;
        definition.id = id as u32;
        npcs.insert(id as u32, definition);
    }

    info!("decoded {} npc definitions", npcs.len());
    Ok(npcs)
}

/// Decode every NPC definition from an early-generation config archive
/// (`npc.idx` offsets into `npc.dat`).
pub fn decode_legacy_npcs(cache: &LegacyCache) -> Result<BTreeMap<u32, NpcDefinition>> {
    let archive = cache.archive(jagfs_store::legacy::DEFINITION_ARCHIVE_ID)?;
    decode_legacy_npcs_from(&archive)
}

/// Decode early NPC definitions from an already-fetched config archive.
pub fn decode_legacy_npcs_from(archive: &NamedArchive) -> Result<BTreeMap<u32, NpcDefinition>> {
    let indices = LegacyCache::definition_indices(archive, "npc.idx")?;
    let Some(mut data) = archive.member_named("npc.dat") else {
        return Ok(BTreeMap::new());
    };

    let mut npcs = BTreeMap::new();
    for index in indices {
        data.set_read_pos(index.offset)?;
        let mut definition = NpcDefinition {
            era: Era::Early,
            id: index.id,
            ..NpcDefinition::default()
        };
        decode_record_into(&mut definition, &mut data)?;
        npcs.insert(index.id, definition);
    }

    info!("decoded {} early npc definitions", npcs.len());
    Ok(npcs)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_match_the_unset_record() {
        let mut cursor = ByteCursor::from_vec(vec![0]);
        let npc: NpcDefinition = decode_record(&mut cursor).unwrap();
        assert_eq!(npc.boundary, 1);
        assert_eq!(npc.size_x, 128);
        assert_eq!(npc.turn_degrees, 32);
        assert_eq!(npc.animations.stand, -1);
        assert!(npc.minimap_visible);
        assert!(npc.clickable);
    }

    #[test]
    fn animation_set_and_options_decode() {
        let mut data = Vec::new();
        data.push(2);
        data.extend_from_slice(b"Hans\n");
        data.push(13);
        data.extend_from_slice(&808u16.to_be_bytes());
        data.push(17);
        for anim in [819u16, 820, 821, 822] {
            data.extend_from_slice(&anim.to_be_bytes());
        }
        data.push(30);
        data.extend_from_slice(b"Talk-to\n");
        data.push(31);
        data.extend_from_slice(b"hidden\n");
        data.push(93); // minimap flag, no payload
        data.push(95);
        data.extend_from_slice(&3u16.to_be_bytes());
        data.push(0);

        let mut cursor = ByteCursor::from_vec(data);
        let npc: NpcDefinition = decode_record(&mut cursor).unwrap();
        assert_eq!(npc.name.as_deref(), Some("Hans"));
        assert_eq!(npc.animations.stand, 808);
        assert_eq!(npc.animations.walk, 819);
        assert_eq!(npc.animations.turn_left, 822);
        assert_eq!(npc.options[0].as_deref(), Some("Talk-to"));
        assert_eq!(npc.options[1], None); // "hidden" sentinel
        assert!(!npc.minimap_visible);
        assert_eq!(npc.combat_level, 3);
    }

    #[test]
    fn model_lists_are_counted() {
        let mut data = Vec::new();
        data.push(1);
        data.push(2);
        data.extend_from_slice(&100u16.to_be_bytes());
        data.extend_from_slice(&101u16.to_be_bytes());
        data.push(60);
        data.push(1);
        data.extend_from_slice(&200u16.to_be_bytes());
        data.push(0);

        let mut cursor = ByteCursor::from_vec(data);
        let npc: NpcDefinition = decode_record(&mut cursor).unwrap();
        assert_eq!(npc.models, vec![100, 101]);
        assert_eq!(npc.head_models, vec![200]);
    }

    #[test]
    fn morph_table_is_consumed_without_fields() {
        let mut data = Vec::new();
        data.push(106);
        data.extend_from_slice(&0xFFFFu16.to_be_bytes());
        data.extend_from_slice(&14u16.to_be_bytes());
        data.push(2);
        data.extend_from_slice(&7u16.to_be_bytes());
        data.extend_from_slice(&8u16.to_be_bytes());
        data.push(99);
        data.push(0);

        let mut cursor = ByteCursor::from_vec(data);
        let npc: NpcDefinition = decode_record(&mut cursor).unwrap();
        assert!(npc.render_priority);
    }
}
