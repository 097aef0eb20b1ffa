//! Item definition decoding.

use std::collections::BTreeMap;

use tracing::info;

use jagfs_buffer::ByteCursor;
use jagfs_store::{IndexType, ModernCache};

use crate::opcode::{decode_record, optional_option, ranged_slot, unknown_opcode, OpcodeDecode};
use crate::{Era, Error, Result};

/// Archive id of the item configs within the definitions index.
pub const ITEM_ARCHIVE_ID: u32 = 10;

/// An item definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDefinition {
    pub id: u32,
    pub era: Era,
    pub name: Option<String>,
    pub stackable: bool,
    pub value: i32,
    pub members: bool,
    /// Right-click options on the ground; slot 2 defaults to "Take".
    pub ground_options: [Option<String>; 5],
    /// Right-click options in the inventory; slot 4 defaults to "Drop".
    pub inventory_options: [Option<String>; 5],
    pub team_index: u8,
    pub inventory_model_id: i32,
    pub model_zoom: i32,
    pub model_rotation1: i32,
    pub model_rotation2: i32,
    pub model_offset1: i32,
    pub model_offset2: i32,
    pub original_model_colors: Vec<u16>,
    pub modified_model_colors: Vec<u16>,
    /// Noted (bank-note) counterpart id; -1 when none.
    pub noted_id: i32,
    /// Note template id; -1 when none.
    pub note_template_id: i32,
    pub stack_variant_ids: Option<Vec<u16>>,
    pub stack_variant_amounts: Option<Vec<u16>>,
}

impl Default for ItemDefinition {
    fn default() -> Self {
        Self {
            id: 0,
            era: Era::Modern,
            name: None,
            stackable: false,
            value: 0,
            members: false,
            ground_options: [None, None, Some("Take".to_string()), None, None],
            inventory_options: [None, None, None, None, Some("Drop".to_string())],
            team_index: 0,
            inventory_model_id: 0,
            model_zoom: 0,
            model_rotation1: 0,
            model_rotation2: 0,
            model_offset1: 0,
            model_offset2: 0,
            original_model_colors: Vec::new(),
            modified_model_colors: Vec::new(),
            noted_id: -1,
            note_template_id: -1,
            stack_variant_ids: None,
            stack_variant_amounts: None,
        }
    }
}

impl OpcodeDecode for ItemDefinition {
    fn apply(&mut self, opcode: u8, cursor: &mut ByteCursor) -> Result<()> {
        match opcode {
            1 => self.inventory_model_id = i32::from(cursor.read_u16()?),
            2 => self.name = Some(cursor.read_string()?),
            4 => self.model_zoom = i32::from(cursor.read_u16()?),
            5 => self.model_rotation1 = i32::from(cursor.read_u16()?),
            6 => self.model_rotation2 = i32::from(cursor.read_u16()?),
            7 => self.model_offset1 = i32::from(cursor.read_i16()?),
            8 => self.model_offset2 = i32::from(cursor.read_i16()?),
            11 => self.stackable = true,
            12 => self.value = cursor.read_i32()?,
            16 => self.members = true,
            23 => {
                cursor.read_u16()?;
                cursor.read_u8()?;
            }
            24 | 26 => {
                cursor.read_u16()?;
            }
            25 => {
                cursor.read_u16()?;
                cursor.read_u8()?;
            }
            30..=34 => {
                let slot = ranged_slot(opcode, 30, self.ground_options.len(), cursor)?;
                self.ground_options[slot] = optional_option(cursor.read_string()?);
            }
            35..=39 => {
                let slot = ranged_slot(opcode, 35, self.inventory_options.len(), cursor)?;
                self.inventory_options[slot] = Some(cursor.read_string()?);
            }
            40 => {
                let count = cursor.read_u8()? as usize;
                self.modified_model_colors = Vec::with_capacity(count);
                self.original_model_colors = Vec::with_capacity(count);
                for _ in 0..count {
                    self.modified_model_colors.push(cursor.read_u16()?);
                    self.original_model_colors.push(cursor.read_u16()?);
                }
            }
            78 | 79 | 90 | 91 | 92 | 93 | 95 => {
                cursor.read_u16()?;
            }
            97 => self.noted_id = i32::from(cursor.read_u16()?),
            98 => self.note_template_id = i32::from(cursor.read_u16()?),
            100..=109 => {
                if self.stack_variant_ids.is_none() {
                    self.stack_variant_ids = Some(vec![0; 10]);
                    self.stack_variant_amounts = Some(vec![0; 10]);
                }
                let slot = ranged_slot(opcode, 100, 10, cursor)?;
                let id = cursor.read_u16()?;
                let amount = cursor.read_u16()?;
                if let (Some(ids), Some(amounts)) = (
                    self.stack_variant_ids.as_mut(),
                    self.stack_variant_amounts.as_mut(),
                ) {
                    ids[slot] = id;
                    amounts[slot] = amount;
                }
            }
            110..=112 => {
                cursor.read_u16()?;
            }
            113 | 114 => {
                cursor.read_i8()?;
            }
            115 => self.team_index = cursor.read_u8()?,
            _ => return Err(unknown_opcode(opcode, cursor)),
        }
        Ok(())
    }
}

/// Decode every item definition from the cache's config archive.
pub fn decode_items(cache: &ModernCache) -> Result<BTreeMap<u32, ItemDefinition>> {
    let archive = cache
        .archive(IndexType::Definitions.id(), ITEM_ARCHIVE_ID, None)?
        .ok_or(Error::MissingArchive {
            index_id: IndexType::Definitions.id(),
            archive_id: ITEM_ARCHIVE_ID,
        })?;

    let mut items = BTreeMap::new();
    for (id, mut member) in archive.into_members().into_iter().enumerate() {
        let mut definition: ItemDefinition = decode_record(&mut member)?;
        definition.id = id as u32;
        items.insert(id as u32, definition);
    }

    info!("decoded {} item definitions", items.len());
    Ok(items)
}
