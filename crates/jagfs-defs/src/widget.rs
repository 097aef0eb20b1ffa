//! Widget (interface) decoding.
//!
//! Widgets are not opcode streams: a child's layout is a fixed sequence
//! of fields gated on its type and menu type. Two layouts exist — the
//! older "if1" and the newer "if3", distinguished by a leading signed
//! byte of -1.

use std::collections::BTreeMap;

use tracing::{info, warn};

use jagfs_buffer::ByteCursor;
use jagfs_store::{IndexType, ModernCache};

use crate::opcode::optional_u16;
use crate::Result;

/// A sprite slotted into an inventory widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventorySprite {
    pub id: i32,
    pub x: i32,
    pub y: i32,
}

/// One child of a widget tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WidgetChild {
    pub id: u32,
    pub is_if3: bool,
    pub widget_type: u8,
    pub menu_type: u8,
    pub content_type: u16,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub opacity: u8,
    /// Parent widget id; -1 at the root.
    pub parent_id: i32,
    /// Sibling shown on hover; -1 when none.
    pub hovered_sibling_id: i32,
    pub alternate_operators: Vec<u8>,
    pub alternate_rhs: Vec<u16>,
    pub client_scripts: Vec<Vec<i32>>,
    pub scroll_height: u16,
    pub scroll_position: u16,
    pub hidden: bool,
    pub item_swappable: bool,
    pub is_inventory: bool,
    pub item_usable: bool,
    pub item_deletes_dragged: bool,
    pub item_sprite_pads_x: i32,
    pub item_sprite_pads_y: i32,
    pub inventory_sprites: Vec<Option<InventorySprite>>,
    pub options: Vec<Option<String>>,
    pub filled: bool,
    pub x_text_alignment: u8,
    pub y_text_alignment: u8,
    pub line_height: u8,
    pub font_id: i32,
    pub text_shadowed: bool,
    pub text: Option<String>,
    pub alternate_text: Option<String>,
    pub text_color: i32,
    pub alternate_text_color: i32,
    pub hovered_text_color: i32,
    pub alternate_hovered_text_color: i32,
    pub sprite_id: i32,
    pub alternate_sprite_id: i32,
    pub model_type: i32,
    pub model_id: i32,
    pub alternate_model_type: i32,
    pub alternate_model_id: i32,
    pub animation: i32,
    pub alternate_animation: i32,
    pub model_zoom: i32,
    pub rotation_x: i32,
    pub rotation_y: i32,
    pub rotation_z: i32,
    pub offset_x_2d: i32,
    pub offset_y_2d: i32,
    pub orthogonal: bool,
    pub target_verb: Option<String>,
    pub spell_name: Option<String>,
    pub click_mask: u16,
    pub tooltip: Option<String>,
}

/// A widget with its decoded children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    pub id: u32,
    pub crc: i32,
    pub version: i32,
    pub children: Vec<WidgetChild>,
}

fn empty_string_to_none(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

/// Decode an if1-layout child.
pub fn decode_if1(id: u32, cursor: &mut ByteCursor) -> Result<WidgetChild> {
    let mut child = WidgetChild {
        id,
        is_if3: false,
        ..WidgetChild::default()
    };

    child.widget_type = cursor.read_u8()?;
    child.menu_type = cursor.read_u8()?;
    child.content_type = cursor.read_u16()?;
    child.x = i32::from(cursor.read_i16()?);
    child.y = i32::from(cursor.read_i16()?);
    child.width = i32::from(cursor.read_u16()?);
    child.height = i32::from(cursor.read_u16()?);
    child.opacity = cursor.read_u8()?;
    child.parent_id = optional_u16(cursor.read_u16()?);
    child.hovered_sibling_id = optional_u16(cursor.read_u16()?);

    let alternate_count = cursor.read_u8()? as usize;
    child.alternate_operators = Vec::with_capacity(alternate_count);
    child.alternate_rhs = Vec::with_capacity(alternate_count);
    for _ in 0..alternate_count {
        child.alternate_operators.push(cursor.read_u8()?);
        child.alternate_rhs.push(cursor.read_u16()?);
    }

    let script_count = cursor.read_u8()? as usize;
    child.client_scripts = Vec::with_capacity(script_count);
    for _ in 0..script_count {
        let words = cursor.read_u16()? as usize;
        let mut script = Vec::with_capacity(words);
        for _ in 0..words {
            script.push(optional_u16(cursor.read_u16()?));
        }
        child.client_scripts.push(script);
    }

    match child.widget_type {
        0 => {
            child.scroll_height = cursor.read_u16()?;
            child.hidden = cursor.read_u8()? == 1;
        }
        1 => {
            cursor.read_u16()?;
            cursor.read_u8()?;
        }
        2 => {
            child.item_swappable = cursor.read_u8()? == 1;
            child.is_inventory = cursor.read_u8()? == 1;
            child.item_usable = cursor.read_u8()? == 1;
            child.item_deletes_dragged = cursor.read_u8()? == 1;
            child.item_sprite_pads_x = i32::from(cursor.read_u8()?);
            child.item_sprite_pads_y = i32::from(cursor.read_u8()?);
            child.inventory_sprites = Vec::with_capacity(20);
            for _ in 0..20 {
                if cursor.read_u8()? == 1 {
                    let sprite_id = i32::from(cursor.read_i16()?);
                    let x = i32::from(cursor.read_i16()?);
                    let y = cursor.read_i32()?;
                    child.inventory_sprites.push(Some(InventorySprite {
                        id: sprite_id,
                        x,
                        y,
                    }));
                } else {
                    child.inventory_sprites.push(None);
                }
            }
            child.options = read_options(cursor, 5)?;
        }
        3 => child.filled = cursor.read_u8()? == 1,
        _ => {}
    }

    if matches!(child.widget_type, 1 | 4) {
        child.x_text_alignment = cursor.read_u8()?;
        child.y_text_alignment = cursor.read_u8()?;
        child.line_height = cursor.read_u8()?;
        child.font_id = i32::from(cursor.read_u16()?);
        child.text_shadowed = cursor.read_u8()? == 1;
    }
    if child.widget_type == 4 {
        child.text = empty_string_to_none(cursor.read_string()?);
        child.alternate_text = empty_string_to_none(cursor.read_string()?);
    }
    if matches!(child.widget_type, 1 | 3 | 4) {
        child.text_color = cursor.read_i32()?;
    }
    if matches!(child.widget_type, 3 | 4) {
        child.alternate_text_color = cursor.read_i32()?;
        child.hovered_text_color = cursor.read_i32()?;
        child.alternate_hovered_text_color = cursor.read_i32()?;
    }
    if child.widget_type == 5 {
        child.sprite_id = cursor.read_i32()?;
        child.alternate_sprite_id = cursor.read_i32()?;
    }
    if child.widget_type == 6 {
        child.model_type = 1;
        child.model_id = optional_u16(cursor.read_u16()?);
        child.alternate_model_type = 1;
        child.alternate_model_id = optional_u16(cursor.read_u16()?);
        child.animation = optional_u16(cursor.read_u16()?);
        child.alternate_animation = optional_u16(cursor.read_u16()?);
        child.model_zoom = i32::from(cursor.read_u16()?);
        child.rotation_x = i32::from(cursor.read_u16()?);
        child.rotation_y = i32::from(cursor.read_u16()?);
    }
    if child.widget_type == 7 {
        child.x_text_alignment = cursor.read_u8()?;
        child.font_id = i32::from(cursor.read_u16()?);
        child.text_shadowed = cursor.read_u8()? == 1;
        child.text_color = cursor.read_i32()?;
        child.item_sprite_pads_x = i32::from(cursor.read_i16()?);
        child.item_sprite_pads_y = i32::from(cursor.read_i16()?);
        child.is_inventory = cursor.read_u8()? == 1;
        child.options = read_options(cursor, 5)?;
    }
    if child.widget_type == 8 {
        child.text = empty_string_to_none(cursor.read_string()?);
    }

    if child.menu_type == 2 || child.widget_type == 2 {
        child.target_verb = empty_string_to_none(cursor.read_string()?);
        child.spell_name = empty_string_to_none(cursor.read_string()?);
        child.click_mask = cursor.read_u16()?;
    }
    if matches!(child.menu_type, 1 | 4 | 5 | 6) {
        let tooltip = cursor.read_string()?;
        child.tooltip = if tooltip.is_empty() {
            Some(
                match child.menu_type {
                    1 => "Ok",
                    4 | 5 => "Select",
                    _ => "Continue",
                }
                .to_string(),
            )
        } else {
            Some(tooltip)
        };
    }

    Ok(child)
}

/// Decode an if3-layout child (the layout whose first byte is -1).
pub fn decode_if3(id: u32, cursor: &mut ByteCursor) -> Result<WidgetChild> {
    let mut child = WidgetChild {
        id,
        is_if3: true,
        ..WidgetChild::default()
    };

    child.widget_type = cursor.read_u8()?;
    child.content_type = cursor.read_u16()?;
    child.x = i32::from(cursor.read_i16()?);
    child.y = i32::from(cursor.read_i16()?);
    child.width = i32::from(cursor.read_u16()?);
    child.height = if child.widget_type == 9 {
        i32::from(cursor.read_i16()?)
    } else {
        i32::from(cursor.read_u16()?)
    };
    child.parent_id = optional_u16(cursor.read_u16()?);
    child.hidden = cursor.read_u8()? == 1;
    cursor.read_u8()?; // unmapped client flag

    match child.widget_type {
        0 => {
            child.scroll_height = cursor.read_u16()?;
            child.scroll_position = cursor.read_u16()?;
        }
        5 => {
            child.sprite_id = cursor.read_i32()?;
            cursor.read_u16()?; // unmapped sprite field
            cursor.read_u8()?; // unmapped flag
            child.opacity = cursor.read_u8()?;
        }
        6 => {
            child.model_type = 1;
            child.model_id = optional_u16(cursor.read_u16()?);
            child.offset_x_2d = i32::from(cursor.read_i16()?);
            child.offset_y_2d = i32::from(cursor.read_i16()?);
            child.rotation_x = i32::from(cursor.read_u16()?);
            child.rotation_z = i32::from(cursor.read_u16()?);
            child.rotation_y = i32::from(cursor.read_u16()?);
            child.model_zoom = i32::from(cursor.read_u16()?);
            child.animation = optional_u16(cursor.read_u16()?);
            child.orthogonal = cursor.read_u8()? == 1;
        }
        4 => {
            child.font_id = i32::from(cursor.read_u16()?);
            child.text = empty_string_to_none(cursor.read_string()?);
            child.line_height = cursor.read_u8()?;
            child.x_text_alignment = cursor.read_u8()?;
            child.y_text_alignment = cursor.read_u8()?;
            child.text_shadowed = cursor.read_u8()? == 1;
            child.text_color = cursor.read_i32()?;
        }
        3 => {
            child.text_color = cursor.read_i32()?;
            child.filled = cursor.read_u8()? == 1;
            child.opacity = cursor.read_u8()?;
        }
        9 => {
            cursor.read_u8()?; // line width
            child.text_color = cursor.read_i32()?;
        }
        _ => {}
    }

    Ok(child)
}

fn read_options(cursor: &mut ByteCursor, count: usize) -> Result<Vec<Option<String>>> {
    let mut options = Vec::with_capacity(count);
    for _ in 0..count {
        options.push(empty_string_to_none(cursor.read_string()?));
    }
    Ok(options)
}

fn decode_child(id: u32, data: &[u8]) -> Result<WidgetChild> {
    if data.is_empty() {
        return Ok(WidgetChild {
            id,
            ..WidgetChild::default()
        });
    }
    let mut cursor = ByteCursor::from_vec(data.to_vec());
    if data[0] as i8 == -1 {
        cursor.skip(1)?;
        decode_if3(id, &mut cursor)
    } else {
        decode_if1(id, &mut cursor)
    }
}

/// Decode every widget from the widget index.
///
/// Single-child widgets are stored flat; multi-child widgets are
/// archives with one member per child.
pub fn decode_widgets(cache: &ModernCache) -> Result<BTreeMap<u32, Widget>> {
    let Some(table) = cache.reference_table(IndexType::Widgets.id()) else {
        return Ok(BTreeMap::new());
    };

    let mut widgets = BTreeMap::new();
    for (&id, entry) in &table.entries {
        let children = if entry.child_count() <= 1 {
            let Some(container) = cache.file(IndexType::Widgets.id(), id, None)? else {
                warn!("widget {id} could not be fetched; skipping");
                continue;
            };
            vec![decode_child(0, &container.data)?]
        } else {
            let Some(archive) = cache.archive(IndexType::Widgets.id(), id, None)? else {
                warn!("widget {id} could not be fetched; skipping");
                continue;
            };
            archive
                .into_members()
                .into_iter()
                .enumerate()
                .map(|(child_id, member)| decode_child(child_id as u32, member.as_slice()))
                .collect::<Result<Vec<_>>>()?
        };

        widgets.insert(
            id,
            Widget {
                id,
                crc: entry.crc,
                version: entry.version,
                children,
            },
        );
    }

    info!("decoded {} widgets", widgets.len());
    Ok(widgets)
}
