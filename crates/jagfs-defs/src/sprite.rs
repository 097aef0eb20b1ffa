//! Sprite sheet decoding.
//!
//! A sprite file holds one or more frames over a shared palette. All of
//! the layout metadata trails the pixel data: a trailing u16 frame
//! count, a per-frame offset/size table, and the palette just ahead of
//! that table.

use std::collections::BTreeMap;

use tracing::info;

use jagfs_buffer::ByteCursor;
use jagfs_store::{IndexType, ModernCache};

use crate::Result;

/// One decoded sprite frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    pub id: u32,
    pub frame: u32,
    pub crc: i32,
    pub version: i32,
    /// Canvas size shared by all frames of the sheet.
    pub max_width: u16,
    pub max_height: u16,
    /// Frame placement within the canvas.
    pub offset_x: u16,
    pub offset_y: u16,
    pub width: u16,
    pub height: u16,
    /// Shared palette; entry 0 is transparent.
    pub palette: Vec<i32>,
    /// Per-pixel palette indices, row-major.
    pub pixel_indices: Vec<u8>,
    /// Composited ARGB pixels, row-major.
    pub pixels: Vec<i32>,
}

impl Sprite {
    fn placeholder(id: u32, frame: u32, crc: i32, version: i32) -> Self {
        Self {
            id,
            frame,
            crc,
            version,
            max_width: 0,
            max_height: 0,
            offset_x: 0,
            offset_y: 0,
            width: 0,
            height: 0,
            palette: Vec::new(),
            pixel_indices: Vec::new(),
            pixels: Vec::new(),
        }
    }
}

/// Decode all frames of one sprite sheet.
pub fn decode_sheet(id: u32, crc: i32, version: i32, data: &[u8]) -> Result<Vec<Sprite>> {
    let mut cur = ByteCursor::from_vec(data.to_vec());
    let len = cur.capacity();

    let truncated = |needed: usize| {
        crate::Error::Buffer(jagfs_buffer::BufferError::OutOfBounds {
            pos: 0,
            needed,
            limit: len,
        })
    };

    cur.set_read_pos(len.checked_sub(2).ok_or_else(|| truncated(2))?)?;
    let frame_count = cur.read_u16()? as usize;

    // The sheet trailer: canvas size, palette length, then four
    // per-frame tables.
    let trailer = len
        .checked_sub(7 + frame_count * 8)
        .ok_or_else(|| truncated(7 + frame_count * 8))?;
    cur.set_read_pos(trailer)?;
    let max_width = cur.read_u16()?;
    let max_height = cur.read_u16()?;
    let palette_len = cur.read_u8()? as usize + 1;

    let mut sprites: Vec<Sprite> = (0..frame_count)
        .map(|frame| Sprite {
            max_width,
            max_height,
            ..Sprite::placeholder(id, frame as u32, crc, version)
        })
        .collect();

    for sprite in &mut sprites {
        sprite.offset_x = cur.read_u16()?;
    }
    for sprite in &mut sprites {
        sprite.offset_y = cur.read_u16()?;
    }
    for sprite in &mut sprites {
        sprite.width = cur.read_u16()?;
    }
    for sprite in &mut sprites {
        sprite.height = cur.read_u16()?;
    }

    // Palette sits just ahead of the trailer; entry 0 stays transparent
    // and stored black is remapped to near-black.
    let palette_start = trailer
        .checked_sub((palette_len - 1) * 3)
        .ok_or_else(|| truncated((palette_len - 1) * 3))?;
    cur.set_read_pos(palette_start)?;
    let mut palette = vec![0i32; palette_len];
    for entry in palette.iter_mut().skip(1) {
        *entry = cur.read_u24()? as i32;
        if *entry == 0 {
            *entry = 1;
        }
    }

    cur.set_read_pos(0)?;
    for sprite in &mut sprites {
        let width = sprite.width as usize;
        let height = sprite.height as usize;
        let area = width * height;
        let mut indices = vec![0u8; area];
        let mut alphas = vec![0u8; area];

        let flags = cur.read_u8()?;
        if flags & 0b01 == 0 {
            for index in indices.iter_mut() {
                *index = cur.read_u8()?;
            }
        } else {
            // Column-major storage.
            for x in 0..width {
                for y in 0..height {
                    indices[width * y + x] = cur.read_u8()?;
                }
            }
        }

        if flags & 0b10 == 0 {
            for (alpha, &index) in alphas.iter_mut().zip(&indices) {
                if index != 0 {
                    *alpha = 0xFF;
                }
            }
        } else if flags & 0b01 == 0 {
            for alpha in alphas.iter_mut() {
                *alpha = cur.read_u8()?;
            }
        } else {
            for x in 0..width {
                for y in 0..height {
                    alphas[width * y + x] = cur.read_u8()?;
                }
            }
        }

        sprite.palette = palette.clone();
        sprite.pixels = indices
            .iter()
            .zip(&alphas)
            .map(|(&index, &alpha)| palette[index as usize] | (i32::from(alpha) << 24))
            .collect();
        sprite.pixel_indices = indices;
    }

    Ok(sprites)
}

/// Decode every sprite sheet in the sprite index, keyed by `(id, frame)`.
///
/// Entries whose container is empty or undecodable become zero-size
/// placeholder frames, matching the table's entry set exactly.
pub fn decode_sprites(cache: &ModernCache) -> Result<BTreeMap<(u32, u32), Sprite>> {
    let Some(table) = cache.reference_table(IndexType::Sprites.id()) else {
        return Ok(BTreeMap::new());
    };

    let mut sprites = BTreeMap::new();
    for (&id, entry) in &table.entries {
        let container = cache.file(IndexType::Sprites.id(), id, None)?;
        match container {
            Some(container) if !container.data.is_empty() => {
                for sprite in decode_sheet(id, entry.crc, entry.version, &container.data)? {
                    sprites.insert((id, sprite.frame), sprite);
                }
            }
            _ => {
                sprites.insert((id, 0), Sprite::placeholder(id, 0, entry.crc, entry.version));
            }
        }
    }

    info!("decoded {} sprites", sprites.len());
    Ok(sprites)
}
