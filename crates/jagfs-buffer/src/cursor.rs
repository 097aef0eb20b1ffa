//! The [`ByteCursor`] type.

use byteorder::{BigEndian, ByteOrder};

use crate::error::BufferError;
use crate::Result;

/// String termination convention for [`ByteCursor::read_string`].
///
/// The two cache generations terminate strings differently; each decoder
/// states its convention explicitly when it builds a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringMode {
    /// Strings end with a line feed (0x0A). Modern-era definition
    /// decoders use this.
    #[default]
    LineFeed,
    /// Strings end with a NUL byte (0x00). Early-era decoders use this.
    NulTerminated,
}

impl StringMode {
    /// The terminator byte for this mode.
    pub const fn terminator(self) -> u8 {
        match self {
            Self::LineFeed => b'\n',
            Self::NulTerminated => 0,
        }
    }
}

/// A fixed-capacity byte region with independent read and write positions.
///
/// Created either empty with a target capacity (when reassembling sector
/// payloads) or wrapping an already-filled region (when decoding). Reads
/// never advance past the write position; for a fully-populated cursor the
/// write position sits at capacity, so reads may consume the whole region.
#[derive(Debug, Clone)]
pub struct ByteCursor {
    data: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
    string_mode: StringMode,
}

impl ByteCursor {
    /// An empty cursor with `capacity` zeroed bytes and both positions at 0.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            read_pos: 0,
            write_pos: 0,
            string_mode: StringMode::default(),
        }
    }

    /// Wrap a fully-populated region; the write position starts at capacity.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let write_pos = data.len();
        Self {
            data,
            read_pos: 0,
            write_pos,
            string_mode: StringMode::default(),
        }
    }

    /// Set the string termination convention, consuming and returning `self`.
    pub fn with_string_mode(mut self, mode: StringMode) -> Self {
        self.string_mode = mode;
        self
    }

    /// The string termination convention in effect.
    pub const fn string_mode(&self) -> StringMode {
        self.string_mode
    }

    /// Total capacity of the region.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Current read position.
    pub const fn read_pos(&self) -> usize {
        self.read_pos
    }

    /// Current write position.
    pub const fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Bytes readable before the read limit.
    pub const fn remaining(&self) -> usize {
        self.write_pos.saturating_sub(self.read_pos)
    }

    /// Move the read position to an absolute offset.
    pub fn set_read_pos(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(BufferError::InvalidPosition {
                pos,
                capacity: self.data.len(),
            });
        }
        self.read_pos = pos;
        Ok(())
    }

    /// The underlying region.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the cursor and return the region.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    fn take(&mut self, width: usize) -> Result<&[u8]> {
        let end = self.read_pos.checked_add(width).ok_or(BufferError::OutOfBounds {
            pos: self.read_pos,
            needed: width,
            limit: self.write_pos,
        })?;
        if end > self.write_pos {
            return Err(BufferError::OutOfBounds {
                pos: self.read_pos,
                needed: width,
                limit: self.write_pos,
            });
        }
        let slice = &self.data[self.read_pos..end];
        self.read_pos = end;
        Ok(slice)
    }

    /// Read an unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    /// Read an unsigned big-endian 16-bit value.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    /// Read a signed big-endian 16-bit value.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    /// Read an unsigned big-endian 24-bit value into a u32.
    pub fn read_u24(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u24(self.take(3)?))
    }

    /// Read a signed big-endian 32-bit value.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    /// Read a 1-or-2-byte "smart" integer.
    ///
    /// A leading byte below 128 is the value itself; otherwise two bytes
    /// are consumed and the big-endian value minus 32768 is returned.
    /// Delta-encoded id and coordinate streams use this encoding.
    pub fn read_smart(&mut self) -> Result<i32> {
        let peek = *self
            .data
            .get(self.read_pos)
            .filter(|_| self.read_pos < self.write_pos)
            .ok_or(BufferError::OutOfBounds {
                pos: self.read_pos,
                needed: 1,
                limit: self.write_pos,
            })?;
        if peek < 128 {
            Ok(i32::from(self.read_u8()?))
        } else {
            Ok(i32::from(self.read_u16()?) - 32768)
        }
    }

    /// Read a string terminated per the cursor's [`StringMode`].
    pub fn read_string(&mut self) -> Result<String> {
        self.read_terminated_string(self.string_mode.terminator())
    }

    /// Read a string up to (and consuming) `terminator`.
    pub fn read_terminated_string(&mut self, terminator: u8) -> Result<String> {
        let start = self.read_pos;
        let end = self.data[start..self.write_pos]
            .iter()
            .position(|&b| b == terminator)
            .map(|i| start + i)
            .ok_or(BufferError::UnterminatedString { start, terminator })?;
        let text = String::from_utf8_lossy(&self.data[start..end]).into_owned();
        self.read_pos = end + 1;
        Ok(text)
    }

    /// Read exactly `dst.len()` bytes into `dst`.
    pub fn read_exact(&mut self, dst: &mut [u8]) -> Result<()> {
        let src = self.take(dst.len())?;
        dst.copy_from_slice(src);
        Ok(())
    }

    /// Read `len` bytes into a fresh vector.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self.take(len)?.to_vec())
    }

    /// Advance the read position by `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len)?;
        Ok(())
    }

    fn reserve(&mut self, width: usize) -> Result<&mut [u8]> {
        let end = self.write_pos.checked_add(width).ok_or(BufferError::OutOfBounds {
            pos: self.write_pos,
            needed: width,
            limit: self.data.len(),
        })?;
        if end > self.data.len() {
            return Err(BufferError::OutOfBounds {
                pos: self.write_pos,
                needed: width,
                limit: self.data.len(),
            });
        }
        let slice = &mut self.data[self.write_pos..end];
        self.write_pos = end;
        Ok(slice)
    }

    /// Append an unsigned byte at the write position.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.reserve(1)?[0] = value;
        Ok(())
    }

    /// Append a signed big-endian 16-bit value at the write position.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        BigEndian::write_i16(self.reserve(2)?, value);
        Ok(())
    }

    /// Append a signed big-endian 32-bit value at the write position.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        BigEndian::write_i32(self.reserve(4)?, value);
        Ok(())
    }

    /// Append raw bytes at the write position.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Copy `src_start..src_end` of this region into `dst` at `dst_offset`,
    /// without touching either cursor's positions.
    pub fn copy_into(
        &self,
        dst: &mut ByteCursor,
        dst_offset: usize,
        src_start: usize,
        src_end: usize,
    ) -> Result<()> {
        if src_start > src_end || src_end > self.data.len() {
            return Err(BufferError::InvalidCopyRange {
                start: src_start,
                end: src_end,
                len: self.data.len(),
            });
        }
        let len = src_end - src_start;
        let dst_end = dst_offset.checked_add(len).ok_or(BufferError::InvalidCopyRange {
            start: dst_offset,
            end: dst_offset.wrapping_add(len),
            len: dst.data.len(),
        })?;
        if dst_end > dst.data.len() {
            return Err(BufferError::InvalidCopyRange {
                start: dst_offset,
                end: dst_end,
                len: dst.data.len(),
            });
        }
        dst.data[dst_offset..dst_end].copy_from_slice(&self.data[src_start..src_end]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_width_reads_are_big_endian() {
        let mut cur = ByteCursor::from_vec(vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
        assert_eq!(cur.read_u16().unwrap(), 0x0102);
        assert_eq!(cur.read_u24().unwrap(), 0x030405);
        assert_eq!(cur.read_i8().unwrap(), 0x06);
        assert_eq!(cur.read_u8().unwrap(), 0x07);
        assert!(matches!(
            cur.read_u8(),
            Err(BufferError::OutOfBounds { pos: 7, needed: 1, .. })
        ));
    }

    #[test]
    fn signed_reads_sign_extend() {
        let mut cur = ByteCursor::from_vec(vec![0xFF, 0xFF, 0xFE, 0x80, 0x00, 0x00, 0x00]);
        assert_eq!(cur.read_i8().unwrap(), -1);
        assert_eq!(cur.read_i16().unwrap(), -2);
        assert_eq!(cur.read_i32().unwrap(), i32::MIN);
    }

    #[test]
    fn smart_switches_on_high_bit() {
        let mut cur = ByteCursor::from_vec(vec![0x05, 0x7F, 0x80, 0x81, 0xFF, 0xFF]);
        assert_eq!(cur.read_smart().unwrap(), 5);
        assert_eq!(cur.read_smart().unwrap(), 127);
        // 0x8081 - 32768 = 129
        assert_eq!(cur.read_smart().unwrap(), 129);
        // 0xFFFF - 32768 = 32767
        assert_eq!(cur.read_smart().unwrap(), 32767);
    }

    #[test]
    fn strings_follow_the_configured_mode() {
        let mut lf = ByteCursor::from_vec(b"Take\nDrop\n".to_vec());
        assert_eq!(lf.read_string().unwrap(), "Take");
        assert_eq!(lf.read_string().unwrap(), "Drop");

        let mut nul = ByteCursor::from_vec(b"npc.dat\0".to_vec())
            .with_string_mode(StringMode::NulTerminated);
        assert_eq!(nul.read_string().unwrap(), "npc.dat");

        let mut missing = ByteCursor::from_vec(b"unterminated".to_vec());
        assert!(matches!(
            missing.read_string(),
            Err(BufferError::UnterminatedString { start: 0, terminator: b'\n' })
        ));
    }

    #[test]
    fn reads_stop_at_the_write_position() {
        let mut cur = ByteCursor::with_capacity(8);
        cur.write_bytes(&[0xAA, 0xBB]).unwrap();
        assert_eq!(cur.read_u16().unwrap(), 0xAABB);
        // Two bytes written, two read; the remaining capacity is not yet
        // readable.
        assert!(cur.read_u8().is_err());
        cur.write_u8(0xCC).unwrap();
        assert_eq!(cur.read_u8().unwrap(), 0xCC);
    }

    #[test]
    fn write_side_round_trips() {
        let mut cur = ByteCursor::with_capacity(6);
        cur.write_i32(-123_456).unwrap();
        cur.write_i16(-2).unwrap();
        assert_eq!(cur.read_i32().unwrap(), -123_456);
        assert_eq!(cur.read_i16().unwrap(), -2);
        assert!(cur.write_u8(0).is_err());
    }

    #[test]
    fn copy_into_is_bounds_checked_both_ends() {
        let src = ByteCursor::from_vec(vec![1, 2, 3, 4]);
        let mut dst = ByteCursor::with_capacity(4);
        src.copy_into(&mut dst, 1, 1, 3).unwrap();
        assert_eq!(dst.as_slice(), &[0, 2, 3, 0]);

        assert!(src.copy_into(&mut dst, 0, 2, 5).is_err());
        assert!(src.copy_into(&mut dst, 3, 0, 4).is_err());
    }

    #[test]
    fn set_read_pos_validates() {
        let mut cur = ByteCursor::from_vec(vec![0; 4]);
        cur.set_read_pos(4).unwrap();
        assert!(cur.set_read_pos(5).is_err());
    }
}
