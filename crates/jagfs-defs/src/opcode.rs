//! The shared opcode-stream decoding loop.

use jagfs_buffer::ByteCursor;

use crate::error::Error;
use crate::Result;

/// A record decodable from an opcode stream.
///
/// `apply` consumes the payload for one opcode from the cursor and
/// mutates the record. Every field has a default that must hold when its
/// opcode never appears in the stream, so implementors are `Default`.
pub trait OpcodeDecode: Default {
    /// Apply one opcode. Return [`Error::UnknownOpcode`] for tags the
    /// table does not cover (use [`unknown_opcode`] to fill in the
    /// offset).
    fn apply(&mut self, opcode: u8, cursor: &mut ByteCursor) -> Result<()>;
}

/// Drive the decode loop: read a tag byte, stop at 0, otherwise dispatch.
pub fn decode_record<T: OpcodeDecode>(cursor: &mut ByteCursor) -> Result<T> {
    let mut record = T::default();
    decode_record_into(&mut record, cursor)?;
    Ok(record)
}

/// Drive the decode loop over an already-seeded record. Era-dependent
/// tables seed the discriminant before decoding.
pub fn decode_record_into<T: OpcodeDecode>(record: &mut T, cursor: &mut ByteCursor) -> Result<()> {
    loop {
        let opcode = cursor.read_u8()?;
        if opcode == 0 {
            return Ok(());
        }
        record.apply(opcode, cursor)?;
    }
}

/// The error for an unhandled tag, anchored at the byte just consumed.
pub fn unknown_opcode(opcode: u8, cursor: &ByteCursor) -> Error {
    Error::UnknownOpcode {
        opcode,
        offset: cursor.read_pos().saturating_sub(1),
    }
}

/// Normalize the "hidden" sentinel (either generation's casing) to an
/// absent option string.
pub fn optional_option(text: String) -> Option<String> {
    if matches!(text.as_str(), "hidden" | "Hidden") {
        None
    } else {
        Some(text)
    }
}

/// Normalize the `0xFFFF` sentinel of a 16-bit id field to -1.
pub fn optional_u16(value: u16) -> i32 {
    if value == 0xFFFF { -1 } else { i32::from(value) }
}

/// Bounds-validated slot for a ranged opcode addressing a fixed array by
/// `opcode - base`.
pub fn ranged_slot(opcode: u8, base: u8, len: usize, cursor: &ByteCursor) -> Result<usize> {
    let slot = usize::from(opcode - base);
    if slot >= len {
        return Err(unknown_opcode(opcode, cursor));
    }
    Ok(slot)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Default, PartialEq, Eq)]
    struct Probe {
        flag: bool,
        value: i32,
        options: [Option<String>; 5],
    }

    impl OpcodeDecode for Probe {
        fn apply(&mut self, opcode: u8, cursor: &mut ByteCursor) -> Result<()> {
            match opcode {
                // Payload-less boolean opcode.
                1 => self.flag = true,
                2 => self.value = optional_u16(cursor.read_u16()?),
                30..=34 => {
                    let slot = ranged_slot(opcode, 30, self.options.len(), cursor)?;
                    self.options[slot] = optional_option(cursor.read_string()?);
                }
                _ => return Err(unknown_opcode(opcode, cursor)),
            }
            Ok(())
        }
    }

    #[test]
    fn zero_terminates_with_all_defaults() {
        let mut cursor = ByteCursor::from_vec(vec![0, 0xAA, 0xBB]);
        let record: Probe = decode_record(&mut cursor).unwrap();
        assert_eq!(record, Probe::default());
        // Nothing consumed beyond the terminator.
        assert_eq!(cursor.read_pos(), 1);
    }

    #[test]
    fn opcodes_mutate_and_the_loop_stops_at_zero() {
        let mut data = vec![1, 2, 0x12, 0x34];
        data.extend_from_slice(&[31]);
        data.extend_from_slice(b"Take\n");
        data.push(0);
        let mut cursor = ByteCursor::from_vec(data);
        let record: Probe = decode_record(&mut cursor).unwrap();
        assert!(record.flag);
        assert_eq!(record.value, 0x1234);
        assert_eq!(record.options[1].as_deref(), Some("Take"));
    }

    #[test]
    fn sentinels_normalize_to_absent() {
        let mut data = vec![2, 0xFF, 0xFF, 30];
        data.extend_from_slice(b"hidden\n");
        data.push(0);
        let mut cursor = ByteCursor::from_vec(data);
        let record: Probe = decode_record(&mut cursor).unwrap();
        assert_eq!(record.value, -1);
        assert_eq!(record.options[0], None);

        assert_eq!(optional_option("Hidden".to_string()), None);
        assert_eq!(optional_option("Shown".to_string()).as_deref(), Some("Shown"));
    }

    #[test]
    fn unknown_opcodes_are_fatal_with_an_offset() {
        let mut cursor = ByteCursor::from_vec(vec![1, 99, 0]);
        let err = decode_record::<Probe>(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::UnknownOpcode { opcode: 99, offset: 1 }));
    }

    #[test]
    fn truncated_streams_surface_the_cursor_error() {
        let mut cursor = ByteCursor::from_vec(vec![2, 0x01]);
        assert!(matches!(
            decode_record::<Probe>(&mut cursor),
            Err(Error::Buffer(_))
        ));
    }
}
