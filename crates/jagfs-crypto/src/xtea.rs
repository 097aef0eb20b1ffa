//! XTEA block cipher as used by the cache's keyed archives.

use byteorder::{BigEndian, ByteOrder};

use crate::error::CryptoError;
use crate::Result;

/// The 4-word XTEA key. Keys circulate as signed 32-bit words.
pub type XteaKey = [i32; 4];

const GOLDEN_RATIO: u32 = 0x9E37_79B9;
const ROUNDS: u32 = 32;
const BLOCK_SIZE: usize = 8;

fn key_words(key: &[i32]) -> Result<[u32; 4]> {
    if key.len() != 4 {
        return Err(CryptoError::InvalidKeySize {
            expected: 4,
            actual: key.len(),
        });
    }
    Ok([key[0] as u32, key[1] as u32, key[2] as u32, key[3] as u32])
}

/// Decrypt `data` in place with the decrementing-sum XTEA variant.
///
/// Operates on the length rounded down to whole 8-byte blocks; trailing
/// bytes are left untouched. An empty key slice is an identity pass
/// (unkeyed archives travel through the same code path) — an all-zero
/// 4-word key is a real key, not a no-op.
pub fn decrypt_xtea(data: &mut [u8], key: &[i32]) -> Result<()> {
    if key.is_empty() {
        return Ok(());
    }
    let k = key_words(key)?;

    for block in data.chunks_exact_mut(BLOCK_SIZE) {
        let mut v0 = BigEndian::read_u32(&block[..4]);
        let mut v1 = BigEndian::read_u32(&block[4..]);
        let mut sum = GOLDEN_RATIO.wrapping_mul(ROUNDS);

        for _ in 0..ROUNDS {
            v1 = v1.wrapping_sub(
                (((v0 << 4) ^ (v0 >> 5)).wrapping_add(v0))
                    ^ sum.wrapping_add(k[((sum >> 11) & 3) as usize]),
            );
            sum = sum.wrapping_sub(GOLDEN_RATIO);
            v0 = v0.wrapping_sub(
                (((v1 << 4) ^ (v1 >> 5)).wrapping_add(v1))
                    ^ sum.wrapping_add(k[(sum & 3) as usize]),
            );
        }

        BigEndian::write_u32(&mut block[..4], v0);
        BigEndian::write_u32(&mut block[4..], v1);
    }

    Ok(())
}

/// Encrypt `data` in place; the exact inverse of [`decrypt_xtea`].
pub fn encrypt_xtea(data: &mut [u8], key: &[i32]) -> Result<()> {
    if key.is_empty() {
        return Ok(());
    }
    let k = key_words(key)?;

    for block in data.chunks_exact_mut(BLOCK_SIZE) {
        let mut v0 = BigEndian::read_u32(&block[..4]);
        let mut v1 = BigEndian::read_u32(&block[4..]);
        let mut sum = 0u32;

        for _ in 0..ROUNDS {
            v0 = v0.wrapping_add(
                (((v1 << 4) ^ (v1 >> 5)).wrapping_add(v1))
                    ^ sum.wrapping_add(k[(sum & 3) as usize]),
            );
            sum = sum.wrapping_add(GOLDEN_RATIO);
            v1 = v1.wrapping_add(
                (((v0 << 4) ^ (v0 >> 5)).wrapping_add(v0))
                    ^ sum.wrapping_add(k[((sum >> 11) & 3) as usize]),
            );
        }

        BigEndian::write_u32(&mut block[..4], v0);
        BigEndian::write_u32(&mut block[4..], v1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: XteaKey = [0x00010203, 0x04050607, 0x08090a0b, 0x0c0d0e0f];

    #[test]
    fn known_answer_vector() {
        // Standard 32-round XTEA vector: E(KEY, "ABCDEFGH").
        let mut block = *b"ABCDEFGH";
        encrypt_xtea(&mut block, &KEY).unwrap();
        assert_eq!(block, [0x49, 0x7d, 0xf3, 0xd0, 0x72, 0x61, 0x2c, 0xb5]);

        decrypt_xtea(&mut block, &KEY).unwrap();
        assert_eq!(&block, b"ABCDEFGH");
    }

    #[test]
    fn empty_key_is_identity_but_zero_key_is_not() {
        let plain = *b"ABCDEFGH";

        let mut unkeyed = plain;
        decrypt_xtea(&mut unkeyed, &[]).unwrap();
        assert_eq!(unkeyed, plain);

        let mut zero_keyed = plain;
        decrypt_xtea(&mut zero_keyed, &[0, 0, 0, 0]).unwrap();
        assert_ne!(zero_keyed, plain);
        // Computed with the reference decipher.
        assert_eq!(
            zero_keyed,
            [0xe0, 0x25, 0x09, 0x71, 0x76, 0xe7, 0x13, 0xb4]
        );
    }

    #[test]
    fn trailing_partial_block_passes_through() {
        let mut data = Vec::from(*b"ABCDEFGH");
        data.extend_from_slice(&[0xDE, 0xAD, 0xBE]);
        encrypt_xtea(&mut data, &KEY).unwrap();
        assert_eq!(&data[8..], &[0xDE, 0xAD, 0xBE]);
        decrypt_xtea(&mut data, &KEY).unwrap();
        assert_eq!(&data[..8], b"ABCDEFGH");
        assert_eq!(&data[8..], &[0xDE, 0xAD, 0xBE]);
    }

    #[test]
    fn negative_key_words_round_trip() {
        let key: XteaKey = [-0x12345678, 0x7fffffff, i32::MIN, -1];
        let mut data = vec![0u8; 64];
        for (i, b) in data.iter_mut().enumerate() {
            *b = i as u8;
        }
        let original = data.clone();
        encrypt_xtea(&mut data, &key).unwrap();
        assert_ne!(data, original);
        decrypt_xtea(&mut data, &key).unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn wrong_key_length_is_rejected() {
        let mut data = [0u8; 8];
        assert!(matches!(
            decrypt_xtea(&mut data, &[1, 2, 3]),
            Err(CryptoError::InvalidKeySize { expected: 4, actual: 3 })
        ));
    }
}
