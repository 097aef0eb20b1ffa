//! Container parsing and decompression.

use std::io::Read;

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tracing::{debug, trace};

use jagfs_buffer::ByteCursor;
use jagfs_crypto::{decrypt_xtea, XteaKey};

use crate::error::Error;
use crate::Result;

/// The stored BZIP2 streams omit their magic; it is re-synthesized before
/// decompression. The cache always writes level-1 streams.
const BZIP2_MAGIC: &[u8; 4] = b"BZh1";

/// Compression type byte at the head of every container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// Literal payload.
    None,
    /// BZIP2 stream with its 4-byte magic stripped.
    Bzip2,
    /// Complete GZIP stream.
    Gzip,
}

impl CompressionType {
    /// Map a container's type byte, `None` for unknown values.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Bzip2),
            2 => Some(Self::Gzip),
            _ => None,
        }
    }
}

/// A decompressed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// How the payload was stored.
    pub compression: CompressionType,
    /// The decompressed payload.
    pub data: Vec<u8>,
    /// Trailing version field; -1 when the container carries none.
    pub version: i16,
}

impl Container {
    /// Wrap the payload in a cursor for decoding.
    pub fn into_cursor(self) -> ByteCursor {
        ByteCursor::from_vec(self.data)
    }
}

/// Decompress one container, applying the XTEA pre-pass when keys are
/// supplied.
///
/// The payload region (and only the payload region) is decrypted before
/// decompression; whether a partial trailing block passes through
/// unmodified is the cipher's concern.
pub fn decompress(data: &[u8], keys: Option<&XteaKey>) -> Result<Container> {
    let mut cur = ByteCursor::from_vec(data.to_vec());

    let type_byte = cur.read_u8()?;
    let compression =
        CompressionType::from_u8(type_byte).ok_or(Error::UnsupportedCompression(type_byte))?;

    let compressed_len = cur.read_i32()?;
    if compressed_len < 0 {
        return Err(Error::InvalidLength(compressed_len));
    }

    let uncompressed_len = match compression {
        CompressionType::None => None,
        _ => {
            let len = cur.read_i32()?;
            if len < 0 {
                return Err(Error::InvalidLength(len));
            }
            Some(len as usize)
        }
    };

    let mut payload = cur.read_bytes(compressed_len as usize)?;
    if let Some(keys) = keys {
        decrypt_xtea(&mut payload, keys)?;
    }

    let data = match compression {
        CompressionType::None => payload,
        CompressionType::Bzip2 => decompress_bzip2(&payload)?,
        CompressionType::Gzip => {
            let mut out = Vec::new();
            GzDecoder::new(payload.as_slice()).read_to_end(&mut out)?;
            out
        }
    };

    if let Some(expected) = uncompressed_len {
        if data.len() != expected {
            return Err(Error::CorruptArchive {
                expected,
                actual: data.len(),
            });
        }
        trace!(
            "{compression:?}: {compressed_len} bytes -> {} bytes",
            data.len()
        );
    }

    // Anything left after the declared payload is the version trailer.
    let version = if cur.remaining() >= 2 { cur.read_i16()? } else { -1 };

    debug!(
        "decompressed container: {compression:?}, {} bytes, version {version}",
        data.len()
    );

    Ok(Container {
        compression,
        data,
        version,
    })
}

/// Decompress a headerless BZIP2 stream as stored in the cache.
///
/// Also used directly by the legacy named-file archive, whose members are
/// individually BZIP2-compressed with the same stripped magic.
pub fn decompress_bzip2(payload: &[u8]) -> Result<Vec<u8>> {
    let mut stream = Vec::with_capacity(BZIP2_MAGIC.len() + payload.len());
    stream.extend_from_slice(BZIP2_MAGIC);
    stream.extend_from_slice(payload);

    let mut out = Vec::new();
    BzDecoder::new(stream.as_slice()).read_to_end(&mut out)?;
    Ok(out)
}
