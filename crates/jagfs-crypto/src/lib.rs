//! Decryption support for keyed cache archives.
//!
//! Certain map-related archives are stored XTEA-encrypted at rest. This
//! crate provides the specific XTEA variant the cache uses: 32 rounds,
//! golden-ratio delta, a 4-word key, and block-aligned operation where any
//! trailing partial block passes through unmodified.

pub mod error;
pub mod xtea;

pub use error::CryptoError;
pub use xtea::{decrypt_xtea, encrypt_xtea, XteaKey};

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
