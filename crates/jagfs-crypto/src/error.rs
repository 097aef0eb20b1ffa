//! Error types for crypto operations.

use thiserror::Error;

/// Errors that can occur during cipher operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid key size.
    #[error("invalid XTEA key size: expected {expected} words, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },
}
