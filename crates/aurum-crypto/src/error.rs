//! Crypto error types.

use thiserror::Error;

/// Errors from the cryptographic primitives.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Canonical serialization of a signed value failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Hex decoding failed.
    #[error("hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// A byte string had the wrong length for its type.
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
