//! 32-byte digests and the node-wide hash function.

use crate::{CryptoError, CryptoResult};
use blake2::{Blake2b, Digest};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Blake2b with 256-bit output.
pub type Blake2b256 = Blake2b<blake2::digest::consts::U32>;

/// Digest length in bytes.
pub const HASH_LENGTH: usize = 32;

/// Hash arbitrary bytes with Blake2b-256.
pub fn hash(bytes: &[u8]) -> [u8; HASH_LENGTH] {
    let digest = Blake2b256::digest(bytes);
    let mut out = [0u8; HASH_LENGTH];
    out.copy_from_slice(&digest);
    out
}

/// A 32-byte digest (address, transaction id, block hash).
///
/// Serializes as a lowercase hex string so it can be used as a map key in
/// the canonical JSON wire format.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest32(pub [u8; HASH_LENGTH]);

impl Digest32 {
    /// The all-zero digest, used as the genesis parent sentinel.
    pub const ZERO: Digest32 = Digest32([0u8; HASH_LENGTH]);

    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s)?;
        let array: [u8; HASH_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidLength {
                expected: HASH_LENGTH,
                got: bytes.len(),
            })?;
        Ok(Digest32(array))
    }
}

impl From<[u8; HASH_LENGTH]> for Digest32 {
    fn from(bytes: [u8; HASH_LENGTH]) -> Self {
        Digest32(bytes)
    }
}

impl AsRef<[u8]> for Digest32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest32({}..)", &self.to_hex()[..8])
    }
}

impl FromStr for Digest32 {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Digest32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest32::from_hex(&s).map_err(D::Error::custom)
    }
}
