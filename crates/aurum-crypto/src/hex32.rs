//! Serde adapter: `[u8; 32]` as a lowercase hex string.
//!
//! Use with `#[serde(with = "aurum_crypto::hex32")]` on public-key fields so
//! the canonical JSON wire format stays human-readable and deterministic.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
    let s = String::deserialize(deserializer)?;
    let bytes = hex::decode(&s).map_err(D::Error::custom)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| D::Error::custom(format!("expected 32 bytes, got {}", bytes.len())))
}
