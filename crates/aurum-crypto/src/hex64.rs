//! Serde adapter: `[u8; 64]` as a lowercase hex string (signatures).

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(bytes: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 64], D::Error> {
    let s = String::deserialize(deserializer)?;
    let bytes = hex::decode(&s).map_err(D::Error::custom)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| D::Error::custom(format!("expected 64 bytes, got {}", bytes.len())))
}
