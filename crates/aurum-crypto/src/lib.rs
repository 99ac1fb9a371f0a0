//! # aurum-crypto
//!
//! Cryptographic primitives consumed by the rest of the node:
//! - Blake2b-256 content hashing
//! - 32-byte digests with a canonical hex wire form
//! - ed25519 keypairs, addresses (`hash(public_key)`), signing and
//!   verification over canonically serialized values
//!
//! Signing and verification agree on one canonical serialization of the
//! signed value, so two peers always compute the same message bytes.

mod digest;
mod error;
mod keys;

pub use digest::{hash, Blake2b256, Digest32, HASH_LENGTH};
pub use error::{CryptoError, CryptoResult};
pub use keys::{
    address_of, canonical_bytes, verify_value, Address, Keypair, PUBLIC_KEY_LENGTH,
    SIGNATURE_LENGTH,
};

pub mod hex32;
pub mod hex64;
