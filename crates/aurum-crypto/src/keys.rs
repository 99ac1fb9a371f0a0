//! Keypairs, addresses and signatures.
//!
//! An address is the Blake2b-256 hash of an ed25519 public key; a spend
//! reveals the pre-image. Values are signed over their canonical JSON
//! serialization so signer and verifier agree bit-for-bit.

use crate::digest::{hash, Digest32};
use crate::CryptoResult;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::Serialize;

/// Public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// An address: `hash(public_key)`.
pub type Address = Digest32;

/// An ed25519 keypair owned by a wallet.
#[derive(Clone)]
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// The raw public key bytes.
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.signing.verifying_key().to_bytes()
    }

    /// The address derived from this keypair's public key.
    pub fn address(&self) -> Address {
        address_of(&self.public_bytes())
    }

    /// Sign the canonical serialization of `value`.
    pub fn sign_value<T: Serialize>(&self, value: &T) -> CryptoResult<[u8; SIGNATURE_LENGTH]> {
        let message = canonical_bytes(value)?;
        Ok(self.signing.sign(&message).to_bytes())
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print the secret half
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish()
    }
}

/// Compute the address of a raw public key.
pub fn address_of(public: &[u8; PUBLIC_KEY_LENGTH]) -> Address {
    Digest32(hash(public))
}

/// Canonical byte serialization shared by `sign_value` and `verify_value`.
pub fn canonical_bytes<T: Serialize>(value: &T) -> CryptoResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Verify a signature over the canonical serialization of `value`.
///
/// Returns `false` on malformed keys or signatures rather than erroring:
/// a peer handing us garbage is a rejection, not a fault.
pub fn verify_value<T: Serialize>(
    public: &[u8; PUBLIC_KEY_LENGTH],
    value: &T,
    signature: &[u8; SIGNATURE_LENGTH],
) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(public) else {
        return false;
    };
    let Ok(message) = canonical_bytes(value) else {
        return false;
    };
    key.verify(&message, &Signature::from_bytes(signature))
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Payload {
        amount: u64,
        memo: &'static str,
    }

    #[test]
    fn sign_verify_round_trip() {
        let keypair = Keypair::generate();
        let value = Payload {
            amount: 42,
            memo: "coffee",
        };

        let signature = keypair.sign_value(&value).unwrap();
        assert!(verify_value(&keypair.public_bytes(), &value, &signature));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let signer = Keypair::generate();
        let other = Keypair::generate();
        let value = Payload {
            amount: 42,
            memo: "coffee",
        };

        let signature = signer.sign_value(&value).unwrap();
        assert!(!verify_value(&other.public_bytes(), &value, &signature));
    }

    #[test]
    fn verify_rejects_tampered_value() {
        let keypair = Keypair::generate();
        let value = Payload {
            amount: 42,
            memo: "coffee",
        };
        let tampered = Payload {
            amount: 43,
            memo: "coffee",
        };

        let signature = keypair.sign_value(&value).unwrap();
        assert!(!verify_value(&keypair.public_bytes(), &tampered, &signature));
    }

    #[test]
    fn address_matches_public_key_hash() {
        let keypair = Keypair::generate();
        assert_eq!(
            keypair.address(),
            Digest32(hash(&keypair.public_bytes()))
        );
    }
}
