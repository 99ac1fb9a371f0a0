//! Core wire types: outputs, inputs and the id aliases.

use aurum_crypto::{Address, Digest32, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction id: content hash frozen at construction.
pub type TxId = Digest32;

/// Block hash: content hash of a sealed block.
pub type BlockHash = Digest32;

/// An amount of coin payable to an address.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub amount: u64,
    pub address: Address,
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Output({} -> {:?})", self.amount, self.address)
    }
}

/// A reference to a prior output together with the proof of authorization
/// to spend it: the public key hashing to the output's address, and a
/// signature over the referenced output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub tx_id: TxId,
    pub output_index: u32,
    #[serde(with = "aurum_crypto::hex32")]
    pub pub_key: [u8; PUBLIC_KEY_LENGTH],
    #[serde(with = "aurum_crypto::hex64")]
    pub signature: [u8; SIGNATURE_LENGTH],
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Input")
            .field("tx_id", &self.tx_id)
            .field("output_index", &self.output_index)
            .field("pub_key", &hex::encode(&self.pub_key[..4]))
            .finish()
    }
}
