//! Proptest strategies for core types.

use aurum_core::Output;
use aurum_crypto::{Address, Digest32};
use proptest::prelude::*;

/// Arbitrary 32-byte digests (addresses, tx ids, block hashes).
pub fn arb_digest() -> impl Strategy<Value = Digest32> {
    prop::array::uniform32(any::<u8>()).prop_map(Digest32)
}

/// Arbitrary addresses. These do not correspond to real keypairs; use them
/// where only identity matters, not spendability.
pub fn arb_address() -> impl Strategy<Value = Address> {
    arb_digest()
}

/// Arbitrary coin amounts, kept well clear of u64 overflow when summed.
pub fn arb_amount() -> impl Strategy<Value = u64> {
    1u64..=1_000_000u64
}

/// Arbitrary outputs.
pub fn arb_output() -> impl Strategy<Value = Output> {
    (arb_amount(), arb_address()).prop_map(|(amount, address)| Output { amount, address })
}

/// Short lists of outputs, as found in real transactions.
pub fn arb_outputs() -> impl Strategy<Value = Vec<Output>> {
    prop::collection::vec(arb_output(), 1..5)
}
