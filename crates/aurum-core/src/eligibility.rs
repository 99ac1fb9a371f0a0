//! Mint eligibility: a stake-like permission to extend the chain.
//!
//! A miner is eligible when the leading bits of the parent block hash match
//! the leading bits of the miner's eligibility public key. Only the first
//! 16 bits of each side take part in the comparison, and the bar decays
//! over wall-clock time so the chain stays live even when no miner is
//! immediately eligible.

use crate::error::CoreError;
use crate::types::BlockHash;

/// Width of the compared prefix, in bits.
pub const ELIGIBILITY_PREFIX_BITS: u32 = 16;

const PREFIX_BYTES: usize = 2;

/// Count the leading equal bits of the two 16-bit prefixes, stopping at the
/// first mismatch. Errors if either side cannot supply a full prefix: that
/// is a programming bug, not peer input.
pub fn matching_prefix_bits_16(a: &[u8], b: &[u8]) -> Result<u32, CoreError> {
    if a.len() < PREFIX_BYTES {
        return Err(CoreError::EligibilityInputTooShort(a.len()));
    }
    if b.len() < PREFIX_BYTES {
        return Err(CoreError::EligibilityInputTooShort(b.len()));
    }
    let a16 = u16::from_be_bytes([a[0], a[1]]);
    let b16 = u16::from_be_bytes([b[0], b[1]]);
    Ok((a16 ^ b16).leading_zeros())
}

/// The eligibility predicate: enough leading bits of the parent hash match
/// the miner's eligibility key.
pub fn is_eligible_to_mint(
    eligibility_key: &[u8],
    prev_block_hash: &BlockHash,
    target: u32,
) -> Result<bool, CoreError> {
    Ok(matching_prefix_bits_16(prev_block_hash.as_bytes(), eligibility_key)? >= target)
}

/// The target a validator allows for a block minted `elapsed_ms` after its
/// timestamp: one bit less per elapsed decay interval, never below zero.
pub fn decayed_target(base: u32, elapsed_ms: u64, interval_ms: u64) -> u32 {
    if interval_ms == 0 {
        return 0;
    }
    let steps = (elapsed_ms / interval_ms).min(u64::from(base)) as u32;
    base - steps
}
