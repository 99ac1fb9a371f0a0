//! Network-wide consensus parameters.
//!
//! Injected at construction so different networks (and tests) can run with
//! different settings; nothing here is compile-time.

use serde::{Deserialize, Serialize};

/// Consensus parameters shared by every participant of a network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Block reward credited to the coinbase before fee collection.
    pub base_reward: u64,

    /// Proof-search iterations performed per scheduler quantum before the
    /// miner yields to its other handlers.
    pub num_rounds_mining: u64,

    /// Prefix bits required to mint on top of a freshly sealed parent.
    pub base_eligibility_target: u32,

    /// Wall-clock interval after which the eligibility bar drops by one bit,
    /// keeping the chain live when no miner is immediately eligible.
    pub eligibility_decrease_interval_ms: u64,

    /// Leading zero bits the sealed block hash must carry. The predicate
    /// only binds a block to its contents; mining cost is governed by
    /// eligibility, so this stays cheap.
    pub proof_target_bits: u32,

    /// Amount of the self-payment a miner posts when opening a block.
    pub coinage_amount: u64,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            base_reward: 25,
            num_rounds_mining: 2000,
            base_eligibility_target: 2,
            eligibility_decrease_interval_ms: 10_000,
            proof_target_bits: 10,
            coinage_amount: 1,
        }
    }
}
