//! Test harness: a miniature network with fast consensus parameters.

use aurum_bus::MessageBus;
use aurum_core::{Block, ConsensusParams, Input, Transaction};
use aurum_crypto::{Address, Keypair};
use aurum_mint::{Client, Miner};

/// Parameters tuned for tests: everyone is eligible immediately and proofs
/// are found within a handful of iterations.
pub fn fast_params() -> ConsensusParams {
    ConsensusParams {
        base_reward: 25,
        num_rounds_mining: 200,
        base_eligibility_target: 0,
        eligibility_decrease_interval_ms: 50,
        proof_target_bits: 2,
        coinage_amount: 1,
    }
}

/// Sign a spend of `tx.outputs[index]` with `keypair`.
pub fn signed_input(tx: &Transaction, index: u32, keypair: &Keypair) -> Input {
    Input {
        tx_id: tx.id(),
        output_index: index,
        pub_key: keypair.public_bytes(),
        signature: keypair
            .sign_value(&tx.outputs()[index as usize])
            .expect("signing plain outputs cannot fail"),
    }
}

/// Builder for a miniature network sharing one bus and one genesis block.
pub struct TestNet {
    pub bus: MessageBus,
    pub params: ConsensusParams,
    allocations: Vec<(Address, u64)>,
}

impl TestNet {
    pub fn new(params: ConsensusParams) -> Self {
        Self {
            bus: MessageBus::new(),
            params,
            allocations: Vec::new(),
        }
    }

    /// Create a client with one address; `balance` becomes its genesis
    /// allocation. Credit it after `genesis()` via `absorb_block`.
    pub fn client(&mut self, name: &str, balance: u64) -> Client {
        let mut client = Client::new(name, self.bus.clone(), self.params.clone());
        let address = client.fresh_address();
        if balance > 0 {
            self.allocations.push((address, balance));
        }
        client
    }

    /// Seal the collected allocations into the genesis block. Call after
    /// every participant has been created.
    pub fn genesis(&self) -> Block {
        Block::make_genesis(&self.allocations, &self.params)
    }
}

/// Credit a pre-genesis client from the genesis block and promote it to a
/// miner on top of it.
pub fn into_miner(mut client: Client, genesis: &Block) -> Miner {
    client.absorb_block(genesis);
    Miner::new(client, genesis.clone())
}

