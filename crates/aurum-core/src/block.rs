//! Blocks: the per-chain transaction ledger.

use crate::clock;
use crate::error::CoreError;
use crate::params::ConsensusParams;
use crate::transaction::Transaction;
use crate::types::BlockHash;
use crate::utxo::UtxoView;
use aurum_crypto::{hash, Address, Digest32};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One block of the chain.
///
/// A block is "open" while its miner admits transactions and searches for a
/// proof; once announced it is sealed and only ever read or used as a
/// parent. `transactions` does not include the coinbase: the coinbase is
/// created with the block and collects the fees of every admitted
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub prev_block_hash: BlockHash,
    pub chain_length: u64,
    /// Milliseconds since epoch at creation.
    pub timestamp: u64,
    pub reward_address: Address,
    pub coinbase_tx: Transaction,
    pub transactions: Vec<Transaction>,
    pub utxos: UtxoView,
    pub proof: u64,
}

/// Wire form without the proof field, for `serialize(include_proof = false)`.
#[derive(Serialize)]
struct BlockWithoutProof<'a> {
    prev_block_hash: &'a BlockHash,
    chain_length: u64,
    timestamp: u64,
    reward_address: &'a Address,
    coinbase_tx: &'a Transaction,
    transactions: &'a [Transaction],
    utxos: &'a UtxoView,
}

impl Block {
    /// Create a block extending `parent`, or a genesis block when `parent`
    /// is absent. The UTXO view is cloned from the parent and the coinbase
    /// is registered in it immediately.
    pub fn new(reward_address: Address, parent: Option<&Block>, params: &ConsensusParams) -> Self {
        let (prev_block_hash, chain_length, mut utxos) = match parent {
            Some(parent) => (parent.hash_val(), parent.chain_length + 1, parent.utxos.clone()),
            None => (BlockHash::ZERO, 0, UtxoView::new()),
        };

        let coinbase_tx = Transaction::coinbase(params.base_reward, reward_address);
        utxos.insert(coinbase_tx.id(), coinbase_tx.outputs());

        Self {
            prev_block_hash,
            chain_length,
            timestamp: clock::now_millis(),
            reward_address,
            coinbase_tx,
            transactions: Vec::new(),
            utxos,
            proof: 0,
        }
    }

    /// Build the genesis block, seeding the view with one coinbase-style
    /// transaction per allocation. Callers credit each participant's wallet
    /// from `transactions`.
    pub fn make_genesis(allocations: &[(Address, u64)], params: &ConsensusParams) -> Self {
        // the genesis coinbase pays the zero address, which nobody holds
        let mut block = Block::new(Address::ZERO, None, params);
        for &(address, amount) in allocations {
            let tx = Transaction::coinbase(amount, address);
            block.utxos.insert(tx.id(), tx.outputs());
            block.transactions.push(tx);
        }
        block
    }

    pub fn is_genesis(&self) -> bool {
        self.chain_length == 0
    }

    /// Whether this block would admit `tx`: valid against the current view,
    /// id unknown to the chain, and (for non-coinbase) an id that actually
    /// hashes its content.
    pub fn will_accept_transaction(&self, tx: &Transaction) -> bool {
        if self.utxos.contains(&tx.id()) {
            debug!(tx_id = %tx.id(), "transaction id already present in this chain");
            return false;
        }
        if !tx.matches_content() {
            warn!(tx_id = %tx.id(), "declared transaction id does not match its content");
            return false;
        }
        tx.is_valid(&self.utxos)
    }

    /// Admit a transaction: clear the spent slots, register the new
    /// outputs, and route the fee into the coinbase.
    ///
    /// Precondition: `will_accept_transaction(&tx)`.
    pub fn add_transaction(&mut self, tx: Transaction) {
        let mut input_sum: u64 = 0;
        for input in tx.inputs() {
            if let Some(spent) = self.utxos.clear_spent(&input.tx_id, input.output_index) {
                input_sum += spent.amount;
            }
        }
        self.utxos.insert(tx.id(), tx.outputs());

        let fee = input_sum.saturating_sub(tx.total_output());
        self.coinbase_tx.add_fee(fee);
        let coinbase_outputs = self.coinbase_tx.outputs().to_vec();
        self.utxos.refresh(&self.coinbase_tx.id(), &coinbase_outputs);

        self.transactions.push(tx);
    }

    /// Canonical serialization; field order is fixed by the struct.
    pub fn serialize(&self, include_proof: bool) -> String {
        if include_proof {
            serde_json::to_string(self).expect("blocks always serialize")
        } else {
            serde_json::to_string(&BlockWithoutProof {
                prev_block_hash: &self.prev_block_hash,
                chain_length: self.chain_length,
                timestamp: self.timestamp,
                reward_address: &self.reward_address,
                coinbase_tx: &self.coinbase_tx,
                transactions: &self.transactions,
                utxos: &self.utxos,
            })
            .expect("blocks always serialize")
        }
    }

    /// Reconstruct a block from its canonical serialization.
    pub fn deserialize(data: &str) -> Result<Block, CoreError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Deterministic content hash of the block, proof included.
    pub fn hash_val(&self) -> BlockHash {
        Digest32(hash(self.serialize(true).as_bytes()))
    }

    /// The cheap proof predicate: enough leading zero bits in the content
    /// hash. It binds a block to its contents; mining cost is governed by
    /// eligibility.
    pub fn verify_proof(&self, params: &ConsensusParams) -> bool {
        count_leading_zero_bits(self.hash_val().as_bytes()) >= params.proof_target_bits
    }
}

fn count_leading_zero_bits(bytes: &[u8; 32]) -> u32 {
    let mut total = 0u32;
    for b in bytes {
        if *b == 0 {
            total += 8;
        } else {
            total += b.leading_zeros();
            break;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Input, Output};
    use aurum_crypto::Keypair;

    fn signed_input(tx: &Transaction, index: u32, keypair: &Keypair) -> Input {
        Input {
            tx_id: tx.id(),
            output_index: index,
            pub_key: keypair.public_bytes(),
            signature: keypair
                .sign_value(&tx.outputs()[index as usize])
                .unwrap(),
        }
    }

    #[test]
    fn leading_zero_bits_examples() {
        let mut h = [0u8; 32];
        assert_eq!(count_leading_zero_bits(&h), 256);
        h[0] = 0x0F;
        assert_eq!(count_leading_zero_bits(&h), 4);
        h = [0u8; 32];
        h[1] = 0x80;
        assert_eq!(count_leading_zero_bits(&h), 8);
        h[1] = 0x40;
        assert_eq!(count_leading_zero_bits(&h), 9);
    }

    #[test]
    fn genesis_seeds_allocations() {
        let params = ConsensusParams::default();
        let alice = Keypair::generate().address();
        let bob = Keypair::generate().address();
        let genesis = Block::make_genesis(&[(alice, 150), (bob, 90)], &params);

        assert!(genesis.is_genesis());
        assert_eq!(genesis.prev_block_hash, BlockHash::ZERO);
        assert_eq!(genesis.transactions.len(), 2);

        let alice_tx = &genesis.transactions[0];
        assert_eq!(genesis.utxos.unspent(&alice_tx.id(), 0).unwrap().amount, 150);
    }

    #[test]
    fn child_inherits_parent_view() {
        let params = ConsensusParams::default();
        let ka = Keypair::generate();
        let genesis = Block::make_genesis(&[(ka.address(), 100)], &params);
        let miner = Keypair::generate().address();

        let child = Block::new(miner, Some(&genesis), &params);
        assert_eq!(child.chain_length, 1);
        assert_eq!(child.prev_block_hash, genesis.hash_val());

        // the genesis allocation is still spendable in the child's view
        let alloc = &genesis.transactions[0];
        assert_eq!(child.utxos.unspent(&alloc.id(), 0).unwrap().amount, 100);
        // and the child's own coinbase is registered
        assert_eq!(
            child.utxos.unspent(&child.coinbase_tx.id(), 0).unwrap().amount,
            params.base_reward
        );
    }

    #[test]
    fn add_transaction_clears_spent_slots_and_collects_fee() {
        let params = ConsensusParams::default();
        let ka = Keypair::generate();
        let kb = Keypair::generate();
        let genesis = Block::make_genesis(&[(ka.address(), 100)], &params);
        let mut block = Block::new(Keypair::generate().address(), Some(&genesis), &params);

        let alloc = genesis.transactions[0].clone();
        let spend = Transaction::new(
            vec![signed_input(&alloc, 0, &ka)],
            vec![
                Output { amount: 60, address: kb.address() },
                Output { amount: 30, address: ka.address() },
            ],
        );

        assert!(block.will_accept_transaction(&spend));
        block.add_transaction(spend.clone());

        // no double spend: the consumed slot is cleared
        assert!(block.utxos.unspent(&alloc.id(), 0).is_none());
        // the new outputs are spendable
        assert_eq!(block.utxos.unspent(&spend.id(), 0).unwrap().amount, 60);
        // the 10-coin fee landed on the coinbase, object and view alike
        assert_eq!(block.coinbase_tx.outputs()[0].amount, params.base_reward + 10);
        assert_eq!(
            block.utxos.unspent(&block.coinbase_tx.id(), 0).unwrap().amount,
            params.base_reward + 10
        );
        // a second admission attempt is rejected by the view
        assert!(!block.will_accept_transaction(&spend));
    }

    #[test]
    fn will_accept_rejects_forged_id() {
        let params = ConsensusParams::default();
        let ka = Keypair::generate();
        let genesis = Block::make_genesis(&[(ka.address(), 100)], &params);
        let block = Block::new(Keypair::generate().address(), Some(&genesis), &params);

        let alloc = genesis.transactions[0].clone();
        let honest = Transaction::new(
            vec![signed_input(&alloc, 0, &ka)],
            vec![Output { amount: 100, address: ka.address() }],
        );
        // forge a different declared id by round-tripping through JSON
        let mut json = serde_json::to_value(&honest).unwrap();
        json["id"] = serde_json::Value::String("ff".repeat(32));
        let forged: Transaction = serde_json::from_value(json).unwrap();

        assert!(block.will_accept_transaction(&honest));
        assert!(!block.will_accept_transaction(&forged));
    }

    #[test]
    fn serialization_round_trips() {
        let params = ConsensusParams::default();
        let ka = Keypair::generate();
        let genesis = Block::make_genesis(&[(ka.address(), 100)], &params);
        let mut block = Block::new(Keypair::generate().address(), Some(&genesis), &params);

        let alloc = genesis.transactions[0].clone();
        let spend = Transaction::new(
            vec![signed_input(&alloc, 0, &ka)],
            vec![Output { amount: 90, address: ka.address() }],
        );
        block.add_transaction(spend);
        block.proof = 77;

        let restored = Block::deserialize(&block.serialize(true)).unwrap();
        assert_eq!(restored, block);
        assert_eq!(restored.hash_val(), block.hash_val());
    }

    #[test]
    fn serialize_without_proof_omits_it() {
        let params = ConsensusParams::default();
        let block = Block::make_genesis(&[], &params);

        assert!(block.serialize(true).contains("\"proof\""));
        assert!(!block.serialize(false).contains("\"proof\""));
    }

    #[test]
    fn proof_search_terminates_on_cheap_predicate() {
        let params = ConsensusParams {
            proof_target_bits: 4,
            ..Default::default()
        };
        let mut block = Block::make_genesis(&[], &params);

        let mut found = false;
        for proof in 0..100_000u64 {
            block.proof = proof;
            if block.verify_proof(&params) {
                found = true;
                break;
            }
        }
        assert!(found, "a 4-bit proof should be found quickly");
    }
}
