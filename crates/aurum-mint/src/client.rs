//! Clients: wallet owners that post transactions and absorb payments.

use crate::MintResult;
use aurum_bus::{Event, MessageBus};
use aurum_core::{Block, ConsensusParams, Output, Transaction, TxId};
use aurum_crypto::Address;
use aurum_wallet::Wallet;
use std::collections::HashSet;
use tracing::{debug, trace, warn};

/// A network participant holding keys and spending coins.
pub struct Client {
    name: String,
    wallet: Wallet,
    bus: MessageBus,
    params: ConsensusParams,
    /// Outpoints already credited, so repeated observations of the same
    /// block or transaction never double-credit the wallet.
    seen_outpoints: HashSet<(TxId, u32)>,
}

impl Client {
    pub fn new(name: &str, bus: MessageBus, params: ConsensusParams) -> Self {
        Self {
            name: name.to_string(),
            wallet: Wallet::new(),
            bus,
            params,
            seen_outpoints: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn wallet_mut(&mut self) -> &mut Wallet {
        &mut self.wallet
    }

    pub fn balance(&self) -> u64 {
        self.wallet.balance()
    }

    /// Generate a fresh receiving address.
    pub fn fresh_address(&mut self) -> Address {
        self.wallet.make_address()
    }

    /// Spend coins to cover `outputs`, appending a change output to a fresh
    /// own address when needed, and broadcast the transaction.
    pub fn post_transaction(&mut self, mut outputs: Vec<Output>) -> MintResult<Transaction> {
        let total: u64 = outputs.iter().map(|o| o.amount).sum();
        let spent = self.wallet.spend_utxos(total)?;

        if spent.change_amount > 0 {
            let change_address = self.wallet.make_address();
            outputs.push(Output {
                amount: spent.change_amount,
                address: change_address,
            });
        }

        let tx = Transaction::new(spent.inputs, outputs);
        debug!(client = %self.name, tx_id = %tx.id(), total, "posting transaction");
        self.bus.broadcast(Event::PostTransaction {
            tx: serde_json::to_string(&tx)?,
        });
        Ok(tx)
    }

    /// Credit every output of `tx` addressed to this wallet. Idempotent per
    /// outpoint.
    pub fn receive_output(&mut self, tx: &Transaction) {
        for (index, output) in tx.outputs().iter().enumerate() {
            let index = index as u32;
            if !self.wallet.has_key(&output.address) {
                continue;
            }
            if !self.seen_outpoints.insert((tx.id(), index)) {
                continue;
            }
            debug!(
                client = %self.name,
                tx_id = %tx.id(),
                index,
                amount = output.amount,
                "crediting output"
            );
            if let Err(err) = self.wallet.add_utxo(output.clone(), tx.id(), index) {
                // has_key was checked above, so this is unreachable
                warn!(client = %self.name, error = %err, "failed to credit output");
            }
        }
    }

    /// Absorb every payment a confirmed block holds for this wallet,
    /// coinbase included.
    pub fn absorb_block(&mut self, block: &Block) {
        self.receive_output(&block.coinbase_tx);
        for tx in &block.transactions {
            self.receive_output(tx);
        }
    }

    /// Handle one bus event. Plain clients only care about announced
    /// blocks; the rest is miner business.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::ProofFound { block, .. } => self.handle_proof_found(&block),
            other => {
                trace!(client = %self.name, event = other.name(), "ignoring event");
            }
        }
    }

    fn handle_proof_found(&mut self, block_json: &str) {
        let block = match Block::deserialize(block_json) {
            Ok(block) => block,
            Err(err) => {
                warn!(client = %self.name, error = %err, "dropping malformed block payload");
                return;
            }
        };
        if !block.verify_proof(&self.params) {
            warn!(client = %self.name, "dropping block with bad proof");
            return;
        }
        self.absorb_block(&block);
    }
}
