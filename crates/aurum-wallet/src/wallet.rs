//! The wallet: keypairs plus a FIFO queue of spendable coins.

use crate::{WalletError, WalletResult};
use aurum_core::{Input, Output, TxId};
use aurum_crypto::{Address, Keypair, PUBLIC_KEY_LENGTH};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// A wallet's own record of a UTXO it can spend.
#[derive(Debug, Clone)]
pub struct Coin {
    pub output: Output,
    pub tx_id: TxId,
    pub output_index: u32,
}

/// Result of minting signed inputs for a spend.
#[derive(Debug)]
pub struct SpentUtxos {
    /// Signed inputs covering at least the requested amount.
    pub inputs: Vec<Input>,
    /// Accumulated amount minus the requested amount.
    pub change_amount: u64,
}

/// Owns keypairs and tracks spendable coins.
///
/// New coins are pushed to the front of the queue; spending consumes from
/// the back, so the oldest (most likely finalized) coins go first. Coins
/// are removed optimistically when inputs are minted; the keypairs are
/// retained so coin state can be re-derived from the chain if a spend is
/// rejected.
#[derive(Default)]
pub struct Wallet {
    keypairs: HashMap<Address, Keypair>,
    /// Addresses in creation order, newest last.
    address_order: Vec<Address>,
    coins: VecDeque<Coin>,
    eligibility_key: Option<[u8; PUBLIC_KEY_LENGTH]>,
}

impl Wallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all coin amounts.
    pub fn balance(&self) -> u64 {
        self.coins.iter().map(|c| c.output.amount).sum()
    }

    /// Number of coins currently held.
    pub fn coin_count(&self) -> usize {
        self.coins.len()
    }

    /// Whether the wallet owns the keypair behind `address`.
    pub fn has_key(&self, address: &Address) -> bool {
        self.keypairs.contains_key(address)
    }

    /// All addresses in creation order.
    pub fn addresses(&self) -> &[Address] {
        &self.address_order
    }

    /// Generate a fresh keypair and return its address.
    pub fn make_address(&mut self) -> Address {
        let keypair = Keypair::generate();
        let address = keypair.address();
        self.keypairs.insert(address, keypair);
        self.address_order.push(address);
        debug!(address = %address, "generated new address");
        address
    }

    /// Record that `(tx_id, output_index)` pays one of our addresses.
    pub fn add_utxo(&mut self, output: Output, tx_id: TxId, output_index: u32) -> WalletResult<()> {
        if !self.keypairs.contains_key(&output.address) {
            return Err(WalletError::UnknownAddress(output.address));
        }
        self.coins.push_front(Coin {
            output,
            tx_id,
            output_index,
        });
        Ok(())
    }

    /// Mint signed inputs covering `amount`, consuming coins oldest-first.
    pub fn spend_utxos(&mut self, amount: u64) -> WalletResult<SpentUtxos> {
        let available = self.balance();
        if amount > available {
            return Err(WalletError::InsufficientFunds {
                needed: amount,
                available,
            });
        }

        let mut inputs = Vec::new();
        let mut accumulated: u64 = 0;
        while accumulated < amount {
            let Some(coin) = self.coins.pop_back() else {
                break;
            };
            // keypairs are never removed, so this lookup cannot fail
            let Some(keypair) = self.keypairs.get(&coin.output.address) else {
                return Err(WalletError::UnknownAddress(coin.output.address));
            };
            let signature = keypair.sign_value(&coin.output)?;
            accumulated += coin.output.amount;
            inputs.push(Input {
                tx_id: coin.tx_id,
                output_index: coin.output_index,
                pub_key: keypair.public_bytes(),
                signature,
            });
        }

        debug!(
            requested = amount,
            consumed = accumulated,
            inputs = inputs.len(),
            "minted signed inputs"
        );
        Ok(SpentUtxos {
            inputs,
            change_amount: accumulated - amount,
        })
    }

    /// Capture the wallet-wide eligibility public key: the key of the most
    /// recently created address stands in for the whole wallet in the
    /// stake check.
    pub fn save_eligibility_proof(&mut self) {
        self.eligibility_key = self
            .address_order
            .last()
            .and_then(|address| self.keypairs.get(address))
            .map(|keypair| keypair.public_bytes());
    }

    /// The captured eligibility key, if any.
    pub fn eligibility_key(&self) -> Option<[u8; PUBLIC_KEY_LENGTH]> {
        self.eligibility_key
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("addresses", &self.address_order.len())
            .field("coins", &self.coins.len())
            .field("balance", &self.balance())
            .finish()
    }
}
