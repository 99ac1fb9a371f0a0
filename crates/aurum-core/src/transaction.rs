//! Transactions: immutable input/output triples with a frozen content id.

use crate::error::TransactionError;
use crate::types::{Input, Output, TxId};
use crate::utxo::UtxoView;
use aurum_crypto::{address_of, hash, verify_value, Address, Digest32};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A transfer of coin: spends prior outputs, creates new ones.
///
/// The id is a content hash over `(inputs, outputs)` frozen at construction.
/// Coinbase transactions (empty inputs) later collect fees by mutating
/// `outputs[0].amount`, so for a coinbase the id is a commitment to the
/// construction-time outputs only, not the current ones. The serialized form
/// therefore carries the id explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TxId,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
}

impl Transaction {
    /// Build a transaction, freezing its id.
    pub fn new(inputs: Vec<Input>, outputs: Vec<Output>) -> Self {
        let id = Self::content_id(&inputs, &outputs);
        Self {
            id,
            inputs,
            outputs,
        }
    }

    /// Build a coinbase paying the block reward to `address`.
    pub fn coinbase(amount: u64, address: Address) -> Self {
        Self::new(vec![], vec![Output { amount, address }])
    }

    fn content_id(inputs: &[Input], outputs: &[Output]) -> TxId {
        let preimage = serde_json::to_vec(&(inputs, outputs))
            .expect("inputs and outputs always serialize");
        Digest32(hash(&preimage))
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// A coinbase transaction spends nothing.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Whether the declared id still matches the content hash. False for a
    /// coinbase once fees were collected; false for a tx whose sender lied
    /// about its id.
    pub fn matches_content(&self) -> bool {
        Self::content_id(&self.inputs, &self.outputs) == self.id
    }

    /// Sum of all output amounts.
    pub fn total_output(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount).sum()
    }

    /// Collect a fee into the reward output. Coinbase only; the frozen id is
    /// deliberately left untouched.
    pub fn add_fee(&mut self, amount: u64) {
        debug_assert!(self.is_coinbase(), "fees are collected on the coinbase only");
        self.outputs[0].amount += amount;
    }

    /// Authorize spending one of this transaction's outputs, returning its
    /// amount. Purely functional on the transaction.
    pub fn spend_output(&self, input: &Input) -> Result<u64, TransactionError> {
        if input.tx_id != self.id {
            return Err(TransactionError::WrongTxId {
                expected: self.id,
                got: input.tx_id,
            });
        }
        let output = self.outputs.get(input.output_index as usize).ok_or(
            TransactionError::MissingOutput {
                output_index: input.output_index,
                output_count: self.outputs.len(),
            },
        )?;
        if address_of(&input.pub_key) != output.address {
            return Err(TransactionError::AddressMismatch);
        }
        if !verify_value(&input.pub_key, output, &input.signature) {
            return Err(TransactionError::BadSignature {
                output_index: input.output_index,
            });
        }
        Ok(output.amount)
    }

    /// Validate this transaction against a UTXO view.
    ///
    /// Returns `false` — never panics — on any structural problem: missing
    /// referenced transaction, cleared or absent output slot, address or
    /// signature mismatch, or outputs exceeding inputs. Not meaningful for
    /// a coinbase (zero inputs never cover positive outputs).
    pub fn is_valid(&self, view: &UtxoView) -> bool {
        let mut input_sum: u64 = 0;
        for (idx, input) in self.inputs.iter().enumerate() {
            let Some(referenced) = view.unspent(&input.tx_id, input.output_index) else {
                debug!(tx_id = %self.id, input_idx = idx, "referenced output missing or spent");
                return false;
            };
            if address_of(&input.pub_key) != referenced.address {
                debug!(tx_id = %self.id, input_idx = idx, "address mismatch");
                return false;
            }
            if !verify_value(&input.pub_key, referenced, &input.signature) {
                debug!(tx_id = %self.id, input_idx = idx, "signature does not verify");
                return false;
            }
            input_sum += referenced.amount;
        }
        input_sum >= self.total_output()
    }
}
