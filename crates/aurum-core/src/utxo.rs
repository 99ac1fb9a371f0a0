//! The UTXO view: per-transaction unspent output slots.

use crate::types::{Output, TxId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Chain state up to and including one block.
///
/// For each transaction known to the block, which of its outputs are still
/// unspent; a spent slot is cleared to `None`. Backed by a `BTreeMap` so the
/// serialized form is canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtxoView {
    entries: BTreeMap<TxId, Vec<Option<Output>>>,
}

impl UtxoView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the view already knows this transaction id.
    pub fn contains(&self, tx_id: &TxId) -> bool {
        self.entries.contains_key(tx_id)
    }

    /// The still-unspent output at `(tx_id, index)`, if any.
    pub fn unspent(&self, tx_id: &TxId, index: u32) -> Option<&Output> {
        self.entries.get(tx_id)?.get(index as usize)?.as_ref()
    }

    /// Register a transaction's outputs, all unspent.
    pub fn insert(&mut self, tx_id: TxId, outputs: &[Output]) {
        self.entries
            .insert(tx_id, outputs.iter().cloned().map(Some).collect());
    }

    /// Clear a spent slot, returning the output it held.
    pub fn clear_spent(&mut self, tx_id: &TxId, index: u32) -> Option<Output> {
        self.entries.get_mut(tx_id)?.get_mut(index as usize)?.take()
    }

    /// Update an existing entry's amounts (coinbase fee collection).
    /// Slots already cleared inside this block stay cleared.
    pub fn refresh(&mut self, tx_id: &TxId, outputs: &[Output]) {
        if let Some(slots) = self.entries.get_mut(tx_id) {
            for (slot, output) in slots.iter_mut().zip(outputs) {
                if slot.is_some() {
                    *slot = Some(output.clone());
                }
            }
        }
    }

    /// Number of transactions the view knows about.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(tx_id, slots)` entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&TxId, &Vec<Option<Output>>)> {
        self.entries.iter()
    }
}
