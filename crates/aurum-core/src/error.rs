//! Error types for the consensus core.

use crate::types::TxId;
use thiserror::Error;

/// Errors surfaced by `Transaction::spend_output`.
///
/// These are fatal to the caller: they mean the caller built a bad input,
/// not that a peer misbehaved.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransactionError {
    /// The input references a different transaction.
    #[error("input references tx {got}, expected {expected}")]
    WrongTxId { expected: TxId, got: TxId },

    /// The input's public key does not hash to the referenced address.
    #[error("input public key does not hash to the referenced output address")]
    AddressMismatch,

    /// The input's signature does not verify against the referenced output.
    #[error("bad signature for output {output_index}")]
    BadSignature { output_index: u32 },

    /// The input references an output index the transaction does not have.
    #[error("no output at index {output_index} (transaction has {output_count})")]
    MissingOutput {
        output_index: u32,
        output_count: usize,
    },
}

/// Errors from block and eligibility operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonical (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An eligibility comparison input is shorter than the 16-bit prefix.
    #[error("eligibility input too short: need at least 2 bytes, got {0}")]
    EligibilityInputTooShort(usize),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
