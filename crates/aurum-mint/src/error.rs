//! Participant error types.

use thiserror::Error;

/// Errors surfaced by client and miner operations. Anything a peer might do
/// wrong is a silent reject inside the handlers instead; these are local
/// faults.
#[derive(Error, Debug)]
pub enum MintError {
    /// A wallet operation failed.
    #[error("wallet error: {0}")]
    Wallet(#[from] aurum_wallet::WalletError),

    /// A core operation failed.
    #[error("core error: {0}")]
    Core(#[from] aurum_core::CoreError),

    /// A wire payload could not be produced.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The wallet has not captured an eligibility key yet.
    #[error("no eligibility key captured")]
    MissingEligibilityKey,
}

/// Result type for participant operations.
pub type MintResult<T> = Result<T, MintError>;
