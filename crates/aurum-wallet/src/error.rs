//! Wallet error types.

use aurum_crypto::Address;
use thiserror::Error;

/// Wallet errors. All of these surface to the caller: a failed spend is a
/// user action, an unknown address is a programming bug.
#[derive(Error, Debug)]
pub enum WalletError {
    /// The wallet cannot cover the requested amount.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    /// The wallet holds no keypair for this address.
    #[error("no keypair for address {0}")]
    UnknownAddress(Address),

    /// Signing an input failed.
    #[error("signing error: {0}")]
    Signing(#[from] aurum_crypto::CryptoError),
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;
