//! # aurum-wallet
//!
//! Wallet functionality for Aurum participants:
//! - keypair generation and address management
//! - tracking of owned UTXOs as an ordered coin queue
//! - balance calculation and signed-input minting for spends
//! - capture of the wallet-wide mint-eligibility key

mod error;
mod wallet;

pub use error::{WalletError, WalletResult};
pub use wallet::{Coin, SpentUtxos, Wallet};
