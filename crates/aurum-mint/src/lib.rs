//! # aurum-mint
//!
//! Participants of the network:
//! - [`Client`]: holds a wallet, posts transactions, absorbs payments from
//!   confirmed blocks
//! - [`Miner`]: a client that also runs the consensus loop — mint
//!   eligibility, proof search, announcement, and fork resolution by
//!   longest chain
//!
//! Each participant runs as a single task draining its bus receiver, with
//! its state behind a mutex: every handler runs to completion before the
//! next one starts, so there is no parallelism inside a participant.

mod client;
mod error;
mod miner;

pub use client::Client;
pub use error::{MintError, MintResult};
pub use miner::Miner;

use aurum_bus::Event;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::error;

/// Drive a client from its bus receiver until the bus goes away.
pub async fn run_client(client: Arc<Mutex<Client>>, mut events: UnboundedReceiver<Event>) {
    while let Some(event) = events.recv().await {
        client.lock().handle_event(event);
    }
}

/// Drive a miner from its bus receiver until the bus goes away.
pub async fn run_miner(miner: Arc<Mutex<Miner>>, mut events: UnboundedReceiver<Event>) {
    while let Some(event) = events.recv().await {
        if let Err(err) = miner.lock().handle_event(event) {
            error!(error = %err, "miner handler failed");
        }
    }
}
