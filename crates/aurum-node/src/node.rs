//! Network bootstrap: wallets, genesis, and one task per participant.

use crate::config::NodeConfig;
use aurum_bus::{Event, MessageBus};
use aurum_core::Block;
use aurum_mint::{run_client, run_miner, Client, Miner};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::info;

/// A participant waiting to be driven by its own task.
enum Pending {
    Client(Arc<Mutex<Client>>, UnboundedReceiver<Event>),
    Miner(Arc<Mutex<Miner>>, UnboundedReceiver<Event>),
}

/// The simulated network: a shared bus, spending clients and miners.
pub struct Network {
    clients: Vec<Arc<Mutex<Client>>>,
    miners: Vec<Arc<Mutex<Miner>>>,
    pending: Vec<Pending>,
    handles: Vec<JoinHandle<()>>,
}

impl Network {
    /// Create every participant, allocate the genesis block and credit the
    /// wallets. Nothing runs until [`Network::start`].
    pub fn build(config: &NodeConfig) -> Self {
        let bus = MessageBus::new();
        let params = config.consensus.clone();

        // subscriptions are registered before any event can flow
        let mut allocations = Vec::new();
        let mut client_seeds = Vec::new();
        for pc in &config.simulation.clients {
            let rx = bus.subscribe(&pc.name);
            let mut client = Client::new(&pc.name, bus.clone(), params.clone());
            let address = client.fresh_address();
            if pc.starting_balance > 0 {
                allocations.push((address, pc.starting_balance));
            }
            client_seeds.push((client, rx));
        }
        let mut miner_seeds = Vec::new();
        for mc in &config.simulation.miners {
            let rx = bus.subscribe(&mc.name);
            let mut client = Client::new(&mc.name, bus.clone(), params.clone());
            let address = client.fresh_address();
            if mc.starting_balance > 0 {
                allocations.push((address, mc.starting_balance));
            }
            miner_seeds.push((client, rx));
        }

        let genesis = Block::make_genesis(&allocations, &params);
        info!(
            allocations = allocations.len(),
            genesis = %genesis.hash_val(),
            "created genesis block"
        );

        let mut clients = Vec::new();
        let mut miners = Vec::new();
        let mut pending = Vec::new();
        for (mut client, rx) in client_seeds {
            client.absorb_block(&genesis);
            let client = Arc::new(Mutex::new(client));
            clients.push(Arc::clone(&client));
            pending.push(Pending::Client(client, rx));
        }
        for (mut client, rx) in miner_seeds {
            client.absorb_block(&genesis);
            let miner = Arc::new(Mutex::new(Miner::new(client, genesis.clone())));
            miners.push(Arc::clone(&miner));
            pending.push(Pending::Miner(miner, rx));
        }

        Self {
            clients,
            miners,
            pending,
            handles: Vec::new(),
        }
    }

    /// Spawn one task per participant and kick every miner off.
    pub fn start(&mut self) {
        for pending in self.pending.drain(..) {
            let handle = match pending {
                Pending::Client(client, rx) => tokio::spawn(run_client(client, rx)),
                Pending::Miner(miner, rx) => tokio::spawn(run_miner(miner, rx)),
            };
            self.handles.push(handle);
        }
        for miner in &self.miners {
            miner.lock().initialize();
        }
        info!(
            clients = self.clients.len(),
            miners = self.miners.len(),
            "network started"
        );
    }

    /// Log every participant's final state. The chain head shown for a
    /// miner is the sealed block its open block extends.
    pub fn report(&self) {
        for client in &self.clients {
            let client = client.lock();
            info!(
                participant = client.name(),
                balance = client.balance(),
                "client state"
            );
        }
        for miner in &self.miners {
            let miner = miner.lock();
            let head = miner.current_block().prev_block_hash;
            info!(
                participant = miner.name(),
                balance = miner.balance(),
                chain_length = miner.chain_length(),
                head = %head,
                "miner state"
            );
        }
    }

    /// Stop every participant task.
    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}
