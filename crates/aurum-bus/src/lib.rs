//! # aurum-bus
//!
//! The shared message bus: a named-event broadcaster delivering to every
//! registered participant. Participants do not own each other; the bus
//! holds only a channel sender per participant name, and each participant
//! drains its own receiver in a single task, so every handler runs to
//! completion before the next one starts.
//!
//! Ordering guarantees:
//! - events emitted by one participant arrive in emission order;
//! - the broadcast fan-out runs under one lock, so every subscriber
//!   observes broadcasts in the same total order.

use aurum_crypto::PUBLIC_KEY_LENGTH;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Identifies the announcing miner in a `PROOF_FOUND` payload, carrying the
/// eligibility key peers need to verify the mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerRef {
    pub name: String,
    #[serde(with = "aurum_crypto::hex32")]
    pub eligibility_key: [u8; PUBLIC_KEY_LENGTH],
}

/// The wire-level events. Broadcast payloads are canonical serializations;
/// the two self-signals carry nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Per-miner self-signal: begin (or re-check) minting.
    InitMinting,
    /// Per-miner self-signal: run one proof-search quantum.
    StartMining,
    /// A transaction posted by some client, canonically serialized.
    PostTransaction { tx: String },
    /// A sealed block (serialized with proof) and its announcing miner.
    ProofFound { block: String, miner: MinerRef },
}

impl Event {
    /// The wire-level event name.
    pub fn name(&self) -> &'static str {
        match self {
            Event::InitMinting => "INIT_MINTING",
            Event::StartMining => "START_MINING",
            Event::PostTransaction { .. } => "POST_TRANSACTION",
            Event::ProofFound { .. } => "PROOF_FOUND",
        }
    }
}

/// The shared bus. Cheap to clone; all clones publish into the same
/// subscriber set.
#[derive(Clone, Default)]
pub struct MessageBus {
    subscribers: Arc<Mutex<Vec<(String, mpsc::UnboundedSender<Event>)>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant; the returned receiver yields every event
    /// addressed or broadcast to it.
    pub fn subscribe(&self, name: &str) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push((name.to_string(), tx));
        debug!(participant = name, "subscribed to the bus");
        rx
    }

    /// Number of registered participants.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Deliver an event to one participant (self-signals).
    pub fn emit(&self, name: &str, event: Event) {
        let subscribers = self.subscribers.lock();
        match subscribers.iter().find(|(n, _)| n == name) {
            Some((_, tx)) => {
                if tx.send(event).is_err() {
                    debug!(participant = name, "subscriber receiver dropped");
                }
            }
            None => warn!(participant = name, "emit to unknown subscriber"),
        }
    }

    /// Deliver an event to one participant after `delay`. This is the only
    /// timing primitive the consensus loop uses: the mining-quantum yield
    /// and the eligibility re-check are both delayed self-signals.
    pub fn emit_after(&self, name: &str, event: Event, delay: Duration) {
        let bus = self.clone();
        let name = name.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            bus.emit(&name, event);
        });
    }

    /// Deliver an event to every subscriber. The lock is held across the
    /// whole fan-out so concurrent broadcasts cannot interleave: all
    /// subscribers see the same total order.
    pub fn broadcast(&self, event: Event) {
        let subscribers = self.subscribers.lock();
        debug!(
            event = event.name(),
            subscribers = subscribers.len(),
            "broadcasting"
        );
        for (_, tx) in subscribers.iter() {
            let _ = tx.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_tx(tag: &str) -> Event {
        Event::PostTransaction { tx: tag.to_string() }
    }

    #[tokio::test]
    async fn emit_reaches_only_the_named_subscriber() {
        let bus = MessageBus::new();
        let mut rx_a = bus.subscribe("a");
        let mut rx_b = bus.subscribe("b");

        bus.emit("a", Event::StartMining);

        assert_eq!(rx_a.recv().await, Some(Event::StartMining));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_reaches_everyone_in_the_same_order() {
        let bus = MessageBus::new();
        let mut rx_a = bus.subscribe("a");
        let mut rx_b = bus.subscribe("b");

        bus.broadcast(dummy_tx("one"));
        bus.broadcast(dummy_tx("two"));

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(rx.recv().await, Some(dummy_tx("one")));
            assert_eq!(rx.recv().await, Some(dummy_tx("two")));
        }
    }

    #[tokio::test]
    async fn emit_after_delivers_later() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe("m");

        bus.emit_after("m", Event::InitMinting, Duration::from_millis(10));
        assert!(rx.try_recv().is_err());

        assert_eq!(rx.recv().await, Some(Event::InitMinting));
    }

    #[test]
    fn miner_ref_round_trips() {
        let miner = MinerRef {
            name: "miner1".to_string(),
            eligibility_key: [7u8; 32],
        };
        let json = serde_json::to_string(&miner).unwrap();
        let back: MinerRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, miner);
    }
}
