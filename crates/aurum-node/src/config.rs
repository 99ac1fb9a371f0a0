//! Node configuration.

use crate::Args;
use anyhow::{Context, Result};
use aurum_core::ConsensusParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name, used in logs.
    pub node_name: String,
    /// Consensus parameters shared by every participant.
    #[serde(default)]
    pub consensus: ConsensusParams,
    /// Simulated network composition.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Participants and runtime of the simulated network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// How long to run before reporting, in seconds.
    pub duration_secs: u64,
    /// Spending clients with their genesis allocations.
    pub clients: Vec<ParticipantConfig>,
    /// Miners with their genesis allocations.
    pub miners: Vec<ParticipantConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_secs: 20,
            clients: vec![
                ParticipantConfig::new("alice", 233),
                ParticipantConfig::new("bob", 99),
                ParticipantConfig::new("charlie", 67),
            ],
            miners: vec![
                ParticipantConfig::new("miner1", 400),
                ParticipantConfig::new("miner2", 300),
            ],
        }
    }
}

/// One participant of the simulated network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantConfig {
    pub name: String,
    /// Coins credited to this participant in the genesis block.
    #[serde(default)]
    pub starting_balance: u64,
}

impl ParticipantConfig {
    pub fn new(name: &str, starting_balance: u64) -> Self {
        Self {
            name: name.to_string(),
            starting_balance,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_name: "aurum-node".to_string(),
            consensus: ConsensusParams::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from file and CLI args.
    pub fn load(config_path: &Path, args: &Args) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content =
                std::fs::read_to_string(config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Self::default()
        };

        // Override with CLI args
        if let Some(duration) = args.duration {
            config.simulation.duration_secs = duration;
        }

        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_participants() {
        let config = NodeConfig::default();
        assert!(!config.simulation.clients.is_empty());
        assert!(!config.simulation.miners.is_empty());
        assert!(config.consensus.base_reward > 0);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aurum-node.toml");

        let config = NodeConfig::default();
        config.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let restored: NodeConfig = toml::from_str(&content).unwrap();
        assert_eq!(restored.node_name, config.node_name);
        assert_eq!(
            restored.simulation.duration_secs,
            config.simulation.duration_secs
        );
        assert_eq!(restored.simulation.clients.len(), config.simulation.clients.len());
        assert_eq!(restored.consensus.base_reward, config.consensus.base_reward);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: NodeConfig = toml::from_str("node_name = \"testnet\"").unwrap();
        assert_eq!(config.node_name, "testnet");
        assert_eq!(config.consensus.base_reward, ConsensusParams::default().base_reward);
        assert!(!config.simulation.miners.is_empty());
    }
}
