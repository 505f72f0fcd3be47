use rsvelo_core::Networks;
use std::time::Duration;

/// Timing constants that differ between the dev, beta and live networks
#[derive(Clone, Debug)]
pub struct NetworkConstants {
    pub current_network: Networks,
    /// Interval of the active elections request loop
    pub aec_loop_interval: Duration,
    /// Minimum time between rebroadcasts of an election winner
    pub block_broadcast_interval: Duration,
    /// Minimum time between generating votes for an election
    pub vote_broadcast_interval: Duration,
    /// How long a confirmed election lingers before cleanup
    pub election_time_to_live: Duration,
    /// Percentage of online weight required for quorum
    pub online_weight_quorum: u8,
}

impl NetworkConstants {
    pub fn for_network(network: Networks) -> Self {
        match network {
            Networks::VeloDevNetwork => Self::dev(),
            _ => Self::live(network),
        }
    }

    pub fn dev() -> Self {
        Self {
            current_network: Networks::VeloDevNetwork,
            aec_loop_interval: Duration::from_millis(300),
            block_broadcast_interval: Duration::from_millis(500),
            vote_broadcast_interval: Duration::from_millis(500),
            election_time_to_live: Duration::ZERO,
            online_weight_quorum: 67,
        }
    }

    fn live(network: Networks) -> Self {
        Self {
            current_network: network,
            aec_loop_interval: Duration::from_millis(300),
            block_broadcast_interval: Duration::from_secs(15),
            vote_broadcast_interval: Duration::from_secs(1),
            election_time_to_live: Duration::from_secs(2),
            online_weight_quorum: 67,
        }
    }

    pub fn is_dev_network(&self) -> bool {
        self.current_network == Networks::VeloDevNetwork
    }
}
