use crate::block_processing::{BacklogPopulationConfig, BlockProcessorConfig};
use crate::cementation::ConfirmingSetConfig;
use crate::consensus::{
    ActiveElectionsConfig, HintedSchedulerConfig, OptimisticSchedulerConfig, PriorityBucketConfig,
    VoteCacheConfig,
};
use rsvelo_core::Networks;
use std::time::Duration;

#[derive(Clone)]
pub struct NodeConfig {
    pub network: Networks,
    pub enable_voting: bool,
    pub active_elections: ActiveElectionsConfig,
    pub block_processor: BlockProcessorConfig,
    pub confirming_set: ConfirmingSetConfig,
    pub priority_bucket: PriorityBucketConfig,
    pub hinted_scheduler: HintedSchedulerConfig,
    pub optimistic_scheduler: OptimisticSchedulerConfig,
    pub vote_cache: VoteCacheConfig,
    pub backlog_population: BacklogPopulationConfig,
    /// How long a blocking block submission waits for its result
    pub block_process_timeout: Duration,
}

impl NodeConfig {
    pub fn new(network: Networks) -> Self {
        Self {
            network,
            enable_voting: false,
            active_elections: ActiveElectionsConfig::default(),
            block_processor: BlockProcessorConfig::new_for(network),
            confirming_set: ConfirmingSetConfig::default(),
            priority_bucket: PriorityBucketConfig::default(),
            hinted_scheduler: HintedSchedulerConfig::default(),
            optimistic_scheduler: OptimisticSchedulerConfig::default(),
            vote_cache: VoteCacheConfig::default(),
            backlog_population: BacklogPopulationConfig::default(),
            block_process_timeout: Duration::from_secs(10),
        }
    }

    pub fn new_test_instance() -> Self {
        Self::new(Networks::VeloDevNetwork)
    }
}
