use crate::{
    block_processing::{BacklogPopulation, BlockProcessor, BlockSource, UncheckedMap},
    cementation::ConfirmingSet,
    config::{NetworkConstants, NodeConfig, NodeFlags},
    consensus::{
        ActiveElections, ActiveElectionsExt, ElectionSchedulers, LocalVoteHistory,
        NullVoteGenerator, ProcessLiveDispatcher, VoteCache, VoteGenerator,
    },
    representatives::OnlineReps,
    stats::Stats,
    transport::{ChannelId, MessagePublisher, NullMessagePublisher},
    utils::ThreadPoolImpl,
};
use rsvelo_core::{utils::ContainerInfo, Block};
use rsvelo_ledger::Ledger;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Owns every subsystem of the consensus core and wires the observers between
/// them exactly once. All cross-component references are either downward
/// ownership or weak/callback back-references.
pub struct Node {
    pub config: NodeConfig,
    pub network_constants: NetworkConstants,
    pub flags: NodeFlags,
    pub stats: Arc<Stats>,
    pub ledger: Arc<Ledger>,
    pub unchecked: Arc<UncheckedMap>,
    pub block_processor: Arc<BlockProcessor>,
    pub confirming_set: Arc<ConfirmingSet>,
    pub online_reps: Arc<Mutex<OnlineReps>>,
    pub vote_cache: Arc<Mutex<VoteCache>>,
    pub history: Arc<LocalVoteHistory>,
    pub workers: Arc<ThreadPoolImpl>,
    pub active: Arc<ActiveElections>,
    pub schedulers: Arc<ElectionSchedulers>,
    pub backlog_population: Arc<BacklogPopulation>,
    process_live_dispatcher: Arc<ProcessLiveDispatcher>,
}

impl Node {
    pub fn new(
        config: NodeConfig,
        flags: NodeFlags,
        ledger: Arc<Ledger>,
        message_publisher: Arc<dyn MessagePublisher>,
        generator: Arc<dyn VoteGenerator>,
        final_generator: Arc<dyn VoteGenerator>,
    ) -> Arc<Self> {
        let network_constants = NetworkConstants::for_network(config.network);
        let stats = Arc::new(Stats::new());

        let unchecked = Arc::new(UncheckedMap::new(
            UncheckedMap::DEFAULT_MAX_ENTRIES,
            stats.clone(),
        ));

        let block_processor = Arc::new(BlockProcessor::new(
            config.block_processor.clone(),
            ledger.clone(),
            unchecked.clone(),
            stats.clone(),
        ));

        let confirming_set = Arc::new(ConfirmingSet::new(
            config.confirming_set.clone(),
            ledger.clone(),
            stats.clone(),
        ));

        let online_weight_minimum = if network_constants.is_dev_network() {
            rsvelo_core::Amount::raw(1)
        } else {
            rsvelo_core::Amount::vlo(60_000_000)
        };
        let online_reps = Arc::new(Mutex::new(OnlineReps::new(
            ledger.clone(),
            online_weight_minimum,
            network_constants.online_weight_quorum,
        )));

        let ledger_l = ledger.clone();
        let vote_cache = Arc::new(Mutex::new(VoteCache::new(
            config.vote_cache.clone(),
            Box::new(move |account| ledger_l.weight(account)),
        )));

        let history = Arc::new(LocalVoteHistory::new());
        let workers = Arc::new(ThreadPoolImpl::create(1, "Worker"));

        let active = Arc::new(ActiveElections::new(
            network_constants.clone(),
            online_reps.clone(),
            config.clone(),
            ledger.clone(),
            confirming_set.clone(),
            workers.clone(),
            history.clone(),
            block_processor.clone(),
            generator,
            final_generator,
            message_publisher,
            vote_cache.clone(),
            stats.clone(),
            flags.clone(),
        ));

        let schedulers = Arc::new(ElectionSchedulers::new(
            &config,
            active.clone(),
            ledger.clone(),
            stats.clone(),
            vote_cache.clone(),
            online_reps.clone(),
        ));

        let backlog_population = Arc::new(BacklogPopulation::new(
            config.backlog_population.clone(),
            ledger.clone(),
            stats.clone(),
        ));

        let process_live_dispatcher =
            Arc::new(ProcessLiveDispatcher::new(ledger.clone(), &schedulers));

        let node = Arc::new(Self {
            config,
            network_constants,
            flags,
            stats,
            ledger,
            unchecked,
            block_processor,
            confirming_set,
            online_reps,
            vote_cache,
            history,
            workers,
            active,
            schedulers,
            backlog_population,
            process_live_dispatcher,
        });

        node.initialize();
        node
    }

    pub fn new_test_instance() -> Arc<Self> {
        Self::new(
            NodeConfig::new_test_instance(),
            NodeFlags::new(),
            Arc::new(Ledger::new_test_instance()),
            Arc::new(NullMessagePublisher::new()),
            Arc::new(NullVoteGenerator::new()),
            Arc::new(NullVoteGenerator::new()),
        )
    }

    fn initialize(self: &Arc<Self>) {
        // Cementation events, already-cemented cleanup and fork publishing
        self.active.initialize();

        // Blocks that were parked for a missing dependency re-enter the processor
        let block_processor_w = Arc::downgrade(&self.block_processor);
        self.unchecked
            .set_satisfied_observer(Box::new(move |info| {
                if let Some(block_processor) = block_processor_w.upgrade() {
                    block_processor.add(
                        info.block.as_ref().clone(),
                        BlockSource::Unchecked,
                        ChannelId::LOOPBACK,
                    );
                }
            }));

        // Rolled back blocks lose their generated votes and their elections,
        // except for the block whose position is being replaced
        let history_w = Arc::downgrade(&self.history);
        let active_w = Arc::downgrade(&self.active);
        self.block_processor
            .set_blocks_rolled_back_callback(Box::new(move |rolled_back, initial_block| {
                let (Some(history), Some(active)) = (history_w.upgrade(), active_w.upgrade())
                else {
                    return;
                };
                for block in rolled_back {
                    history.erase(&block.root());
                    if block.qualified_root() != initial_block.qualified_root() {
                        active.erase(&block.qualified_root());
                    }
                }
            }));

        // Keep the pipeline going: cemented blocks activate their successors
        let ledger_w = Arc::downgrade(&self.ledger);
        let schedulers_w = Arc::downgrade(&self.schedulers);
        self.active
            .set_activate_successors_callback(Box::new(move |block| {
                let (Some(ledger), Some(schedulers)) = (ledger_w.upgrade(), schedulers_w.upgrade())
                else {
                    return;
                };
                let tx = ledger.read_txn();
                schedulers.activate_successors(&tx, block);
            }));

        // Live processing results feed the priority scheduler
        self.process_live_dispatcher.connect(&self.block_processor);

        // The backlog scan feeds both the priority and the optimistic scheduler
        let schedulers_w = Arc::downgrade(&self.schedulers);
        self.backlog_population
            .set_activate_callback(Box::new(move |tx, account, account_info, conf_info| {
                if let Some(schedulers) = schedulers_w.upgrade() {
                    schedulers.activate_backlog(tx, account, account_info, conf_info);
                }
            }));
    }

    pub fn start(self: &Arc<Self>) {
        info!(network = ?self.config.network, "Starting node");
        self.block_processor.start();
        self.confirming_set.start();
        self.active.start();
        self.schedulers.start();
        if !self.flags.disable_backlog_population {
            self.backlog_population.start();
        }
    }

    pub fn stop(&self) {
        info!("Stopping node");
        self.backlog_population.stop();
        self.schedulers.stop();
        self.active.stop();
        self.block_processor.stop();
        self.confirming_set.stop();
        self.workers.stop();
    }

    pub fn container_info(&self) -> ContainerInfo {
        ContainerInfo::builder()
            .node("active", self.active.container_info())
            .node("block_processor", self.block_processor.container_info())
            .node("confirming_set", self.confirming_set.container_info())
            .node("schedulers", self.schedulers.container_info())
            .node("unchecked", self.unchecked.container_info())
            .node("history", self.history.container_info())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{ElectionBehavior, ElectionState};
    use rsvelo_core::{
        Account, Amount, BlockBuilder, BlockEnum, BlockHash, KeyPair, Vote, VoteCode, VoteSource,
        DEV_GENESIS_KEY,
    };
    use std::time::{Duration, Instant};

    fn build_send(node: &Node, previous: BlockHash, destination: Account, amount: Amount) -> BlockEnum {
        let genesis_account = node.ledger.constants.genesis_account;
        let (representative, balance) = {
            let tx = node.ledger.read_txn();
            let info = node
                .ledger
                .get_account_info(&tx, &genesis_account)
                .unwrap();
            debug_assert_eq!(info.head, previous);
            (info.representative, info.balance)
        };
        BlockBuilder::state()
            .key(&DEV_GENESIS_KEY)
            .account(genesis_account)
            .previous(previous)
            .representative(representative)
            .balance(balance - amount)
            .link(destination)
            .build()
    }

    fn genesis_head(node: &Node) -> BlockHash {
        let tx = node.ledger.read_txn();
        node.ledger
            .get_account_info(&tx, &node.ledger.constants.genesis_account)
            .unwrap()
            .head
    }

    fn wait_for(mut predicate: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !predicate() {
            assert!(Instant::now() < deadline, "timed out waiting for condition");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn insert_creates_single_election_per_root() {
        let node = Node::new_test_instance();
        let send = Arc::new(build_send(
            &node,
            genesis_head(&node),
            Account::from(1000),
            Amount::raw(100),
        ));

        let (inserted, election) = node
            .active
            .insert(&send, ElectionBehavior::Priority, None);
        assert!(inserted);
        let election = election.unwrap();

        // A second insert for the same root returns the existing election
        let (inserted_again, existing) = node
            .active
            .insert(&send, ElectionBehavior::Priority, None);
        assert!(!inserted_again);
        assert_eq!(existing.unwrap().id, election.id);
        assert_eq!(node.active.len(), 1);

        node.stop();
    }

    #[test]
    fn fork_resolution_by_vote() {
        let node = Node::new_test_instance();
        node.start();

        let head = genesis_head(&node);
        let send1 = build_send(&node, head, Account::from(1000), Amount::raw(100));
        let send2 = build_send(&node, head, Account::from(2000), Amount::raw(200));

        // First block processes, the fork does not
        let result = node
            .block_processor
            .add_blocking(Arc::new(send1.clone()), BlockSource::Local)
            .unwrap();
        let saved1 = result.unwrap();

        // The live dispatcher may have already started this election; either way
        // there is exactly one election for the root
        let (_, election) = node
            .active
            .insert(&saved1, ElectionBehavior::Priority, None);
        let election = election.unwrap();

        let result = node
            .block_processor
            .add_blocking(Arc::new(send2.clone()), BlockSource::Local)
            .unwrap();
        assert_eq!(result.unwrap_err(), rsvelo_ledger::BlockStatus::Fork);

        // The forked block becomes a candidate in the existing election
        let send2 = Arc::new(send2);
        node.active.publish_block(&send2);
        assert!(election.contains(&send2.hash()));

        // A vote with quorum weight moves the election to confirmed with the fork as winner
        let vote = Arc::new(Vote::new_final(&DEV_GENESIS_KEY, vec![send2.hash()]));
        let results = node.active.vote(&vote, VoteSource::Live);
        assert_eq!(results.get(&send2.hash()), Some(&VoteCode::Vote));

        assert!(node.active.confirmed(&election));
        assert_eq!(election.winner_hash(), Some(send2.hash()));

        // The forced fork replaces the original block and gets cemented
        wait_for(|| {
            let tx = node.ledger.read_txn();
            node.ledger.block_confirmed(&tx, &send2.hash())
        });
        {
            let tx = node.ledger.read_txn();
            assert!(!node.ledger.block_exists(&tx, &send1.hash()));
            let info = node
                .ledger
                .get_account_info(&tx, &node.ledger.constants.genesis_account)
                .unwrap();
            assert_eq!(info.head, send2.hash());
        }

        node.stop();
    }

    #[test]
    fn recently_confirmed_suppresses_reelection() {
        let node = Node::new_test_instance();
        node.start();

        let send = Arc::new(build_send(
            &node,
            genesis_head(&node),
            Account::from(1000),
            Amount::raw(100),
        ));
        let saved = node
            .block_processor
            .add_blocking(send.clone(), BlockSource::Local)
            .unwrap()
            .unwrap();

        let (_, election) = node
            .active
            .insert(&saved, ElectionBehavior::Priority, None);
        let election = election.unwrap();
        node.active.force_confirm(&election);

        wait_for(|| {
            let tx = node.ledger.read_txn();
            node.ledger.block_confirmed(&tx, &send.hash())
        });
        wait_for(|| !node.active.active_root(&send.qualified_root()));

        // The root is recently confirmed, no new election is started
        let (inserted, election) = node
            .active
            .insert(&saved, ElectionBehavior::Priority, None);
        assert!(!inserted);
        assert!(election.is_none());
        assert!(node.active.was_recently_confirmed(&send.hash()));

        // The outcome is published into the confirmation history
        wait_for(|| !node.active.recently_cemented_list().is_empty());

        node.stop();
    }

    #[test]
    fn bucket_trim_cancels_worst_election() {
        let node = Node::new_test_instance();
        let bucket = Arc::new(crate::consensus::Bucket::new(
            Amount::zero(),
            node.config.priority_bucket.clone(),
            2, // max_per_bucket
            node.active.clone(),
            node.stats.clone(),
        ));

        // Three unrelated roots with priorities 10, 20 and 5
        let blocks: Vec<(u64, Arc<BlockEnum>)> = [(10, 1_u64), (20, 2), (5, 3)]
            .iter()
            .map(|&(time, seed)| {
                (
                    time,
                    Arc::new(BlockBuilder::state().key(&KeyPair::from(seed)).previous(0_u64).build()),
                )
            })
            .collect();

        use crate::consensus::BucketExt;
        for (time, block) in &blocks {
            assert!(bucket.push(*time, Arc::clone(block)));
        }
        while bucket.activate() {}
        assert_eq!(bucket.election_count(), 3);

        // Trim cancels the election with the worst priority (20)
        bucket.update();
        assert_eq!(bucket.election_count(), 2);
        assert!(!node
            .active
            .active_root(&blocks[1].1.qualified_root()));
        assert!(node.active.active_root(&blocks[0].1.qualified_root()));
        assert!(node.active.active_root(&blocks[2].1.qualified_root()));

        node.stop();
    }

    #[test]
    fn vote_for_unknown_hash_is_indeterminate_and_cached() {
        let node = Node::new_test_instance();
        let hash = BlockHash::from(12345);
        let vote = Arc::new(Vote::new(&DEV_GENESIS_KEY, 1, vec![hash]));

        let results = node.active.vote(&vote, VoteSource::Live);
        assert_eq!(results.get(&hash), Some(&VoteCode::Indeterminate));
        assert_eq!(node.vote_cache.lock().unwrap().find(&hash).len(), 1);

        node.stop();
    }

    #[test]
    fn election_expires_unconfirmed() {
        let node = Node::new_test_instance();
        let send = Arc::new(build_send(
            &node,
            genesis_head(&node),
            Account::from(1000),
            Amount::raw(100),
        ));
        let (_, election) = node
            .active
            .insert(&send, ElectionBehavior::Priority, None);
        let election = election.unwrap();

        // TTL not reached: the election is alive
        assert!(!election.failed());
        {
            let mut guard = election.mutex.lock().unwrap();
            let state = guard.state;
            guard
                .state_change(state, ElectionState::ExpiredUnconfirmed)
                .unwrap();
        }
        assert!(election.failed());

        node.stop();
    }
}
