use super::{
    ConfirmationSolicitor, Election, ElectionBehavior, ElectionData, ElectionState, ElectionStatus,
    ElectionStatusType, EraseCallback, LocalVoteHistory, RecentlyCementedCache,
    RecentlyConfirmedCache, VoteCache, VoteGenerator, VoteInfo, NEXT_ELECTION_ID,
};
use crate::{
    block_processing::BlockProcessor,
    cementation::ConfirmingSet,
    config::{NetworkConstants, NodeConfig, NodeFlags},
    representatives::OnlineReps,
    stats::{DetailType, Sample, StatType, Stats},
    transport::MessagePublisher,
    utils::{ThreadPool, ThreadPoolImpl},
};
use rsvelo_core::{
    Account, Amount, Block, BlockEnum, BlockHash, QualifiedRoot, Vote, VoteCode, VoteSource,
    VoteWithWeightInfo,
};
use rsvelo_ledger::Ledger;
use std::{
    cmp::max,
    collections::{BTreeMap, HashMap},
    mem::size_of,
    sync::{atomic::Ordering, Arc, Condvar, Mutex, MutexGuard},
    thread::JoinHandle,
    time::{Duration, Instant},
};
use tracing::{debug, trace};

const ELECTION_MAX_BLOCKS: usize = 10;

pub type ElectionEndCallback = Box<
    dyn Fn(&ElectionStatus, &Vec<VoteWithWeightInfo>, Account, Amount, bool, bool) + Send + Sync,
>;

pub type AccountBalanceChangedCallback = Box<dyn Fn(&Account, bool) + Send + Sync>;

pub type ActivateSuccessorsCallback = Box<dyn Fn(&Arc<BlockEnum>) + Send + Sync>;

#[derive(Clone)]
pub struct ActiveElectionsConfig {
    /// Maximum number of simultaneous priority elections (AEC size)
    pub size: usize,
    /// Limit of hinted elections as percentage of `size`
    pub hinted_limit_percentage: usize,
    /// Limit of optimistic elections as percentage of `size`
    pub optimistic_limit_percentage: usize,
    /// Maximum confirmation history size
    pub confirmation_history_size: usize,
    /// Maximum cache size for recently confirmed roots
    pub confirmation_cache: usize,
    /// Elections over this limit in a bucket get trimmed by the cleanup loop
    pub max_per_bucket: usize,
}

impl Default for ActiveElectionsConfig {
    fn default() -> Self {
        Self {
            size: 5000,
            hinted_limit_percentage: 20,
            optimistic_limit_percentage: 10,
            confirmation_history_size: 2048,
            confirmation_cache: 65536,
            max_per_bucket: 64,
        }
    }
}

/// The set of live elections: admits new elections subject to per-behavior
/// caps, drives the periodic rebroadcast loop and bridges cementation events
/// back into scheduling
pub struct ActiveElections {
    pub mutex: Mutex<ActiveElectionsData>,
    pub condition: Condvar,
    network_constants: NetworkConstants,
    pub online_reps: Arc<Mutex<OnlineReps>>,
    pub election_winner_details: Mutex<HashMap<BlockHash, Arc<Election>>>,
    node_config: NodeConfig,
    config: ActiveElectionsConfig,
    ledger: Arc<Ledger>,
    confirming_set: Arc<ConfirmingSet>,
    workers: Arc<ThreadPoolImpl>,
    pub recently_confirmed: Arc<RecentlyConfirmedCache>,
    /// A block from an election might be confirmed but not yet cemented by the confirming set
    pub recently_cemented: Arc<RecentlyCementedCache>,
    history: Arc<LocalVoteHistory>,
    block_processor: Arc<BlockProcessor>,
    generator: Arc<dyn VoteGenerator>,
    final_generator: Arc<dyn VoteGenerator>,
    message_publisher: Arc<dyn MessagePublisher>,
    pub vacancy_update: Mutex<Box<dyn Fn() + Send + Sync>>,
    vote_cache: Arc<Mutex<VoteCache>>,
    stats: Arc<Stats>,
    active_started_observer: Mutex<Vec<Box<dyn Fn(BlockHash) + Send + Sync>>>,
    active_stopped_observer: Mutex<Vec<Box<dyn Fn(BlockHash) + Send + Sync>>>,
    activate_successors: Mutex<ActivateSuccessorsCallback>,
    election_end: Mutex<Vec<ElectionEndCallback>>,
    account_balance_changed: Mutex<AccountBalanceChangedCallback>,
    thread: Mutex<Option<JoinHandle<()>>>,
    flags: NodeFlags,
}

impl ActiveElections {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        network_constants: NetworkConstants,
        online_reps: Arc<Mutex<OnlineReps>>,
        node_config: NodeConfig,
        ledger: Arc<Ledger>,
        confirming_set: Arc<ConfirmingSet>,
        workers: Arc<ThreadPoolImpl>,
        history: Arc<LocalVoteHistory>,
        block_processor: Arc<BlockProcessor>,
        generator: Arc<dyn VoteGenerator>,
        final_generator: Arc<dyn VoteGenerator>,
        message_publisher: Arc<dyn MessagePublisher>,
        vote_cache: Arc<Mutex<VoteCache>>,
        stats: Arc<Stats>,
        flags: NodeFlags,
    ) -> Self {
        let config = node_config.active_elections.clone();
        Self {
            mutex: Mutex::new(ActiveElectionsData {
                roots: OrderedRoots::default(),
                stopped: false,
                manual_count: 0,
                priority_count: 0,
                hinted_count: 0,
                optimistic_count: 0,
                blocks: HashMap::new(),
            }),
            condition: Condvar::new(),
            network_constants,
            online_reps,
            election_winner_details: Mutex::new(HashMap::new()),
            ledger,
            confirming_set,
            workers,
            recently_confirmed: Arc::new(RecentlyConfirmedCache::new(config.confirmation_cache)),
            recently_cemented: Arc::new(RecentlyCementedCache::new(
                config.confirmation_history_size,
            )),
            config,
            node_config,
            history,
            block_processor,
            generator,
            final_generator,
            message_publisher,
            vacancy_update: Mutex::new(Box::new(|| {})),
            vote_cache,
            stats,
            active_started_observer: Mutex::new(Vec::new()),
            active_stopped_observer: Mutex::new(Vec::new()),
            activate_successors: Mutex::new(Box::new(|_block| {})),
            election_end: Mutex::new(Vec::new()),
            account_balance_changed: Mutex::new(Box::new(|_account, _pending| {})),
            thread: Mutex::new(None),
            flags,
        }
    }

    pub fn len(&self) -> usize {
        self.mutex.lock().unwrap().roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /*
     * Callbacks
     */
    pub fn add_election_end_callback(&self, callback: ElectionEndCallback) {
        self.election_end.lock().unwrap().push(callback);
    }

    pub fn add_active_started_callback(&self, callback: Box<dyn Fn(BlockHash) + Send + Sync>) {
        self.active_started_observer.lock().unwrap().push(callback);
    }

    pub fn add_active_stopped_callback(&self, callback: Box<dyn Fn(BlockHash) + Send + Sync>) {
        self.active_stopped_observer.lock().unwrap().push(callback);
    }

    pub fn set_account_balance_changed_callback(&self, callback: AccountBalanceChangedCallback) {
        *self.account_balance_changed.lock().unwrap() = callback;
    }

    pub fn set_activate_successors_callback(&self, callback: ActivateSuccessorsCallback) {
        *self.activate_successors.lock().unwrap() = callback;
    }

    pub fn was_recently_confirmed(&self, hash: &BlockHash) -> bool {
        self.recently_confirmed.hash_exists(hash)
    }

    pub fn recently_cemented_list(&self) -> Vec<ElectionStatus> {
        self.recently_cemented.list()
    }

    pub fn add_election_winner_details(&self, hash: BlockHash, election: Arc<Election>) {
        self.election_winner_details
            .lock()
            .unwrap()
            .insert(hash, election);
    }

    pub fn remove_election_winner_details(&self, hash: &BlockHash) -> Option<Arc<Election>> {
        self.election_winner_details.lock().unwrap().remove(hash)
    }

    pub fn election_winner_details_len(&self) -> usize {
        self.election_winner_details.lock().unwrap().len()
    }

    pub fn winner(&self, hash: &BlockHash) -> Option<Arc<BlockEnum>> {
        let guard = self.mutex.lock().unwrap();
        guard
            .blocks
            .get(hash)
            .and_then(|election| election.mutex.lock().unwrap().status.winner.clone())
    }

    pub fn election(&self, root: &QualifiedRoot) -> Option<Arc<Election>> {
        let guard = self.mutex.lock().unwrap();
        guard.roots.get(root).cloned()
    }

    pub fn active_root(&self, root: &QualifiedRoot) -> bool {
        let guard = self.mutex.lock().unwrap();
        guard.roots.get(root).is_some()
    }

    pub fn active_block(&self, hash: &BlockHash) -> bool {
        let guard = self.mutex.lock().unwrap();
        guard.blocks.contains_key(hash)
    }

    pub fn active(&self, block: &BlockEnum) -> bool {
        let guard = self.mutex.lock().unwrap();
        guard.blocks.contains_key(&block.hash())
            && guard.roots.get(&block.qualified_root()).is_some()
    }

    /// Registers a candidate hash with the vote routing index
    pub fn connect(&self, hash: BlockHash, election: Arc<Election>) {
        self.mutex.lock().unwrap().blocks.insert(hash, election);
    }

    /// Removes all of the election's candidate hashes from the vote routing index
    pub fn disconnect(&self, election: &Election) {
        let hashes: Vec<BlockHash> = election
            .mutex
            .lock()
            .unwrap()
            .last_blocks
            .keys()
            .copied()
            .collect();
        let mut guard = self.mutex.lock().unwrap();
        for hash in hashes {
            guard.blocks.remove(&hash);
        }
    }

    /// Maximum number of elections that should be present in this container
    /// NOTE: This is only a soft limit, it is possible for this container to exceed this count
    pub fn limit(&self, behavior: ElectionBehavior) -> usize {
        match behavior {
            ElectionBehavior::Manual => usize::MAX,
            ElectionBehavior::Priority => self.config.size,
            ElectionBehavior::Hinted => {
                self.config.hinted_limit_percentage * self.config.size / 100
            }
            ElectionBehavior::Optimistic => {
                self.config.optimistic_limit_percentage * self.config.size / 100
            }
        }
    }

    /// How many election slots are available for the specified election type
    pub fn vacancy(&self, behavior: ElectionBehavior) -> i64 {
        let guard = self.mutex.lock().unwrap();
        match behavior {
            ElectionBehavior::Manual => i64::MAX,
            ElectionBehavior::Priority => {
                self.limit(ElectionBehavior::Priority) as i64 - guard.roots.len() as i64
            }
            ElectionBehavior::Hinted | ElectionBehavior::Optimistic => {
                self.limit(behavior) as i64 - guard.count_by_behavior(behavior) as i64
            }
        }
    }

    pub fn clear(&self) {
        {
            let mut guard = self.mutex.lock().unwrap();
            guard.blocks.clear();
            guard.roots.clear();
        }
        (self.vacancy_update.lock().unwrap())()
    }

    pub fn confirmed_locked(&self, guard: &MutexGuard<ElectionData>) -> bool {
        matches!(
            guard.state,
            ElectionState::Confirmed | ElectionState::ExpiredConfirmed
        )
    }

    pub fn confirmed(&self, election: &Election) -> bool {
        let guard = election.mutex.lock().unwrap();
        self.confirmed_locked(&guard)
    }

    /// Calculates the aggregated vote weight per candidate block
    pub fn tally_impl(
        &self,
        guard: &mut MutexGuard<ElectionData>,
    ) -> BTreeMap<TallyKey, Arc<BlockEnum>> {
        let mut block_weights: HashMap<BlockHash, Amount> = HashMap::new();
        let mut final_weights: HashMap<BlockHash, Amount> = HashMap::new();
        for (account, info) in &guard.last_votes {
            let rep_weight = self.ledger.weight(account);
            *block_weights.entry(info.hash).or_default() += rep_weight;
            if info.timestamp == Vote::TIMESTAMP_MAX {
                *final_weights.entry(info.hash).or_default() += rep_weight;
            }
        }
        guard.last_tally.clear();
        for (&hash, &weight) in &block_weights {
            guard.last_tally.insert(hash, weight);
        }
        let mut result = BTreeMap::new();
        for (hash, weight) in &block_weights {
            if let Some(block) = guard.last_blocks.get(hash) {
                result.insert(TallyKey(*weight, *hash), Arc::clone(block));
            }
        }
        // Calculate final vote sum for the winner
        if !final_weights.is_empty() && !result.is_empty() {
            let winner_hash = result.first_key_value().unwrap().1.hash();
            if let Some(final_weight) = final_weights.get(&winner_hash) {
                guard.final_weight = *final_weight;
            }
        }
        result
    }

    /// Quorum is reached when the winner margin over the runner-up exceeds the delta
    pub fn have_quorum(&self, tally: &BTreeMap<TallyKey, Arc<BlockEnum>>) -> bool {
        let mut it = tally.keys();
        let first = it.next().map(|i| i.amount()).unwrap_or_default();
        let second = it.next().map(|i| i.amount()).unwrap_or_default();
        let delta = self.online_reps.lock().unwrap().delta();
        first - second >= delta
    }

    /// Calculates minimum time delay between subsequent votes when processing non-final votes
    pub fn cooldown_time(&self, weight: Amount) -> Duration {
        let online_stake = { self.online_reps.lock().unwrap().trended() };
        if weight > online_stake / 20 {
            // Reps with more than 5% weight
            Duration::from_secs(1)
        } else if weight > online_stake / 100 {
            // Reps with more than 1% weight
            Duration::from_secs(5)
        } else {
            // The rest of smaller reps
            Duration::from_secs(15)
        }
    }

    pub fn remove_block(&self, election_guard: &mut MutexGuard<ElectionData>, hash: &BlockHash) {
        if election_guard.status.winner.as_ref().unwrap().hash() != *hash {
            if let Some(existing) = election_guard.last_blocks.remove(hash) {
                election_guard.last_votes.retain(|_, v| v.hash != *hash);
                self.message_publisher.clear_filter(&existing);
            }
        }
    }

    pub fn remove_votes(
        &self,
        election: &Election,
        guard: &mut MutexGuard<ElectionData>,
        hash: &BlockHash,
    ) {
        if self.node_config.enable_voting {
            // Remove votes from election
            let list_generated_votes = self.history.votes(&election.root, hash, false);
            for vote in list_generated_votes {
                guard.last_votes.remove(&vote.voting_account);
            }
            // Clear votes cache
            self.history.erase(&election.root);
        }
    }

    fn replace_by_weight<'a>(
        &self,
        election: &'a Election,
        mut election_guard: MutexGuard<'a, ElectionData>,
        hash: &BlockHash,
    ) -> (bool, MutexGuard<'a, ElectionData>) {
        let mut replaced_block = BlockHash::zero();
        let winner_hash = election_guard.status.winner.as_ref().unwrap().hash();
        // Sort existing blocks tally
        let mut sorted: Vec<_> = election_guard
            .last_tally
            .iter()
            .map(|(hash, amount)| (*hash, *amount))
            .collect();
        drop(election_guard);

        // Sort in descending order
        sorted.sort_by(|left, right| right.1.cmp(&left.1));

        let votes_tally = |votes: &[Arc<Vote>]| {
            let mut result = Amount::zero();
            for vote in votes {
                result += self.ledger.weight(&vote.voting_account);
            }
            result
        };

        // Replace if the lowest tally is below the inactive cache weight of the new block
        let inactive_existing = self.vote_cache.lock().unwrap().find(hash);
        let inactive_tally = votes_tally(&inactive_existing);
        if inactive_tally > Amount::zero() && sorted.len() < ELECTION_MAX_BLOCKS {
            // If count of tally items is less than 10, remove any block without tally
            election_guard = election.mutex.lock().unwrap();
            for (hash, _) in &election_guard.last_blocks {
                if sorted.iter().all(|(h, _)| h != hash) && *hash != winner_hash {
                    replaced_block = *hash;
                    break;
                }
            }
        } else if inactive_tally > Amount::zero() && inactive_tally > sorted.last().unwrap().1 {
            if sorted.last().unwrap().0 != winner_hash {
                replaced_block = sorted.last().unwrap().0;
            } else if inactive_tally > sorted[sorted.len() - 2].1 {
                // Avoid removing the winner
                replaced_block = sorted[sorted.len() - 2].0;
            }
        }

        let mut replaced = false;
        if !replaced_block.is_zero() {
            self.mutex.lock().unwrap().blocks.remove(&replaced_block);
            election_guard = election.mutex.lock().unwrap();
            self.remove_block(&mut election_guard, &replaced_block);
            replaced = true;
        } else {
            election_guard = election.mutex.lock().unwrap();
        }
        (replaced, election_guard)
    }

    /// Fork-candidate handling: add `block` as an alternative candidate
    pub fn publish(&self, block: &Arc<BlockEnum>, election: &Election) -> bool {
        let mut election_guard = election.mutex.lock().unwrap();

        // Do not insert new blocks if already confirmed
        let mut result = self.confirmed_locked(&election_guard);
        if !result
            && election_guard.last_blocks.len() >= ELECTION_MAX_BLOCKS
            && !election_guard.last_blocks.contains_key(&block.hash())
        {
            let (replaced, guard) = self.replace_by_weight(election, election_guard, &block.hash());
            election_guard = guard;
            if !replaced {
                result = true;
                self.message_publisher.clear_filter(block);
            }
        }
        if !result {
            if election_guard.last_blocks.contains_key(&block.hash()) {
                result = true;
                election_guard
                    .last_blocks
                    .insert(block.hash(), Arc::clone(block));
                if election_guard.status.winner.as_ref().unwrap().hash() == block.hash() {
                    election_guard.status.winner = Some(Arc::clone(block));
                    self.message_publisher.flood_block(block);
                }
            } else {
                election_guard
                    .last_blocks
                    .insert(block.hash(), Arc::clone(block));
            }
        }
        /*
        Result is true if:
        1) election is confirmed or expired
        2) given election contains 10 blocks & new block didn't receive enough votes to replace existing blocks
        3) given block is already in the election & the election contains less than 10 blocks (replacing block content with new)
        */
        result
    }

    /// Broadcasts a vote for the current winner of this election
    pub fn broadcast_vote(
        &self,
        election: &Election,
        election_guard: &mut MutexGuard<ElectionData>,
    ) {
        if election_guard.last_vote_elapsed() >= self.network_constants.vote_broadcast_interval {
            self.broadcast_vote_locked(election_guard, election);
        }
    }

    /// Broadcast a vote for the current election winner. Generates a final vote
    /// if quorum was reached or the election is already confirmed.
    fn broadcast_vote_locked(
        &self,
        election_guard: &mut MutexGuard<ElectionData>,
        election: &Election,
    ) {
        if election_guard.last_vote_elapsed() < self.network_constants.vote_broadcast_interval {
            return;
        }
        election_guard.set_last_vote();
        if self.node_config.enable_voting {
            self.stats.inc(StatType::Election, DetailType::BroadcastVote);

            let winner = election_guard.status.winner.as_ref().unwrap().hash();
            if self.confirmed_locked(election_guard)
                || self.have_quorum(&self.tally_impl(election_guard))
            {
                self.stats
                    .inc(StatType::Election, DetailType::BroadcastVoteFinal);
                trace!(qualified_root = ?election.qualified_root, %winner, "type" = "final", "broadcast vote");
                self.final_generator.add(&election.root, &winner);
            } else {
                self.stats
                    .inc(StatType::Election, DetailType::BroadcastVoteNormal);
                trace!(qualified_root = ?election.qualified_root, %winner, "type" = "normal", "broadcast vote");
                self.generator.add(&election.root, &winner);
            }
        }
    }

    fn broadcast_block(
        &self,
        solicitor: &mut ConfirmationSolicitor,
        election: &Election,
        election_guard: &mut MutexGuard<ElectionData>,
    ) {
        if self.broadcast_block_predicate(election, election_guard) {
            if solicitor.broadcast(election_guard).is_ok() {
                let last_block_hash = election_guard.last_block_hash;
                self.stats.inc(
                    StatType::Election,
                    if last_block_hash.is_zero() {
                        DetailType::BroadcastBlockInitial
                    } else {
                        DetailType::BroadcastBlockRepeat
                    },
                );
                election.set_last_block();
                election_guard.last_block_hash =
                    election_guard.status.winner.as_ref().unwrap().hash();
            }
        }
    }

    /// Minimum time between broadcasts of the current winner of an election, as a backup to requesting confirmations
    fn base_latency(&self) -> Duration {
        if self.network_constants.is_dev_network() {
            Duration::from_millis(25)
        } else {
            Duration::from_millis(1000)
        }
    }

    /// Calculates the time delay between broadcasting confirmation requests
    fn confirm_req_time(&self, election: &Election) -> Duration {
        match election.behavior {
            ElectionBehavior::Manual | ElectionBehavior::Priority | ElectionBehavior::Hinted => {
                self.base_latency() * 5
            }
            ElectionBehavior::Optimistic => self.base_latency() * 2,
        }
    }

    fn broadcast_block_predicate(
        &self,
        election: &Election,
        election_guard: &MutexGuard<ElectionData>,
    ) -> bool {
        // Broadcast the block if enough time has passed since the last broadcast (or it's the first broadcast)
        if election.last_block_elapsed() >= self.network_constants.block_broadcast_interval {
            true
        }
        // Or the current election winner has changed
        else if election_guard.status.winner.as_ref().unwrap().hash()
            != election_guard.last_block_hash
        {
            true
        } else {
            false
        }
    }

    /// Erase all blocks from active and, if not confirmed, clear digests from network filters
    pub fn cleanup_election<'a>(
        &self,
        mut guard: MutexGuard<'a, ActiveElectionsData>,
        election: &'a Arc<Election>,
    ) {
        // Keep track of the election count by election type
        debug_assert!(guard.count_by_behavior(election.behavior) > 0);
        *guard.count_by_behavior_mut(election.behavior) -= 1;

        let election_winner: BlockHash;
        let election_state;
        let blocks;
        {
            let election_guard = election.mutex.lock().unwrap();
            blocks = election_guard.last_blocks.clone();
            election_winner = election_guard.status.winner.as_ref().unwrap().hash();
            election_state = election_guard.state;
        }

        for hash in blocks.keys() {
            let erased = guard.blocks.remove(hash);
            debug_assert!(erased.is_some());
        }

        guard.roots.erase(&election.qualified_root);

        self.stats
            .inc(self.completion_type(election), election.behavior.into());
        trace!(election = ?election, "active stopped");

        debug!(
            "Erased election for blocks: {} (behavior: {:?}, state: {:?})",
            blocks
                .keys()
                .map(|k| k.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            election.behavior,
            election_state
        );

        drop(guard);

        self.stats.sample(
            Sample::ActiveElectionDuration,
            (0, 1000 * 60 * 10), // 0-10 minutes range
            election.duration().as_millis() as i64,
        );

        (self.vacancy_update.lock().unwrap())();

        if let Some(callback) = &election.erased_callback {
            callback(&election.qualified_root);
        }

        for (hash, block) in blocks {
            // Notify observers about dropped elections & blocks lost confirmed elections
            if !self.confirmed(election) || hash != election_winner {
                let callbacks = self.active_stopped_observer.lock().unwrap();
                for callback in callbacks.iter() {
                    (callback)(hash);
                }
            }

            if !self.confirmed(election) {
                self.message_publisher.clear_filter(&block);
            }
        }
    }

    fn completion_type(&self, election: &Election) -> StatType {
        if self.confirmed(election) {
            StatType::ActiveConfirmed
        } else if election.failed() {
            StatType::ActiveTimeout
        } else {
            StatType::ActiveDropped
        }
    }

    pub fn erase_oldest(&self) {
        let guard = self.mutex.lock().unwrap();
        let mut it = guard.roots.iter_sequenced();
        if let Some((_, election)) = it.next() {
            let election = Arc::clone(election);
            drop(it);
            self.cleanup_election(guard, &election)
        }
    }

    /// Erase elections if we're over capacity
    pub fn trim(&self) {
        /*
         * Both priority and hinted election schedulers are well-behaved, meaning they first check for AEC vacancy before inserting new elections.
         * However, it is possible that the AEC will be temporarily overfilled in case it's running at full capacity and election hinting or the manual queue kicks in.
         * That case will lead to unwanted churning of elections, so this allows the AEC to be overfilled to 125% until erasing of elections happens.
         */
        while self.vacancy(ElectionBehavior::Priority)
            < -(self.limit(ElectionBehavior::Priority) as i64 / 4)
        {
            self.stats.inc(StatType::Active, DetailType::EraseOldest);
            self.erase_oldest();
        }
    }

    pub fn erase(&self, root: &QualifiedRoot) -> bool {
        let guard = self.mutex.lock().unwrap();
        if let Some(election) = guard.roots.get(root) {
            let election = Arc::clone(election);
            self.cleanup_election(guard, &election);
            true
        } else {
            false
        }
    }

    /// Cancel an election externally, e.g. when a bucket trims its worst election
    pub fn cancel_election(&self, election: &Arc<Election>) {
        {
            let mut election_guard = election.mutex.lock().unwrap();
            let state = election_guard.state;
            if election_guard
                .state_change(state, ElectionState::Cancelled)
                .is_ok()
            {
                election_guard.status.election_status_type = ElectionStatusType::Stopped;
                self.stats.inc(StatType::Active, DetailType::Cancelled);
            }
        }
        // Erase even when the election reached a terminal state already, so that
        // callers waiting for a bucket slot always make progress
        self.erase(&election.qualified_root);
    }

    // Returns a list of elections sorted by start order
    pub fn list_active(&self, max: usize) -> Vec<Arc<Election>> {
        self.mutex
            .lock()
            .unwrap()
            .roots
            .iter_sequenced()
            .map(|(_, election)| Arc::clone(election))
            .take(max)
            .collect()
    }

    fn list_active_impl(
        max: usize,
        guard: &MutexGuard<ActiveElectionsData>,
    ) -> Vec<Arc<Election>> {
        guard
            .roots
            .iter_sequenced()
            .map(|(_, election)| Arc::clone(election))
            .take(max)
            .collect()
    }

    pub fn request_loop(&self) {
        let mut guard = self.mutex.lock().unwrap();
        while !guard.stopped {
            let stamp = Instant::now();
            self.stats.inc(StatType::Active, DetailType::Loop);
            guard = self.request_confirm(guard);
            guard = self.request_loop_wait(stamp, guard);
        }
    }

    fn request_loop_wait<'a>(
        &self,
        stamp: Instant,
        guard: MutexGuard<'a, ActiveElectionsData>,
    ) -> MutexGuard<'a, ActiveElectionsData> {
        if !guard.stopped {
            let loop_interval = self.network_constants.aec_loop_interval;
            let min_sleep = loop_interval / 2;

            let wait_duration = max(
                min_sleep,
                (stamp + loop_interval).saturating_duration_since(Instant::now()),
            );

            self.condition
                .wait_timeout_while(guard, wait_duration, |data| !data.stopped)
                .unwrap()
                .0
        } else {
            guard
        }
    }

    fn request_confirm<'a>(
        &'a self,
        guard: MutexGuard<'a, ActiveElectionsData>,
    ) -> MutexGuard<'a, ActiveElectionsData> {
        let this_loop_target = guard.roots.len();
        let elections = Self::list_active_impl(this_loop_target, &guard);
        drop(guard);

        let mut solicitor =
            ConfirmationSolicitor::new(&self.network_constants, self.message_publisher.as_ref());
        solicitor.prepare(
            &self
                .online_reps
                .lock()
                .unwrap()
                .principal_representatives(),
        );

        /*
         * Loop through active elections in insertion order, requesting confirmation
         *
         * Only up to a certain amount of elections are queued for confirmation request and block rebroadcasting. The remaining elections can still be confirmed if votes arrive
         * Elections extending the soft config.size limit are flushed after a certain time-to-live cutoff
         * Flushed elections are later re-activated via frontier confirmation
         */
        for election in elections {
            let confirmed = self.confirmed(&election);
            if confirmed || self.transition_time(&mut solicitor, &election) {
                self.erase(&election.qualified_root);
            }
        }

        solicitor.flush();
        self.mutex.lock().unwrap()
    }

    /// Drives one election through its periodic transitions.
    /// Returns true when the election should be erased.
    fn transition_time(
        &self,
        solicitor: &mut ConfirmationSolicitor,
        election: &Arc<Election>,
    ) -> bool {
        let mut guard = election.mutex.lock().unwrap();
        let mut result = false;
        match guard.state {
            ElectionState::Passive => {
                if self.base_latency() * Election::PASSIVE_DURATION_FACTOR
                    < election.election_start.elapsed()
                {
                    guard
                        .state_change(ElectionState::Passive, ElectionState::Active)
                        .unwrap();
                }
            }
            ElectionState::Active => {
                self.broadcast_vote(election, &mut guard);
                self.broadcast_block(solicitor, election, &mut guard);
                self.send_confirm_req(solicitor, election, &guard);
            }
            ElectionState::Confirmed => {
                result = true; // Return true to indicate this election should be cleaned up
                self.broadcast_block(solicitor, election, &mut guard); // Ensure election winner is broadcasted
                guard
                    .state_change(ElectionState::Confirmed, ElectionState::ExpiredConfirmed)
                    .unwrap();
            }
            ElectionState::Cancelled => {
                return true; // Clean up cancelled elections immediately
            }
            ElectionState::ExpiredConfirmed | ElectionState::ExpiredUnconfirmed => {
                unreachable!()
            }
        }

        if !self.confirmed_locked(&guard)
            && election.time_to_live() < election.election_start.elapsed()
        {
            // It is possible the election confirmed while acquiring the mutex
            // state_change returning Err would indicate it
            let state = guard.state;
            if guard
                .state_change(state, ElectionState::ExpiredUnconfirmed)
                .is_ok()
            {
                trace!(qualified_root = ?election.qualified_root, "election expired");
                self.stats.inc(StatType::Election, DetailType::Expired);
                result = true; // Return true to indicate this election should be cleaned up
                guard.status.election_status_type = ElectionStatusType::Stopped;
            }
        }

        result
    }

    fn send_confirm_req(
        &self,
        solicitor: &mut ConfirmationSolicitor,
        election: &Election,
        election_guard: &MutexGuard<ElectionData>,
    ) {
        if self.confirm_req_time(election) < election.last_req_elapsed() {
            if !solicitor.add(election.root, election_guard) {
                election.set_last_req();
                election
                    .confirmation_request_count
                    .fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    pub fn votes_with_weight(&self, election: &Election) -> Vec<VoteWithWeightInfo> {
        let mut sorted_votes: BTreeMap<TallyKey, Vec<VoteWithWeightInfo>> = BTreeMap::new();
        let guard = election.mutex.lock().unwrap();
        for (&representative, info) in &guard.last_votes {
            let weight = self.ledger.weight(&representative);
            let vote_with_weight = VoteWithWeightInfo {
                representative,
                time: info.time,
                timestamp: info.timestamp,
                hash: info.hash,
                weight,
            };
            sorted_votes
                .entry(TallyKey(weight, info.hash))
                .or_default()
                .push(vote_with_weight);
        }
        sorted_votes
            .values_mut()
            .flat_map(std::mem::take)
            .collect()
    }

    pub fn notify_observers(
        &self,
        status: &ElectionStatus,
        votes: &Vec<VoteWithWeightInfo>,
    ) {
        let block = status.winner.as_ref().unwrap();
        let account = block.account();
        let tx = self.ledger.read_txn();
        let amount = self
            .ledger
            .block_amount(&tx, &block.hash())
            .unwrap_or_default();
        let is_state_send = block.block_type() == rsvelo_core::BlockType::State && block.is_send();
        let is_state_epoch =
            block.block_type() == rsvelo_core::BlockType::State && block.is_epoch();

        {
            let ended_callbacks = self.election_end.lock().unwrap();
            for callback in ended_callbacks.iter() {
                (callback)(
                    status,
                    votes,
                    account,
                    amount,
                    is_state_send,
                    is_state_epoch,
                );
            }
        }

        if amount > Amount::zero() {
            let balance_changed = self.account_balance_changed.lock().unwrap();
            (balance_changed)(&account, false);
            if block.is_send() {
                (balance_changed)(&block.destination().unwrap(), true);
            }
        }
    }

    pub fn container_info(&self) -> rsvelo_core::utils::ContainerInfo {
        let guard = self.mutex.lock().unwrap();
        rsvelo_core::utils::ContainerInfo::builder()
            .leaf("roots", guard.roots.len(), OrderedRoots::ELEMENT_SIZE)
            .leaf(
                "blocks",
                guard.blocks.len(),
                size_of::<BlockHash>() + size_of::<Arc<Election>>(),
            )
            .leaf(
                "election_winner_details",
                self.election_winner_details.lock().unwrap().len(),
                size_of::<BlockHash>() + size_of::<Arc<Election>>(),
            )
            .leaf(
                "manual",
                guard.count_by_behavior(ElectionBehavior::Manual),
                0,
            )
            .leaf(
                "priority",
                guard.count_by_behavior(ElectionBehavior::Priority),
                0,
            )
            .leaf(
                "hinted",
                guard.count_by_behavior(ElectionBehavior::Hinted),
                0,
            )
            .leaf(
                "optimistic",
                guard.count_by_behavior(ElectionBehavior::Optimistic),
                0,
            )
            .node(
                "recently_confirmed",
                self.recently_confirmed.container_info(),
            )
            .node("recently_cemented", self.recently_cemented.container_info())
            .finish()
    }
}

impl Drop for ActiveElections {
    fn drop(&mut self) {
        // Thread must be stopped before destruction
        debug_assert!(self.thread.lock().unwrap().is_none());
    }
}

/// Key for tally maps: orders by amount descending, ties by ascending hash so
/// the winner is deterministic
#[derive(PartialEq, Eq)]
pub struct TallyKey(pub Amount, pub BlockHash);

impl TallyKey {
    pub fn amount(&self) -> Amount {
        self.0
    }
}

impl Ord for TallyKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.0.cmp(&self.0).then(self.1.cmp(&other.1))
    }
}

impl PartialOrd for TallyKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

pub struct ActiveElectionsData {
    pub roots: OrderedRoots,
    pub stopped: bool,
    pub manual_count: usize,
    pub priority_count: usize,
    pub hinted_count: usize,
    pub optimistic_count: usize,
    pub blocks: HashMap<BlockHash, Arc<Election>>,
}

impl ActiveElectionsData {
    pub fn count_by_behavior(&self, behavior: ElectionBehavior) -> usize {
        match behavior {
            ElectionBehavior::Manual => self.manual_count,
            ElectionBehavior::Priority => self.priority_count,
            ElectionBehavior::Hinted => self.hinted_count,
            ElectionBehavior::Optimistic => self.optimistic_count,
        }
    }

    pub fn count_by_behavior_mut(&mut self, behavior: ElectionBehavior) -> &mut usize {
        match behavior {
            ElectionBehavior::Manual => &mut self.manual_count,
            ElectionBehavior::Priority => &mut self.priority_count,
            ElectionBehavior::Hinted => &mut self.hinted_count,
            ElectionBehavior::Optimistic => &mut self.optimistic_count,
        }
    }
}

#[derive(Default)]
pub struct OrderedRoots {
    by_root: HashMap<QualifiedRoot, Arc<Election>>,
    sequenced: Vec<QualifiedRoot>,
}

impl OrderedRoots {
    pub const ELEMENT_SIZE: usize = size_of::<QualifiedRoot>() * 2 + size_of::<Arc<Election>>();

    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&mut self, root: QualifiedRoot, election: Arc<Election>) {
        if self.by_root.insert(root, election).is_none() {
            self.sequenced.push(root);
        }
    }

    pub fn get(&self, root: &QualifiedRoot) -> Option<&Arc<Election>> {
        self.by_root.get(root)
    }

    pub fn erase(&mut self, root: &QualifiedRoot) {
        if self.by_root.remove(root).is_some() {
            self.sequenced.retain(|x| x != root)
        }
    }

    pub fn clear(&mut self) {
        self.sequenced.clear();
        self.by_root.clear();
    }

    pub fn len(&self) -> usize {
        self.sequenced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter_sequenced(&self) -> impl Iterator<Item = (&QualifiedRoot, &Arc<Election>)> {
        self.sequenced
            .iter()
            .map(|r| (r, self.by_root.get(r).unwrap()))
    }
}

pub trait ActiveElectionsExt {
    fn initialize(&self);
    fn start(&self);
    fn stop(&self);
    /// Confirm this block if quorum is met
    fn confirm_if_quorum(&self, election_lock: MutexGuard<ElectionData>, election: &Arc<Election>);
    fn confirm_once(&self, election_lock: MutexGuard<ElectionData>, election: &Arc<Election>);
    fn process_confirmed(&self, status: ElectionStatus, iteration: u64);
    fn force_confirm(&self, election: &Arc<Election>);
    fn try_confirm(&self, election: &Arc<Election>, hash: &BlockHash);
    /// Validate a vote and apply it to the current elections, distinguishing replays
    fn vote(&self, vote: &Arc<Vote>, source: VoteSource) -> HashMap<BlockHash, VoteCode>;
    fn vote_single(
        &self,
        election: &Arc<Election>,
        rep: &Account,
        timestamp: u64,
        block_hash: &BlockHash,
        vote_source: VoteSource,
    ) -> VoteCode;
    fn block_cemented_callback(&self, block: &Arc<BlockEnum>);
    fn trigger_vote_cache(&self, hash: &BlockHash) -> bool;
    fn publish_block(&self, block: &Arc<BlockEnum>) -> bool;
    fn insert(
        &self,
        block: &Arc<BlockEnum>,
        behavior: ElectionBehavior,
        erase_callback: Option<EraseCallback>,
    ) -> (bool, Option<Arc<Election>>);
}

impl ActiveElectionsExt for Arc<ActiveElections> {
    fn initialize(&self) {
        let self_w = Arc::downgrade(self);
        // Register a callback which will get called after a block is cemented
        self.confirming_set
            .add_cemented_observer(Box::new(move |block| {
                if let Some(active) = self_w.upgrade() {
                    active.block_cemented_callback(block);
                }
            }));

        let self_w = Arc::downgrade(self);
        // Register a callback which will get called if a block is already cemented
        self.confirming_set
            .add_already_cemented_observer(Box::new(move |hash| {
                if let Some(active) = self_w.upgrade() {
                    // Depending on timing there is a situation where the election_winner_details is not reset.
                    // This can happen when a block wins an election, and the block is confirmed + observer
                    // called before the block hash gets added to election_winner_details. If the block is confirmed
                    // callbacks have already been done, so we can safely just remove it.
                    active.remove_election_winner_details(&hash);
                }
            }));

        let self_w = Arc::downgrade(self);
        // Notify elections about alternative (forked) blocks
        self.block_processor
            .add_block_processed_observer(Box::new(move |status, context| {
                if matches!(status, rsvelo_ledger::BlockStatus::Fork) {
                    if let Some(active) = self_w.upgrade() {
                        let block = Arc::new(context.block.lock().unwrap().clone());
                        active.publish_block(&block);
                    }
                }
            }));
    }

    fn start(&self) {
        if self.flags.disable_request_loop {
            return;
        }

        let mut guard = self.thread.lock().unwrap();
        let self_l = Arc::clone(self);
        debug_assert!(guard.is_none());
        *guard = Some(
            std::thread::Builder::new()
                .name("Request loop".to_string())
                .spawn(Box::new(move || {
                    self_l.request_loop();
                }))
                .unwrap(),
        );
    }

    fn stop(&self) {
        self.mutex.lock().unwrap().stopped = true;
        self.condition.notify_all();
        if let Some(join_handle) = self.thread.lock().unwrap().take() {
            join_handle.join().unwrap();
        }
        self.clear();
    }

    fn force_confirm(&self, election: &Arc<Election>) {
        assert!(self.network_constants.is_dev_network());
        let guard = election.mutex.lock().unwrap();
        self.confirm_once(guard, election);
    }

    fn confirm_if_quorum(
        &self,
        mut election_lock: MutexGuard<ElectionData>,
        election: &Arc<Election>,
    ) {
        let tally = self.tally_impl(&mut election_lock);
        let (key, block) = tally.first_key_value().unwrap();
        let winner_hash = block.hash();
        election_lock.status.tally = key.amount();
        election_lock.status.final_tally = election_lock.final_weight;
        let status_winner_hash = election_lock.status.winner.as_ref().unwrap().hash();
        let mut sum = Amount::zero();
        for k in tally.keys() {
            sum += k.amount();
        }
        if sum >= self.online_reps.lock().unwrap().delta() && winner_hash != status_winner_hash {
            let block = Arc::clone(block);
            election_lock.status.winner = Some(Arc::clone(&block));
            self.remove_votes(election, &mut election_lock, &status_winner_hash);
            self.block_processor.force(block.as_ref().clone());
        }

        if self.have_quorum(&tally) {
            if !election.is_quorum.swap(true, Ordering::SeqCst) && self.node_config.enable_voting {
                let winner_hash = election_lock.status.winner.as_ref().unwrap().hash();
                self.final_generator.add(&election.root, &winner_hash);
            }
            self.confirm_once(election_lock, election);
        }
    }

    fn confirm_once(&self, mut election_lock: MutexGuard<ElectionData>, election: &Arc<Election>) {
        // This must be kept above the setting of election state, as dependent confirmed elections require up to date changes to election_winner_details
        let mut winners_guard = self.election_winner_details.lock().unwrap();
        let mut status = election_lock.status.clone();
        let old_state = election_lock.state;
        let just_confirmed = old_state != ElectionState::Confirmed;
        election_lock.state = ElectionState::Confirmed;
        if just_confirmed && !winners_guard.contains_key(&status.winner.as_ref().unwrap().hash()) {
            winners_guard.insert(status.winner.as_ref().unwrap().hash(), Arc::clone(election));
            drop(winners_guard);

            election_lock.update_status_to_confirmed(election);
            status = election_lock.status.clone();

            self.recently_confirmed.put(
                election.qualified_root,
                status.winner.as_ref().unwrap().hash(),
            );

            self.stats.inc(StatType::Election, DetailType::ConfirmOnce);
            trace!(qualified_root = ?election.qualified_root, "election confirmed");
            drop(election_lock);

            let self_l = Arc::clone(self);
            let election = Arc::clone(election);
            self.workers.push_task(Box::new(move || {
                let block = Arc::clone(status.winner.as_ref().unwrap());
                self_l.process_confirmed(status, 0);
                (election.confirmation_action)(block);
            }));
        }
    }

    fn process_confirmed(&self, status: ElectionStatus, mut iteration: u64) {
        let hash = status.winner.as_ref().unwrap().hash();
        const NUM_ITERS: u64 = 40;
        let exists = {
            let tx = self.ledger.read_txn();
            self.ledger.block_exists(&tx, &hash)
        };
        if exists {
            trace!(block = %hash, "process confirmed");
            self.confirming_set.add(hash);
        } else if iteration < NUM_ITERS {
            iteration += 1;
            let self_w = Arc::downgrade(self);
            self.workers.add_delayed_task(
                Duration::from_millis(50),
                Box::new(move || {
                    if let Some(self_l) = self_w.upgrade() {
                        self_l.process_confirmed(status, iteration);
                    }
                }),
            );
        } else {
            // Do some cleanup due to this block never being processed by the confirming set
            self.remove_election_winner_details(&hash);
        }
    }

    fn try_confirm(&self, election: &Arc<Election>, hash: &BlockHash) {
        let guard = election.mutex.lock().unwrap();
        if let Some(winner) = &guard.status.winner {
            if winner.hash() == *hash && !self.confirmed_locked(&guard) {
                self.confirm_once(guard, election);
            }
        }
    }

    /// Validate a vote and apply it to any elections for the given hashes.
    /// Distinguishes replay votes, cannot be determined if the block is not in any election.
    fn vote(&self, vote: &Arc<Vote>, source: VoteSource) -> HashMap<BlockHash, VoteCode> {
        debug_assert!(vote.validate().is_ok());

        let mut results = HashMap::new();
        let mut process = HashMap::new();

        {
            let guard = self.mutex.lock().unwrap();
            for hash in &vote.hashes {
                // Ignore duplicate hashes (should not happen with a well-behaved voting node)
                if results.contains_key(hash) {
                    continue;
                }

                if let Some(existing) = guard.blocks.get(hash) {
                    process.insert(*hash, Arc::clone(existing));
                } else if !self.recently_confirmed.hash_exists(hash) {
                    results.insert(*hash, VoteCode::Indeterminate);
                } else {
                    results.insert(*hash, VoteCode::Replay);
                }
            }
        }

        // Keep votes for inactive hashes around so starting elections pick them up
        if results
            .values()
            .any(|code| *code == VoteCode::Indeterminate)
        {
            self.vote_cache.lock().unwrap().insert(vote);
        }

        for (block_hash, election) in process {
            let vote_result = self.vote_single(
                &election,
                &vote.voting_account,
                vote.timestamp(),
                &block_hash,
                source,
            );
            results.insert(block_hash, vote_result);
        }

        results
    }

    fn vote_single(
        &self,
        election: &Arc<Election>,
        rep: &Account,
        timestamp: u64,
        block_hash: &BlockHash,
        vote_source: VoteSource,
    ) -> VoteCode {
        let weight = self.ledger.weight(rep);
        if !self.network_constants.is_dev_network()
            && weight <= self.online_reps.lock().unwrap().minimum_principal_weight()
        {
            return VoteCode::Indeterminate;
        }

        let mut guard = election.mutex.lock().unwrap();

        if let Some(last_vote) = guard.last_votes.get(rep) {
            if last_vote.timestamp > timestamp {
                return VoteCode::Replay;
            }
            if last_vote.timestamp == timestamp && !(last_vote.hash < *block_hash) {
                return VoteCode::Replay;
            }

            let max_vote = timestamp == Vote::TIMESTAMP_MAX && last_vote.timestamp < timestamp;

            let mut past_cooldown = true;
            // Only cooldown live votes
            if vote_source == VoteSource::Live {
                let cooldown = self.cooldown_time(weight);
                past_cooldown = last_vote
                    .time
                    .elapsed()
                    .map(|elapsed| elapsed >= cooldown)
                    .unwrap_or(true);
            }

            if !max_vote && !past_cooldown {
                return VoteCode::Ignored;
            }
        }
        guard
            .last_votes
            .insert(*rep, VoteInfo::new(timestamp, *block_hash));

        if vote_source == VoteSource::Live {
            (election.live_vote_action)(*rep);
        }

        self.stats.inc(
            StatType::Election,
            if vote_source == VoteSource::Live {
                DetailType::VoteNew
            } else {
                DetailType::VoteCached
            },
        );
        trace!(
            qualified_root = ?election.qualified_root,
            account = %rep,
            hash = %block_hash,
            timestamp,
            ?vote_source,
            ?weight,
            "vote processed");

        if !self.confirmed_locked(&guard) {
            self.confirm_if_quorum(guard, election);
        }
        VoteCode::Vote
    }

    fn block_cemented_callback(&self, block: &Arc<BlockEnum>) {
        if let Some(election) = self.election(&block.qualified_root()) {
            self.try_confirm(&election, &block.hash());
        }
        let votes: Vec<VoteWithWeightInfo>;
        let mut status: ElectionStatus;
        let election = self.remove_election_winner_details(&block.hash());
        if let Some(election) = &election {
            status = election.mutex.lock().unwrap().status.clone();
            votes = self.votes_with_weight(election);
        } else {
            status = ElectionStatus::default();
            votes = Vec::new();
        }
        // The cemented ledger block carries the authoritative sideband
        status.winner = Some(Arc::clone(block));
        // Status type precedence: quorum-based > height-based > inactive
        if self.confirming_set.exists(&block.hash()) {
            status.election_status_type = ElectionStatusType::ActiveConfirmedQuorum;
        } else if election.is_some() {
            status.election_status_type = ElectionStatusType::ActiveConfirmationHeight;
        } else {
            status.election_status_type = ElectionStatusType::InactiveConfirmationHeight;
        }

        self.recently_cemented.put(status.clone());
        self.notify_observers(&status, &votes);

        let cemented_bootstrap_count_reached =
            self.ledger.cemented_count() >= self.ledger.bootstrap_weight_max_blocks();
        let was_active = status.election_status_type == ElectionStatusType::ActiveConfirmedQuorum
            || status.election_status_type == ElectionStatusType::ActiveConfirmationHeight;

        // Next-block activations are only done for blocks with previously active elections
        if cemented_bootstrap_count_reached && was_active && !self.flags.disable_activate_successors
        {
            let guard = self.activate_successors.lock().unwrap();
            (guard)(block);
        }
    }

    fn trigger_vote_cache(&self, hash: &BlockHash) -> bool {
        let cached = self.vote_cache.lock().unwrap().find(hash);
        for cached_vote in &cached {
            self.vote(cached_vote, VoteSource::Cache);
        }
        !cached.is_empty()
    }

    /// Forward a fork candidate to the existing election for its root
    fn publish_block(&self, block: &Arc<BlockEnum>) -> bool {
        let mut guard = self.mutex.lock().unwrap();
        let root = block.qualified_root();
        let mut result = true;
        if let Some(election) = guard.roots.get(&root) {
            let election = Arc::clone(election);
            drop(guard);
            result = self.publish(block, &election);
            if !result {
                guard = self.mutex.lock().unwrap();
                guard.blocks.insert(block.hash(), election);
                drop(guard);

                self.trigger_vote_cache(&block.hash());

                self.stats
                    .inc(StatType::Active, DetailType::ElectionBlockConflict);
            }
        }

        result
    }

    fn insert(
        &self,
        block: &Arc<BlockEnum>,
        behavior: ElectionBehavior,
        erase_callback: Option<EraseCallback>,
    ) -> (bool, Option<Arc<Election>>) {
        let mut election_result = None;
        let mut inserted = false;

        let mut guard = self.mutex.lock().unwrap();

        if guard.stopped {
            return (false, None);
        }

        let root = block.qualified_root();
        let hash = block.hash();
        let existing = guard.roots.get(&root);

        if let Some(existing) = existing {
            election_result = Some(Arc::clone(existing));
        } else if !self.recently_confirmed.root_exists(&root) {
            inserted = true;
            let online_reps = Arc::clone(&self.online_reps);
            let observe_rep_cb = Box::new(move |rep| {
                // Representative is defined as online if replying to live votes or rep_crawler queries
                online_reps.lock().unwrap().observe(rep);
            });

            let id = NEXT_ELECTION_ID.fetch_add(1, Ordering::Relaxed);
            let mut election = Election::new(
                id,
                Arc::clone(block),
                behavior,
                Box::new(|_| {}),
                observe_rep_cb,
            );
            if let Some(callback) = erase_callback {
                election = election.with_erased_callback(callback);
            }
            let election = Arc::new(election);
            guard.roots.insert(root, Arc::clone(&election));
            guard.blocks.insert(hash, Arc::clone(&election));

            // Keep track of the election count by election type
            *guard.count_by_behavior_mut(election.behavior) += 1;

            self.stats.inc(StatType::ActiveStarted, behavior.into());
            trace!(?behavior, ?election, "active started");

            debug!(
                "Started new election for block: {} (behavior: {:?})",
                hash, behavior
            );

            election_result = Some(election);
        } else {
            // The root is recently confirmed, the election is not started
        }
        drop(guard);

        if inserted {
            debug_assert!(election_result.is_some());

            self.trigger_vote_cache(&hash);

            {
                let callbacks = self.active_started_observer.lock().unwrap();
                for callback in callbacks.iter() {
                    (callback)(hash);
                }
            }
            self.vacancy_update.lock().unwrap()();
        }

        // Votes are generated for inserted or ongoing elections
        if let Some(election) = &election_result {
            let mut guard = election.mutex.lock().unwrap();
            self.broadcast_vote(election, &mut guard);
        }

        self.trim();

        (inserted, election_result)
    }
}
