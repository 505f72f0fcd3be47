use super::UncheckedMap;
use crate::{
    stats::{DetailType, StatType, Stats},
    transport::{ChannelId, FairQueue, Origin, RateLimiter},
};
use rsvelo_core::{
    utils::ContainerInfo, work::WorkThresholds, Block, BlockEnum, Epoch, HashOrAccount, Networks,
    UncheckedInfo,
};
use rsvelo_ledger::{BlockStatus, Ledger, Writer};
use std::{
    collections::VecDeque,
    mem::size_of,
    sync::{Arc, Condvar, Mutex, MutexGuard},
    thread::JoinHandle,
    time::{Duration, Instant},
};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use tracing::{debug, error, info, trace};

#[derive(Copy, Clone, PartialEq, Eq, Debug, PartialOrd, Ord, EnumIter, Hash)]
pub enum BlockSource {
    Unknown,
    Live,
    Bootstrap,
    Unchecked,
    Local,
    Forced,
}

impl From<BlockSource> for DetailType {
    fn from(value: BlockSource) -> Self {
        match value {
            BlockSource::Unknown => DetailType::Unknown,
            BlockSource::Live => DetailType::Live,
            BlockSource::Bootstrap => DetailType::Bootstrap,
            BlockSource::Unchecked => DetailType::Unchecked,
            BlockSource::Local => DetailType::Local,
            BlockSource::Forced => DetailType::Forced,
        }
    }
}

impl From<BlockStatus> for DetailType {
    fn from(value: BlockStatus) -> Self {
        match value {
            BlockStatus::Progress => DetailType::Progress,
            BlockStatus::BadSignature => DetailType::BadSignature,
            BlockStatus::Old => DetailType::Old,
            BlockStatus::NegativeSpend => DetailType::NegativeSpend,
            BlockStatus::Fork => DetailType::Fork,
            BlockStatus::Unreceivable => DetailType::Unreceivable,
            BlockStatus::GapPrevious => DetailType::GapPrevious,
            BlockStatus::GapSource => DetailType::GapSource,
            BlockStatus::GapEpochOpenPending => DetailType::GapEpochOpenPending,
            BlockStatus::OpenedBurnAccount => DetailType::OpenedBurnAccount,
            BlockStatus::BalanceMismatch => DetailType::BalanceMismatch,
            BlockStatus::RepresentativeMismatch => DetailType::RepresentativeMismatch,
            BlockStatus::BlockPosition => DetailType::BlockPosition,
            BlockStatus::InsufficientWork => DetailType::InsufficientWork,
        }
    }
}

pub type BlockProcessorCallback = Box<dyn Fn(BlockStatus) + Send + Sync>;

pub struct BlockProcessorContext {
    pub block: Mutex<BlockEnum>,
    pub saved_block: Mutex<Option<Arc<BlockEnum>>>,
    pub source: BlockSource,
    callback: Option<BlockProcessorCallback>,
    pub arrival: Instant,
    waiter: Arc<BlockProcessorWaiter>,
}

impl BlockProcessorContext {
    pub fn new(
        block: BlockEnum,
        source: BlockSource,
        callback: Option<BlockProcessorCallback>,
    ) -> Self {
        Self {
            block: Mutex::new(block),
            saved_block: Mutex::new(None),
            source,
            arrival: Instant::now(),
            callback,
            waiter: Arc::new(BlockProcessorWaiter::new()),
        }
    }

    pub fn set_result(&self, result: BlockStatus) {
        self.waiter.set_result(result);
    }

    pub fn get_waiter(&self) -> Arc<BlockProcessorWaiter> {
        self.waiter.clone()
    }
}

impl Drop for BlockProcessorContext {
    fn drop(&mut self) {
        self.waiter.cancel()
    }
}

pub struct BlockProcessorWaiter {
    result: Mutex<(Option<BlockStatus>, bool)>, // (status, done)
    condition: Condvar,
}

impl BlockProcessorWaiter {
    pub fn new() -> Self {
        Self {
            result: Mutex::new((None, false)),
            condition: Condvar::new(),
        }
    }

    pub fn set_result(&self, result: BlockStatus) {
        *self.result.lock().unwrap() = (Some(result), true);
        self.condition.notify_all();
    }

    pub fn cancel(&self) {
        self.result.lock().unwrap().1 = true;
        self.condition.notify_all();
    }

    pub fn wait_result(&self, timeout: Duration) -> Option<BlockStatus> {
        let guard = self.result.lock().unwrap();
        if guard.1 {
            return guard.0;
        }

        let (guard, _) = self
            .condition
            .wait_timeout_while(guard, timeout, |i| !i.1)
            .unwrap();
        guard.0
    }
}

impl Default for BlockProcessorWaiter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct BlockProcessorConfig {
    /// Maximum number of blocks to queue from network peers
    pub max_peer_queue: usize,
    /// Maximum number of blocks to queue from system components (local RPC, bootstrap)
    pub max_system_queue: usize,

    // Higher priority gets processed more frequently
    pub priority_live: usize,
    pub priority_bootstrap: usize,
    pub priority_local: usize,

    /// Rate limit on messages from network peers, 0 disables the limit
    pub rate_limit_live: usize,
    pub rate_limit_burst_ratio: f64,

    pub batch_max_time: Duration,
    pub full_size: usize,
    pub batch_size: usize,
    /// How long a blocking submission waits for its result
    pub block_process_timeout: Duration,
    pub work_thresholds: WorkThresholds,
}

impl BlockProcessorConfig {
    pub const DEFAULT_BATCH_SIZE: usize = 256;
    pub const DEFAULT_FULL_SIZE: usize = 65536;

    pub fn new(work_thresholds: WorkThresholds) -> Self {
        Self {
            work_thresholds,
            max_peer_queue: 128,
            max_system_queue: 16 * 1024,
            priority_live: 1,
            priority_bootstrap: 8,
            priority_local: 16,
            rate_limit_live: 100,
            rate_limit_burst_ratio: 3.0,
            batch_max_time: Duration::from_millis(500),
            full_size: Self::DEFAULT_FULL_SIZE,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            block_process_timeout: Duration::from_secs(10),
        }
    }

    pub fn new_for(network: Networks) -> Self {
        Self::new(WorkThresholds::default_for(network))
    }
}

/// Single writer of ledger data tables. Accepts block submissions from
/// multiple sources through a fair queue and processes them in batches under
/// one write transaction.
pub struct BlockProcessor {
    thread: Mutex<Option<JoinHandle<()>>>,
    pub(crate) processor_loop: Arc<BlockProcessorLoop>,
}

impl BlockProcessor {
    pub fn new(
        config: BlockProcessorConfig,
        ledger: Arc<Ledger>,
        unchecked_map: Arc<UncheckedMap>,
        stats: Arc<Stats>,
    ) -> Self {
        let config_l = config.clone();
        let max_size_query = Box::new(move |origin: &Origin<BlockSource>| match origin.source {
            BlockSource::Live => config_l.max_peer_queue,
            _ => config_l.max_system_queue,
        });

        let config_l = config.clone();
        let priority_query = Box::new(move |origin: &Origin<BlockSource>| match origin.source {
            BlockSource::Live => config_l.priority_live,
            BlockSource::Bootstrap | BlockSource::Unchecked => config_l.priority_bootstrap,
            BlockSource::Local => config_l.priority_local,
            BlockSource::Forced | BlockSource::Unknown => 1,
        });

        Self {
            processor_loop: Arc::new(BlockProcessorLoop {
                mutex: Mutex::new(BlockProcessorImpl {
                    queue: FairQueue::new(max_size_query, priority_query),
                    last_log: None,
                    stopped: false,
                }),
                condition: Condvar::new(),
                ledger,
                unchecked_map,
                live_limiter: RateLimiter::new(config.rate_limit_live, config.rate_limit_burst_ratio),
                config,
                stats,
                blocks_rolled_back: Mutex::new(None),
                block_rolled_back: Mutex::new(Vec::new()),
                block_processed: Mutex::new(Vec::new()),
                batch_processed: Mutex::new(Vec::new()),
            }),
            thread: Mutex::new(None),
        }
    }

    pub fn new_test_instance(ledger: Arc<Ledger>) -> Self {
        let stats = Arc::new(Stats::new());
        BlockProcessor::new(
            BlockProcessorConfig::new_for(Networks::VeloDevNetwork),
            ledger,
            Arc::new(UncheckedMap::new(
                UncheckedMap::DEFAULT_MAX_ENTRIES,
                stats.clone(),
            )),
            stats,
        )
    }

    pub fn start(&self) {
        debug_assert!(self.thread.lock().unwrap().is_none());
        let processor_loop = Arc::clone(&self.processor_loop);
        *self.thread.lock().unwrap() = Some(
            std::thread::Builder::new()
                .name("Blck processing".to_string())
                .spawn(move || {
                    processor_loop.run();
                })
                .unwrap(),
        );
    }

    pub fn stop(&self) {
        self.processor_loop.mutex.lock().unwrap().stopped = true;
        self.processor_loop.condition.notify_all();
        let join_handle = self.thread.lock().unwrap().take();
        if let Some(join_handle) = join_handle {
            join_handle.join().unwrap();
        }
    }

    pub fn total_queue_len(&self) -> usize {
        self.processor_loop.total_queue_len()
    }

    pub fn queue_len(&self, source: BlockSource) -> usize {
        self.processor_loop.queue_len(source)
    }

    pub fn full(&self) -> bool {
        self.total_queue_len() >= self.processor_loop.config.full_size
    }

    pub fn half_full(&self) -> bool {
        self.total_queue_len() >= self.processor_loop.config.full_size / 2
    }

    pub fn add_block_processed_observer(
        &self,
        observer: Box<dyn Fn(BlockStatus, &BlockProcessorContext) + Send + Sync>,
    ) {
        self.processor_loop.on_block_processed(observer);
    }

    pub fn add_batch_processed_observer(
        &self,
        observer: Box<dyn Fn(&[(BlockStatus, Arc<BlockProcessorContext>)]) + Send + Sync>,
    ) {
        self.processor_loop.on_batch_processed(observer);
    }

    pub fn add_rolled_back_observer(&self, observer: Box<dyn Fn(&BlockEnum) + Send + Sync>) {
        self.processor_loop.on_rolled_back(observer);
    }

    pub fn set_blocks_rolled_back_callback(
        &self,
        callback: Box<dyn Fn(Vec<BlockEnum>, BlockEnum) + Send + Sync>,
    ) {
        self.processor_loop.on_blocks_rolled_back(callback);
    }

    pub fn add(&self, block: BlockEnum, source: BlockSource, channel_id: ChannelId) -> bool {
        self.processor_loop.add(block, source, channel_id, None)
    }

    pub fn add_with_callback(
        &self,
        block: BlockEnum,
        source: BlockSource,
        channel_id: ChannelId,
        callback: BlockProcessorCallback,
    ) -> bool {
        self.processor_loop
            .add(block, source, channel_id, Some(callback))
    }

    pub fn add_blocking(
        &self,
        block: Arc<BlockEnum>,
        source: BlockSource,
    ) -> anyhow::Result<Result<Arc<BlockEnum>, BlockStatus>> {
        self.processor_loop.add_blocking(block, source)
    }

    /// Entry point for blocks arriving from the gossip network
    pub fn process_active(&self, block: BlockEnum) {
        self.processor_loop.process_active(block);
    }

    pub fn force(&self, block: BlockEnum) {
        self.processor_loop.force(block);
    }

    pub fn container_info(&self) -> ContainerInfo {
        self.processor_loop.container_info()
    }
}

impl Drop for BlockProcessor {
    fn drop(&mut self) {
        // Thread must be stopped before destruction
        debug_assert!(self.thread.lock().unwrap().is_none());
    }
}

pub(crate) struct BlockProcessorLoop {
    mutex: Mutex<BlockProcessorImpl>,
    condition: Condvar,
    ledger: Arc<Ledger>,
    unchecked_map: Arc<UncheckedMap>,
    live_limiter: RateLimiter,
    config: BlockProcessorConfig,
    stats: Arc<Stats>,
    blocks_rolled_back: Mutex<Option<Box<dyn Fn(Vec<BlockEnum>, BlockEnum) + Send + Sync>>>,
    block_rolled_back: Mutex<Vec<Box<dyn Fn(&BlockEnum) + Send + Sync>>>,
    block_processed: Mutex<Vec<Box<dyn Fn(BlockStatus, &BlockProcessorContext) + Send + Sync>>>,
    batch_processed:
        Mutex<Vec<Box<dyn Fn(&[(BlockStatus, Arc<BlockProcessorContext>)]) + Send + Sync>>>,
}

impl BlockProcessorLoop {
    pub fn run(&self) {
        let mut guard = self.mutex.lock().unwrap();
        while !guard.stopped {
            if !guard.queue.is_empty() {
                if guard.should_log() {
                    info!(
                        "{} blocks (+ {} forced) in processing queue",
                        guard.queue.len(),
                        guard.queue.source_len(&BlockSource::Forced)
                    );
                }

                let processed = self.process_batch(guard);

                // Set results for futures when not holding the lock
                for (result, context) in processed.iter() {
                    if let Some(cb) = &context.callback {
                        cb(*result);
                    }
                    context.set_result(*result);
                }

                self.notify_batch_processed(&processed);

                guard = self.mutex.lock().unwrap();
            } else {
                self.condition.notify_one();
                guard = self.condition.wait(guard).unwrap();
            }
        }
    }

    fn notify_batch_processed(&self, blocks: &Vec<(BlockStatus, Arc<BlockProcessorContext>)>) {
        {
            let guard = self.block_processed.lock().unwrap();
            for observer in guard.iter() {
                for (status, context) in blocks {
                    observer(*status, context);
                }
            }
        }
        {
            let guard = self.batch_processed.lock().unwrap();
            for observer in guard.iter() {
                observer(blocks);
            }
        }
    }

    pub fn on_block_processed(
        &self,
        observer: Box<dyn Fn(BlockStatus, &BlockProcessorContext) + Send + Sync>,
    ) {
        self.block_processed.lock().unwrap().push(observer);
    }

    pub fn on_batch_processed(
        &self,
        observer: Box<dyn Fn(&[(BlockStatus, Arc<BlockProcessorContext>)]) + Send + Sync>,
    ) {
        self.batch_processed.lock().unwrap().push(observer);
    }

    pub fn on_rolled_back(&self, observer: Box<dyn Fn(&BlockEnum) + Send + Sync>) {
        self.block_rolled_back.lock().unwrap().push(observer);
    }

    pub fn on_blocks_rolled_back(
        &self,
        callback: Box<dyn Fn(Vec<BlockEnum>, BlockEnum) + Send + Sync>,
    ) {
        *self.blocks_rolled_back.lock().unwrap() = Some(callback);
    }

    pub fn process_active(&self, block: BlockEnum) {
        self.add(block, BlockSource::Live, ChannelId::LOOPBACK, None);
    }

    pub fn add(
        &self,
        block: BlockEnum,
        source: BlockSource,
        channel_id: ChannelId,
        callback: Option<BlockProcessorCallback>,
    ) -> bool {
        if !self.config.work_thresholds.validate_entry_block(&block) {
            self.stats
                .inc(StatType::Blockprocessor, DetailType::InsufficientWork);
            return false; // Not added
        }

        if source == BlockSource::Live && !self.live_limiter.should_pass(1) {
            self.stats
                .inc(StatType::Blockprocessor, DetailType::QueueOverflow);
            return false; // Not added
        }

        self.stats.inc(StatType::Blockprocessor, DetailType::Process);
        debug!(
            "Processing block (async): {} (source: {:?} channel id: {})",
            block.hash(),
            source,
            channel_id
        );

        self.add_impl(
            Arc::new(BlockProcessorContext::new(block, source, callback)),
            channel_id,
        )
    }

    pub fn add_blocking(
        &self,
        block: Arc<BlockEnum>,
        source: BlockSource,
    ) -> anyhow::Result<Result<Arc<BlockEnum>, BlockStatus>> {
        self.stats
            .inc(StatType::Blockprocessor, DetailType::ProcessBlocking);
        debug!(
            "Processing block (blocking): {} (source: {:?})",
            block.hash(),
            source
        );

        let hash = block.hash();
        let ctx = Arc::new(BlockProcessorContext::new(
            block.as_ref().clone(),
            source,
            None,
        ));
        let waiter = ctx.get_waiter();
        self.add_impl(ctx.clone(), ChannelId::LOOPBACK);

        match waiter.wait_result(self.config.block_process_timeout) {
            Some(BlockStatus::Progress) => Ok(Ok(ctx.saved_block.lock().unwrap().clone().unwrap())),
            Some(status) => Ok(Err(status)),
            None => {
                self.stats
                    .inc(StatType::Blockprocessor, DetailType::ProcessBlockingTimeout);
                error!("Block dropped when processing: {}", hash);
                Err(anyhow::anyhow!("Block dropped when processing"))
            }
        }
    }

    pub fn force(&self, block: BlockEnum) {
        self.stats.inc(StatType::Blockprocessor, DetailType::Force);
        debug!("Forcing block: {}", block.hash());
        let ctx = Arc::new(BlockProcessorContext::new(block, BlockSource::Forced, None));
        self.add_impl(ctx, ChannelId::LOOPBACK);
    }

    pub fn total_queue_len(&self) -> usize {
        self.mutex.lock().unwrap().queue.len()
    }

    pub fn queue_len(&self, source: BlockSource) -> usize {
        self.mutex.lock().unwrap().queue.source_len(&source)
    }

    fn add_impl(&self, context: Arc<BlockProcessorContext>, channel_id: ChannelId) -> bool {
        let source = context.source;
        let added;
        {
            let mut guard = self.mutex.lock().unwrap();
            added = guard.queue.push(context, Origin::new(source, channel_id));
        }
        if added {
            self.condition.notify_all();
        } else {
            self.stats
                .inc(StatType::Blockprocessor, DetailType::Overfill);
            self.stats
                .inc(StatType::BlockprocessorOverfill, source.into());
        }
        added
    }

    pub fn queue_unchecked(&self, dependency: &HashOrAccount) {
        self.unchecked_map.trigger(dependency);
    }

    fn next_batch(
        &self,
        data: &mut BlockProcessorImpl,
        max_count: usize,
    ) -> VecDeque<Arc<BlockProcessorContext>> {
        let mut results = VecDeque::new();
        while !data.queue.is_empty() && results.len() < max_count {
            results.push_back(data.next());
        }
        results
    }

    fn process_batch(
        &self,
        mut guard: MutexGuard<BlockProcessorImpl>,
    ) -> Vec<(BlockStatus, Arc<BlockProcessorContext>)> {
        let batch = self.next_batch(&mut guard, self.config.batch_size);
        drop(guard);

        let mut write_guard = self.ledger.write_queue.wait(Writer::ProcessBatch);
        let mut tx = self.ledger.rw_txn();

        let timer = Instant::now();

        // Processing blocks
        let mut number_of_blocks_processed = 0;
        let mut number_of_forced_processed = 0;

        let mut processed = Vec::new();
        for ctx in batch {
            let force = ctx.source == BlockSource::Forced;

            (write_guard, tx) = self
                .ledger
                .refresh_if_needed(write_guard, tx, Writer::ProcessBatch);

            if force {
                number_of_forced_processed += 1;
                let block = ctx.block.lock().unwrap().clone();
                self.rollback_competitor(&mut tx, &block);
            }

            number_of_blocks_processed += 1;

            let result = self.process_one(&mut tx, &ctx);
            processed.push((result, ctx));
        }

        if number_of_blocks_processed != 0 && timer.elapsed() > Duration::from_millis(100) {
            debug!(
                "Processed {} blocks ({} blocks were forced) in {} ms",
                number_of_blocks_processed,
                number_of_forced_processed,
                timer.elapsed().as_millis(),
            );
        }
        processed
    }

    pub fn process_one(
        &self,
        txn: &mut rsvelo_ledger::store::WriteTransaction,
        context: &BlockProcessorContext,
    ) -> BlockStatus {
        let mut block = context.block.lock().unwrap().clone();
        let hash = block.hash();

        let result = match self.ledger.process(txn, &mut block) {
            Ok(()) => {
                let saved = Arc::new(block.clone());
                *context.saved_block.lock().unwrap() = Some(saved);
                BlockStatus::Progress
            }
            Err(r) => r,
        };

        // reassign to copy sideband
        *context.block.lock().unwrap() = block.clone();

        self.stats.inc(StatType::BlockprocessorResult, result.into());
        self.stats
            .inc(StatType::BlockprocessorSource, context.source.into());
        trace!(?result, block = %hash, source = ?context.source, "Block processed");

        match result {
            BlockStatus::Progress => {
                self.queue_unchecked(&hash.into());
                /* For send blocks check epoch open unchecked (gap pending).
                If block epoch is the last epoch, then pending entry shouldn't
                trigger an epoch open block for the destination account. */
                if block.is_send() && block.epoch() < Epoch::MAX {
                    self.queue_unchecked(&block.destination_or_link().into());
                }
            }
            BlockStatus::GapPrevious => {
                self.unchecked_map
                    .put(block.previous().into(), UncheckedInfo::new(Arc::new(block)));
                self.stats.inc(StatType::Ledger, DetailType::GapPrevious);
            }
            BlockStatus::GapSource => {
                self.unchecked_map
                    .put(block.source_or_link().into(), UncheckedInfo::new(Arc::new(block)));
                self.stats.inc(StatType::Ledger, DetailType::GapSource);
            }
            BlockStatus::GapEpochOpenPending => {
                // Specific unchecked key starting with epoch open block account public key
                self.unchecked_map.put(
                    block.account_field().unwrap().into(),
                    UncheckedInfo::new(Arc::new(block)),
                );
                self.stats.inc(StatType::Ledger, DetailType::GapSource);
            }
            BlockStatus::Old => {
                self.stats.inc(StatType::Ledger, DetailType::Old);
            }
            BlockStatus::BadSignature => {}
            BlockStatus::NegativeSpend => {}
            BlockStatus::Unreceivable => {}
            BlockStatus::Fork => {
                self.stats.inc(StatType::Ledger, DetailType::Fork);
            }
            BlockStatus::OpenedBurnAccount => {}
            BlockStatus::BalanceMismatch => {}
            BlockStatus::RepresentativeMismatch => {}
            BlockStatus::BlockPosition => {}
            BlockStatus::InsufficientWork => {}
        }

        result
    }

    fn rollback_competitor(
        &self,
        transaction: &mut rsvelo_ledger::store::WriteTransaction,
        block: &BlockEnum,
    ) {
        let hash = block.hash();
        if let Some(successor) = self.ledger.successor(&*transaction, &block.qualified_root()) {
            let successor_hash = successor.hash();
            if successor_hash != hash {
                // Replace our block with the winner and roll back any dependent blocks
                debug!("Rolling back: {} and replacing with: {}", successor_hash, hash);
                let rollback_list = match self.ledger.rollback(transaction, &successor_hash) {
                    Ok(rollback_list) => {
                        self.stats.inc(StatType::Ledger, DetailType::Rollback);
                        debug!("Blocks rolled back: {}", rollback_list.len());
                        rollback_list
                    }
                    Err(_) => {
                        self.stats.inc(StatType::Ledger, DetailType::RollbackFailed);
                        error!(
                            "Failed to roll back: {} because it or a successor was confirmed",
                            successor_hash
                        );
                        Vec::new()
                    }
                };

                {
                    let observers = self.block_rolled_back.lock().unwrap();
                    for observer in observers.iter() {
                        for rolled_back in &rollback_list {
                            observer(rolled_back);
                        }
                    }
                }

                let callback_guard = self.blocks_rolled_back.lock().unwrap();
                if let Some(callback) = callback_guard.as_ref() {
                    callback(rollback_list, successor);
                }
            }
        }
    }

    pub fn container_info(&self) -> ContainerInfo {
        let guard = self.mutex.lock().unwrap();
        let mut builder = ContainerInfo::builder()
            .leaf("blocks", guard.queue.len(), size_of::<Arc<BlockEnum>>())
            .node("queue", guard.queue.container_info());
        for source in BlockSource::iter() {
            builder = builder.leaf(
                format!("{:?}", source).to_lowercase(),
                guard.queue.source_len(&source),
                size_of::<Arc<BlockEnum>>(),
            );
        }
        builder.finish()
    }
}

struct BlockProcessorImpl {
    pub queue: FairQueue<Arc<BlockProcessorContext>, BlockSource>,
    pub last_log: Option<Instant>,
    stopped: bool,
}

impl BlockProcessorImpl {
    fn next(&mut self) -> Arc<BlockProcessorContext> {
        debug_assert!(!self.queue.is_empty()); // This should be checked before calling next
        if let Some((request, origin)) = self.queue.next() {
            assert!(origin.source != BlockSource::Forced || request.source == BlockSource::Forced);
            return request;
        }

        panic!("next() called when no blocks are ready");
    }

    pub fn should_log(&mut self) -> bool {
        match &self.last_log {
            Some(last) => {
                if last.elapsed() >= Duration::from_secs(15) {
                    self.last_log = Some(Instant::now());
                    true
                } else {
                    false
                }
            }
            None => {
                self.last_log = Some(Instant::now());
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Direction;
    use rsvelo_core::BlockBuilder;

    #[test]
    fn insufficient_work() {
        let ledger = Arc::new(Ledger::new_test_instance());
        let stats = Arc::new(Stats::new());
        let unchecked = Arc::new(UncheckedMap::new(
            UncheckedMap::DEFAULT_MAX_ENTRIES,
            stats.clone(),
        ));
        let config = BlockProcessorConfig::new_for(Networks::VeloDevNetwork);
        let block_processor = BlockProcessor::new(config, ledger, unchecked, stats.clone());

        // The stub difficulty of a block is its work value
        let block = BlockBuilder::state().work(3).build();

        let added = block_processor.add(block, BlockSource::Live, ChannelId::LOOPBACK);

        assert!(!added);
        assert_eq!(
            stats.count(
                StatType::Blockprocessor,
                DetailType::InsufficientWork,
                Direction::In
            ),
            1
        );
        assert_eq!(block_processor.total_queue_len(), 0);
    }

    #[test]
    fn backpressure_per_source() {
        let ledger = Arc::new(Ledger::new_test_instance());
        let stats = Arc::new(Stats::new());
        let unchecked = Arc::new(UncheckedMap::new(
            UncheckedMap::DEFAULT_MAX_ENTRIES,
            stats.clone(),
        ));
        let config = BlockProcessorConfig::new_for(Networks::VeloDevNetwork);
        let max_peer_queue = config.max_peer_queue;
        let block_processor = BlockProcessor::new(config, ledger, unchecked, stats.clone());

        // Saturate the live queue; the processor thread is not started, so nothing is drained
        for i in 0..max_peer_queue as u64 {
            let block = BlockBuilder::state().previous(i + 1).build();
            assert!(block_processor.add(block, BlockSource::Live, ChannelId::LOOPBACK));
        }

        let overflow = BlockBuilder::state().previous(99999_u64).build();
        assert!(!block_processor.add(overflow, BlockSource::Live, ChannelId::LOOPBACK));
        assert_eq!(
            stats.count(StatType::Blockprocessor, DetailType::Overfill, Direction::In),
            1
        );
        assert_eq!(
            stats.count(StatType::BlockprocessorOverfill, DetailType::Live, Direction::In),
            1
        );

        // Local submissions still succeed
        let local = BlockBuilder::state().previous(77777_u64).build();
        assert!(block_processor.add(local, BlockSource::Local, ChannelId::LOOPBACK));
        assert_eq!(block_processor.queue_len(BlockSource::Live), max_peer_queue);
        assert_eq!(block_processor.queue_len(BlockSource::Local), 1);
    }

    #[test]
    fn process_one_valid_send() {
        let ledger = Arc::new(Ledger::new_test_instance());
        let stats = Arc::new(Stats::new());
        let unchecked = Arc::new(UncheckedMap::new(
            UncheckedMap::DEFAULT_MAX_ENTRIES,
            stats.clone(),
        ));
        let config = BlockProcessorConfig::new_for(Networks::VeloDevNetwork);
        let block_processor = BlockProcessor::new(config, ledger.clone(), unchecked, stats);
        block_processor.start();

        let genesis_account = ledger.constants.genesis_account;
        let (head, balance, representative) = {
            let txn = ledger.read_txn();
            let info = ledger.get_account_info(&txn, &genesis_account).unwrap();
            (info.head, info.balance, info.representative)
        };

        let send = BlockBuilder::state()
            .key(&rsvelo_core::DEV_GENESIS_KEY)
            .account(genesis_account)
            .previous(head)
            .representative(representative)
            .balance(balance - rsvelo_core::Amount::raw(100))
            .link(rsvelo_core::Account::from(1000))
            .build();

        let result = block_processor
            .add_blocking(Arc::new(send.clone()), BlockSource::Local)
            .unwrap();
        let saved = result.unwrap();
        assert_eq!(saved.hash(), send.hash());
        assert!(saved.sideband().unwrap().details.is_send);

        // Processing the same block again returns Old
        let result = block_processor
            .add_blocking(Arc::new(send), BlockSource::Local)
            .unwrap();
        assert_eq!(result.unwrap_err(), BlockStatus::Old);

        block_processor.stop();
    }
}
