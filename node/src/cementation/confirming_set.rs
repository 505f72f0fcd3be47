use crate::{
    stats::{DetailType, StatType, Stats},
    utils::{ThreadPool, ThreadPoolImpl},
};
use rsvelo_core::{utils::ContainerInfo, BlockEnum, BlockHash};
use rsvelo_ledger::{Ledger, WriteGuard, Writer};
use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Condvar, Mutex},
    thread::{sleep, JoinHandle},
    time::{Duration, Instant},
};
use tracing::debug;

#[derive(Clone)]
pub struct ConfirmingSetConfig {
    /// Time limit for a single cementing write transaction
    pub batch_time: Duration,
    /// How many queued hashes are moved into processing at once
    pub batch_size: usize,
    /// Maximum number of dependent blocks to be stored in memory during processing
    pub max_blocks: usize,
    pub max_queued_notifications: usize,
}

impl Default for ConfirmingSetConfig {
    fn default() -> Self {
        Self {
            batch_time: Duration::from_millis(250),
            batch_size: 256,
            max_blocks: 64 * 128,
            max_queued_notifications: 8,
        }
    }
}

/// Set of blocks to be durably confirmed
pub struct ConfirmingSet {
    thread: Arc<ConfirmingSetThread>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ConfirmingSet {
    pub fn new(config: ConfirmingSetConfig, ledger: Arc<Ledger>, stats: Arc<Stats>) -> Self {
        Self {
            join_handle: Mutex::new(None),
            thread: Arc::new(ConfirmingSetThread {
                mutex: Mutex::new(ConfirmingSetImpl {
                    stopped: false,
                    pending: HashSet::new(),
                    processing: HashSet::new(),
                }),
                condition: Condvar::new(),
                ledger,
                stats,
                config,
                observers: Arc::new(Mutex::new(Observers::default())),
                notification_workers: ThreadPoolImpl::create(1, "Conf notif"),
            }),
        }
    }

    pub fn add_cemented_observer(&self, callback: BlockCallback) {
        self.thread.observers.lock().unwrap().cemented.push(callback);
    }

    pub fn add_already_cemented_observer(&self, callback: BlockHashCallback) {
        self.thread
            .observers
            .lock()
            .unwrap()
            .already_cemented
            .push(callback);
    }

    pub(crate) fn add_batch_cemented_observer(&self, callback: BatchCementedCallback) {
        self.thread
            .observers
            .lock()
            .unwrap()
            .batch_cemented
            .push(callback);
    }

    /// Adds a block to the set of blocks to be confirmed
    pub fn add(&self, hash: BlockHash) {
        self.thread.add(hash);
    }

    pub fn start(&self) {
        debug_assert!(self.join_handle.lock().unwrap().is_none());

        let thread = Arc::clone(&self.thread);
        *self.join_handle.lock().unwrap() = Some(
            std::thread::Builder::new()
                .name("Conf height".to_string())
                .spawn(move || thread.run())
                .unwrap(),
        );
    }

    pub fn stop(&self) {
        self.thread.stop();
        if let Some(handle) = self.join_handle.lock().unwrap().take() {
            handle.join().unwrap();
        }
        self.thread.notification_workers.stop();
    }

    /// Added blocks will remain in this set until after the ledger has them marked as confirmed.
    pub fn exists(&self, hash: &BlockHash) -> bool {
        self.thread.exists(hash)
    }

    pub fn len(&self) -> usize {
        self.thread.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn container_info(&self) -> ContainerInfo {
        let guard = self.thread.mutex.lock().unwrap();
        [
            (
                "pending",
                guard.pending.len(),
                std::mem::size_of::<BlockHash>(),
            ),
            (
                "processing",
                guard.processing.len(),
                std::mem::size_of::<BlockHash>(),
            ),
        ]
        .into()
    }
}

impl Drop for ConfirmingSet {
    fn drop(&mut self) {
        self.stop();
    }
}

struct ConfirmingSetThread {
    mutex: Mutex<ConfirmingSetImpl>,
    condition: Condvar,
    ledger: Arc<Ledger>,
    stats: Arc<Stats>,
    config: ConfirmingSetConfig,
    notification_workers: ThreadPoolImpl,
    observers: Arc<Mutex<Observers>>,
}

impl ConfirmingSetThread {
    fn stop(&self) {
        {
            let mut guard = self.mutex.lock().unwrap();
            guard.stopped = true;
        }
        self.condition.notify_all();
    }

    fn add(&self, hash: BlockHash) {
        let added = {
            let mut guard = self.mutex.lock().unwrap();
            if guard.processing.contains(&hash) {
                false
            } else {
                guard.pending.insert(hash)
            }
        };

        if added {
            self.condition.notify_all();
            self.stats.inc(StatType::ConfirmingSet, DetailType::Insert);
        } else {
            self.stats
                .inc(StatType::ConfirmingSet, DetailType::Duplicate);
        }
    }

    fn exists(&self, hash: &BlockHash) -> bool {
        let guard = self.mutex.lock().unwrap();
        guard.pending.contains(hash) || guard.processing.contains(hash)
    }

    fn len(&self) -> usize {
        let guard = self.mutex.lock().unwrap();
        guard.pending.len() + guard.processing.len()
    }

    fn run(&self) {
        let mut guard = self.mutex.lock().unwrap();
        while !guard.stopped {
            if !guard.pending.is_empty() {
                // Move pending into processing, so that the exists() check remains accurate
                debug_assert!(guard.processing.is_empty());
                let batch = guard.next_batch(self.config.batch_size);
                drop(guard);

                self.run_batch(batch);

                guard = self.mutex.lock().unwrap();
                guard.processing.clear();
            } else {
                guard = self
                    .condition
                    .wait_while(guard, |i| i.pending.is_empty() && !i.stopped)
                    .unwrap();
            }
        }
    }

    fn notify(&self, cemented: &mut VecDeque<(BlockEnum, BlockHash)>, already_cemented: &mut VecDeque<BlockHash>) {
        let mut notification = CementedNotification {
            cemented: VecDeque::new(),
            already_cemented: VecDeque::new(),
        };

        std::mem::swap(&mut notification.cemented, cemented);
        std::mem::swap(&mut notification.already_cemented, already_cemented);

        if notification.cemented.is_empty() && notification.already_cemented.is_empty() {
            return;
        }

        // Wait for the notification worker if too many notifications are queued
        while self.notification_workers.num_queued_tasks() >= self.config.max_queued_notifications {
            self.stats.inc(StatType::ConfirmingSet, DetailType::Cooldown);
            sleep(Duration::from_millis(100));
        }

        let observers = self.observers.clone();
        let stats = self.stats.clone();
        self.notification_workers.push_task(Box::new(move || {
            stats.inc(StatType::ConfirmingSet, DetailType::Notify);
            observers.lock().unwrap().notify_batch(notification);
        }));
    }

    /// We might need to issue multiple notifications if the block we're confirming implicitly confirms more
    fn notify_maybe(
        &self,
        mut write_guard: WriteGuard,
        mut tx: rsvelo_ledger::store::WriteTransaction,
        cemented: &mut VecDeque<(BlockEnum, BlockHash)>,
        already_cemented: &mut VecDeque<BlockHash>,
    ) -> (WriteGuard, rsvelo_ledger::store::WriteTransaction) {
        if cemented.len() >= self.config.max_blocks {
            self.stats
                .inc(StatType::ConfirmingSet, DetailType::NotifyIntermediate);
            drop(write_guard);
            tx.commit();

            self.notify(cemented, already_cemented);

            write_guard = self.ledger.write_queue.wait(Writer::ConfirmationHeight);
            tx.renew();
        }
        (write_guard, tx)
    }

    fn run_batch(&self, batch: VecDeque<BlockHash>) {
        let mut cemented = VecDeque::new();
        let mut already_cemented = VecDeque::new();

        {
            let mut write_guard = self.ledger.write_queue.wait(Writer::ConfirmationHeight);
            let mut tx = self.ledger.rw_txn();

            let mut batch_start = Instant::now();

            for hash in batch {
                loop {
                    // Cementing deep dependency chains might take a long time, allow for graceful shutdown
                    if self.mutex.lock().unwrap().stopped {
                        return;
                    }

                    (write_guard, tx) =
                        self.ledger
                            .refresh_if_needed(write_guard, tx, Writer::ConfirmationHeight);

                    // Issue notifications here, so that the `cemented` set is not too large before we add more blocks
                    (write_guard, tx) =
                        self.notify_maybe(write_guard, tx, &mut cemented, &mut already_cemented);

                    self.stats.inc(StatType::ConfirmingSet, DetailType::Cementing);

                    // The block might be rolled back before it's fully cemented
                    if !self.ledger.block_exists(&tx, &hash) {
                        self.stats
                            .inc(StatType::ConfirmingSet, DetailType::MissingBlock);
                        break;
                    }

                    let added = self.ledger.confirm_max(&mut tx, hash, self.config.max_blocks);
                    if !added.is_empty() {
                        // Confirming this block may implicitly confirm more
                        self.stats.add(
                            StatType::ConfirmingSet,
                            DetailType::Cemented,
                            added.len() as u64,
                        );
                        for block in added {
                            cemented.push_back((block, hash));
                        }
                    } else {
                        self.stats
                            .inc(StatType::ConfirmingSet, DetailType::AlreadyCemented);
                        already_cemented.push_back(hash);
                    }

                    if self.ledger.block_confirmed(&tx, &hash) {
                        debug!("Cemented block: {}", hash);
                        break;
                    }
                }

                // Give up the write lease after the batch time slice so higher
                // priority writers get a chance
                if batch_start.elapsed() >= self.config.batch_time {
                    drop(write_guard);
                    tx.commit();
                    write_guard = self.ledger.write_queue.wait(Writer::ConfirmationHeight);
                    tx.renew();
                    batch_start = Instant::now();
                }
            }
        }

        self.notify(&mut cemented, &mut already_cemented);
    }
}

struct ConfirmingSetImpl {
    stopped: bool,
    /// Hashes awaiting a batch
    pending: HashSet<BlockHash>,
    /// The batch currently under a write transaction
    processing: HashSet<BlockHash>,
}

impl ConfirmingSetImpl {
    fn next_batch(&mut self, max_count: usize) -> VecDeque<BlockHash> {
        let mut results = VecDeque::new();
        while let Some(&hash) = self.pending.iter().next() {
            if results.len() >= max_count {
                break;
            }
            self.pending.remove(&hash);
            self.processing.insert(hash);
            results.push_back(hash);
        }
        results
    }
}

pub struct CementedNotification {
    /// Newly cemented block + the confirmation root that triggered it
    pub cemented: VecDeque<(BlockEnum, BlockHash)>,
    pub already_cemented: VecDeque<BlockHash>,
}

type BlockCallback = Box<dyn FnMut(&Arc<BlockEnum>) + Send>;
type BlockHashCallback = Box<dyn FnMut(BlockHash) + Send>;
type BatchCementedCallback = Box<dyn FnMut(&CementedNotification) + Send>;

#[derive(Default)]
struct Observers {
    cemented: Vec<BlockCallback>,
    already_cemented: Vec<BlockHashCallback>,
    batch_cemented: Vec<BatchCementedCallback>,
}

impl Observers {
    fn notify_batch(&mut self, notification: CementedNotification) {
        for (block, _) in &notification.cemented {
            let block = Arc::new(block.clone());
            for observer in &mut self.cemented {
                observer(&block);
            }
        }

        for &hash in &notification.already_cemented {
            for observer in &mut self.already_cemented {
                observer(hash);
            }
        }

        for observer in &mut self.batch_cemented {
            observer(&notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsvelo_core::{Account, Amount, Block, BlockBuilder, DEV_GENESIS_KEY};

    fn ledger_with_send() -> (Arc<Ledger>, BlockEnum) {
        let ledger = Arc::new(Ledger::new_test_instance());
        let genesis_account = ledger.constants.genesis_account;
        let (head, balance, representative) = {
            let txn = ledger.read_txn();
            let info = ledger.get_account_info(&txn, &genesis_account).unwrap();
            (info.head, info.balance, info.representative)
        };
        let mut send = BlockBuilder::state()
            .key(&DEV_GENESIS_KEY)
            .account(genesis_account)
            .previous(head)
            .representative(representative)
            .balance(balance - Amount::raw(100))
            .link(Account::from(1000))
            .build();
        let mut txn = ledger.rw_txn();
        ledger.process(&mut txn, &mut send).unwrap();
        drop(txn);
        (ledger, send)
    }

    #[test]
    fn add_exists() {
        let ledger = Arc::new(Ledger::new_test_instance());
        let confirming_set =
            ConfirmingSet::new(Default::default(), ledger, Arc::new(Stats::new()));
        let hash = BlockHash::from(1);
        confirming_set.add(hash);
        assert!(confirming_set.exists(&hash));
        assert_eq!(confirming_set.len(), 1);
    }

    #[test]
    fn add_is_idempotent() {
        let ledger = Arc::new(Ledger::new_test_instance());
        let stats = Arc::new(Stats::new());
        let confirming_set = ConfirmingSet::new(Default::default(), ledger, stats.clone());
        let hash = BlockHash::from(1);
        confirming_set.add(hash);
        confirming_set.add(hash);
        assert_eq!(confirming_set.len(), 1);
        assert_eq!(
            stats.count(
                StatType::ConfirmingSet,
                DetailType::Duplicate,
                crate::stats::Direction::In
            ),
            1
        );
    }

    #[test]
    fn process_one() {
        let (ledger, send) = ledger_with_send();
        let confirming_set =
            ConfirmingSet::new(Default::default(), ledger.clone(), Arc::new(Stats::new()));
        confirming_set.start();

        let count = Arc::new(Mutex::new(0));
        let condition = Arc::new(Condvar::new());
        let count_clone = Arc::clone(&count);
        let condition_clone = Arc::clone(&condition);
        confirming_set.add_cemented_observer(Box::new(move |_block| {
            {
                *count_clone.lock().unwrap() += 1;
            }
            condition_clone.notify_all();
        }));

        confirming_set.add(send.hash());

        let guard = count.lock().unwrap();
        let result = condition
            .wait_timeout_while(guard, Duration::from_secs(5), |i| *i < 1)
            .unwrap()
            .1;
        assert!(!result.timed_out());
        drop(confirming_set);

        let txn = ledger.read_txn();
        assert!(ledger.block_confirmed(&txn, &send.hash()));
    }

    #[test]
    fn notifications_follow_ledger_order() {
        let ledger = Arc::new(Ledger::new_test_instance());
        let genesis_account = ledger.constants.genesis_account;

        // Two chained sends; cementing the second implies the first
        let mut blocks = Vec::new();
        for i in 0..2_u64 {
            let (head, balance, representative) = {
                let txn = ledger.read_txn();
                let info = ledger.get_account_info(&txn, &genesis_account).unwrap();
                (info.head, info.balance, info.representative)
            };
            let mut send = BlockBuilder::state()
                .key(&DEV_GENESIS_KEY)
                .account(genesis_account)
                .previous(head)
                .representative(representative)
                .balance(balance - Amount::raw(1))
                .link(Account::from(1000 + i))
                .build();
            let mut txn = ledger.rw_txn();
            ledger.process(&mut txn, &mut send).unwrap();
            blocks.push(send);
        }

        let confirming_set =
            ConfirmingSet::new(Default::default(), ledger, Arc::new(Stats::new()));
        confirming_set.start();

        let cemented = Arc::new(Mutex::new(Vec::new()));
        let condition = Arc::new(Condvar::new());
        let cemented_l = Arc::clone(&cemented);
        let condition_l = Arc::clone(&condition);
        confirming_set.add_cemented_observer(Box::new(move |block| {
            {
                cemented_l.lock().unwrap().push(block.hash());
            }
            condition_l.notify_all();
        }));

        confirming_set.add(blocks[1].hash());

        let guard = cemented.lock().unwrap();
        let (guard, result) = condition
            .wait_timeout_while(guard, Duration::from_secs(5), |i| i.len() < 2)
            .unwrap();
        assert!(!result.timed_out());
        // Ancestors are notified before descendants
        assert_eq!(*guard, vec![blocks[0].hash(), blocks[1].hash()]);
    }

    #[test]
    fn already_cemented_notification() {
        let ledger = Arc::new(Ledger::new_test_instance());
        let genesis_hash = ledger.constants.genesis.hash();
        let confirming_set =
            ConfirmingSet::new(Default::default(), ledger, Arc::new(Stats::new()));
        confirming_set.start();

        let received = Arc::new(Mutex::new(None));
        let condition = Arc::new(Condvar::new());
        let received_l = Arc::clone(&received);
        let condition_l = Arc::clone(&condition);
        confirming_set.add_already_cemented_observer(Box::new(move |hash| {
            {
                *received_l.lock().unwrap() = Some(hash);
            }
            condition_l.notify_all();
        }));

        // Genesis is already cemented
        confirming_set.add(genesis_hash);

        let guard = received.lock().unwrap();
        let (guard, result) = condition
            .wait_timeout_while(guard, Duration::from_secs(5), |i| i.is_none())
            .unwrap();
        assert!(!result.timed_out());
        assert_eq!(*guard, Some(genesis_hash));
    }
}
