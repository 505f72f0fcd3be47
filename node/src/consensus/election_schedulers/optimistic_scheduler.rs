use crate::consensus::{ActiveElections, ActiveElectionsExt, ElectionBehavior};
use crate::stats::{DetailType, StatType, Stats};
use rsvelo_core::{Account, AccountInfo, Block, ConfirmationHeightInfo};
use rsvelo_ledger::Ledger;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Clone)]
pub struct OptimisticSchedulerConfig {
    pub enabled: bool,
    /// Minimum difference between the confirmation frontier and the account
    /// frontier to become a candidate
    pub gap_threshold: u64,
    /// Maximum number of candidates stored in memory
    pub max_size: usize,
}

impl Default for OptimisticSchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gap_threshold: 32,
            max_size: 1024 * 64,
        }
    }
}

/// Activates account frontiers far above the confirmed height with optimistic
/// behavior. Cementing the frontier implicitly confirms the whole gap.
pub struct OptimisticScheduler {
    config: OptimisticSchedulerConfig,
    mutex: Mutex<OptimisticSchedulerImpl>,
    condition: Condvar,
    active: Arc<ActiveElections>,
    ledger: Arc<Ledger>,
    stats: Arc<Stats>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

struct OptimisticSchedulerImpl {
    stopped: bool,
    candidates: VecDeque<Account>,
}

impl OptimisticScheduler {
    pub fn new(
        config: OptimisticSchedulerConfig,
        active: Arc<ActiveElections>,
        ledger: Arc<Ledger>,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            config,
            mutex: Mutex::new(OptimisticSchedulerImpl {
                stopped: false,
                candidates: VecDeque::new(),
            }),
            condition: Condvar::new(),
            active,
            ledger,
            stats,
            thread: Mutex::new(None),
        }
    }

    pub fn stop(&self) {
        self.mutex.lock().unwrap().stopped = true;
        self.condition.notify_all();
        if let Some(handle) = self.thread.lock().unwrap().take() {
            handle.join().unwrap();
        }
    }

    pub fn notify(&self) {
        self.condition.notify_all();
    }

    /// Called from the backlog scan with the account and its confirmation info
    pub fn activate(
        &self,
        account: &Account,
        account_info: &AccountInfo,
        conf_info: &ConfirmationHeightInfo,
    ) -> bool {
        if !self.config.enabled {
            return false;
        }
        if account_info.block_count - conf_info.height < self.config.gap_threshold {
            return false;
        }

        {
            let mut guard = self.mutex.lock().unwrap();
            if guard.candidates.len() >= self.config.max_size {
                return false;
            }
            guard.candidates.push_back(*account);
        }
        self.stats
            .inc(StatType::OptimisticScheduler, DetailType::Activated);
        self.condition.notify_all();
        true
    }

    pub fn len(&self) -> usize {
        self.mutex.lock().unwrap().candidates.len()
    }

    fn run(self: &Arc<Self>) {
        let mut guard = self.mutex.lock().unwrap();
        while !guard.stopped {
            guard = self
                .condition
                .wait_timeout_while(guard, Duration::from_millis(500), |i| {
                    !i.stopped && i.candidates.is_empty()
                })
                .unwrap()
                .0;

            if guard.stopped {
                return;
            }

            while let Some(account) = guard.candidates.pop_front() {
                if self.active.vacancy(ElectionBehavior::Optimistic) <= 0 {
                    guard.candidates.push_front(account);
                    break;
                }
                drop(guard);
                self.run_one(&account);
                guard = self.mutex.lock().unwrap();
            }
        }
    }

    fn run_one(self: &Arc<Self>, account: &Account) {
        let block = {
            let tx = self.ledger.read_txn();
            match self.ledger.get_account_info(&tx, account) {
                Some(info) => self.ledger.get_block(&tx, &info.head),
                None => None,
            }
        };
        if let Some(block) = block {
            if self.active.active_block(&block.hash()) {
                return;
            }
            let (inserted, _) =
                self.active
                    .insert(&Arc::new(block), ElectionBehavior::Optimistic, None);
            if inserted {
                self.stats
                    .inc(StatType::OptimisticScheduler, DetailType::Loop);
            }
        }
    }
}

pub trait OptimisticSchedulerExt {
    fn start(&self);
}

impl OptimisticSchedulerExt for Arc<OptimisticScheduler> {
    fn start(&self) {
        debug_assert!(self.thread.lock().unwrap().is_none());
        let self_l = Arc::clone(self);
        *self.thread.lock().unwrap() = Some(
            std::thread::Builder::new()
                .name("Sched Opt".to_string())
                .spawn(move || {
                    self_l.run();
                })
                .unwrap(),
        );
    }
}
