use crate::consensus::{ActiveElections, ActiveElectionsExt, ElectionBehavior, VoteCache};
use crate::representatives::OnlineReps;
use crate::stats::{DetailType, StatType, Stats};
use rsvelo_core::Amount;
use rsvelo_ledger::Ledger;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Clone)]
pub struct HintedSchedulerConfig {
    pub enabled: bool,
    pub check_interval: Duration,
    /// Percentage of the quorum delta a cached tally must reach to hint an election
    pub hinting_threshold_percent: u8,
}

impl Default for HintedSchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval: Duration::from_millis(1000),
            hinting_threshold_percent: 10,
        }
    }
}

impl HintedSchedulerConfig {
    pub fn default_for_dev_network() -> Self {
        Self {
            check_interval: Duration::from_millis(100),
            ..Default::default()
        }
    }
}

/// Monitors the vote cache and starts hinted elections for hashes that have
/// gathered substantial vote weight without an active election
pub struct HintedScheduler {
    config: HintedSchedulerConfig,
    mutex: Mutex<HintedSchedulerImpl>,
    condition: Condvar,
    active: Arc<ActiveElections>,
    ledger: Arc<Ledger>,
    stats: Arc<Stats>,
    vote_cache: Arc<Mutex<VoteCache>>,
    online_reps: Arc<Mutex<OnlineReps>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

struct HintedSchedulerImpl {
    stopped: bool,
}

impl HintedScheduler {
    pub fn new(
        config: HintedSchedulerConfig,
        active: Arc<ActiveElections>,
        ledger: Arc<Ledger>,
        stats: Arc<Stats>,
        vote_cache: Arc<Mutex<VoteCache>>,
        online_reps: Arc<Mutex<OnlineReps>>,
    ) -> Self {
        Self {
            config,
            mutex: Mutex::new(HintedSchedulerImpl { stopped: false }),
            condition: Condvar::new(),
            active,
            ledger,
            stats,
            vote_cache,
            online_reps,
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

    fn tally_threshold(&self) -> Amount {
        self.online_reps.lock().unwrap().delta() / 100
            * self.config.hinting_threshold_percent as u128
    }

    fn predicate(&self) -> bool {
        self.active.vacancy(ElectionBehavior::Hinted) > 0
    }

    fn run_iterative(self: &Arc<Self>) {
        let minimum_tally = self.tally_threshold();
        let top = self.vote_cache.lock().unwrap().top(minimum_tally);

        for entry in top {
            if !self.predicate() {
                break;
            }

            // Check if the block is still missing an election and present in the ledger
            if self.active.active_block(&entry.hash)
                || self.active.was_recently_confirmed(&entry.hash)
            {
                continue;
            }

            let block = {
                let tx = self.ledger.read_txn();
                self.ledger.get_block(&tx, &entry.hash)
            };
            let Some(block) = block else {
                continue; // Block not yet in the ledger; the block processor will pull it in
            };

            {
                let tx = self.ledger.read_txn();
                if self.ledger.block_confirmed(&tx, &entry.hash) {
                    continue;
                }
            }

            let (inserted, _) =
                self.active
                    .insert(&Arc::new(block), ElectionBehavior::Hinted, None);
            if inserted {
                self.stats.inc(StatType::Hinting, DetailType::Activated);
            }
        }
    }

    fn run(self: &Arc<Self>) {
        let mut guard = self.mutex.lock().unwrap();
        while !guard.stopped {
            guard = self
                .condition
                .wait_timeout_while(guard, self.config.check_interval, |i| !i.stopped)
                .unwrap()
                .0;
            if !guard.stopped && self.config.enabled && self.predicate() {
                drop(guard);
                self.stats.inc(StatType::Hinting, DetailType::Loop);
                self.run_iterative();
                guard = self.mutex.lock().unwrap();
            }
        }
    }
}

pub trait HintedSchedulerExt {
    fn start(&self);
}

impl HintedSchedulerExt for Arc<HintedScheduler> {
    fn start(&self) {
        debug_assert!(self.thread.lock().unwrap().is_none());
        let self_l = Arc::clone(self);
        *self.thread.lock().unwrap() = Some(
            std::thread::Builder::new()
                .name("Sched Hinted".to_string())
                .spawn(move || {
                    self_l.run();
                })
                .unwrap(),
        );
    }
}
