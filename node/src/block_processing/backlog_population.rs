use crate::stats::{DetailType, StatType, Stats};
use rsvelo_core::{Account, AccountInfo, ConfirmationHeightInfo};
use rsvelo_ledger::{store::Transaction, Ledger};
use std::ops::Bound;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Clone)]
pub struct BacklogPopulationConfig {
    /// Control if the backlog population is ongoing
    pub enabled: bool,
    /// Number of accounts per second to process
    pub frequency: u32,
    /// Number of accounts to scan per iteration
    pub batch_size: usize,
}

impl Default for BacklogPopulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: 10,
            batch_size: 10 * 1000,
        }
    }
}

pub type ActivateCallback = Box<
    dyn Fn(&dyn Transaction, &Account, &AccountInfo, &ConfirmationHeightInfo) + Send + Sync,
>;

/// Periodically scans the account table and activates unconfirmed account
/// frontiers into the election schedulers, sustaining the pipeline across
/// restarts
pub struct BacklogPopulation {
    config: BacklogPopulationConfig,
    ledger: Arc<Ledger>,
    stats: Arc<Stats>,
    activate_callback: Arc<Mutex<Option<ActivateCallback>>>,
    mutex: Mutex<BacklogPopulationImpl>,
    condition: Condvar,
    thread: Mutex<Option<JoinHandle<()>>>,
}

struct BacklogPopulationImpl {
    stopped: bool,
    /// Manual trigger of a full scan
    triggered: bool,
}

impl BacklogPopulation {
    pub fn new(config: BacklogPopulationConfig, ledger: Arc<Ledger>, stats: Arc<Stats>) -> Self {
        Self {
            config,
            ledger,
            stats,
            activate_callback: Arc::new(Mutex::new(None)),
            mutex: Mutex::new(BacklogPopulationImpl {
                stopped: false,
                triggered: false,
            }),
            condition: Condvar::new(),
            thread: Mutex::new(None),
        }
    }

    pub fn set_activate_callback(&self, callback: ActivateCallback) {
        *self.activate_callback.lock().unwrap() = Some(callback);
    }

    pub fn start(self: &Arc<Self>) {
        debug_assert!(self.thread.lock().unwrap().is_none());
        let self_l = Arc::clone(self);
        *self.thread.lock().unwrap() = Some(
            std::thread::Builder::new()
                .name("Backlog".to_string())
                .spawn(move || {
                    self_l.run();
                })
                .unwrap(),
        );
    }

    pub fn stop(&self) {
        self.mutex.lock().unwrap().stopped = true;
        self.condition.notify_all();
        if let Some(handle) = self.thread.lock().unwrap().take() {
            handle.join().unwrap();
        }
    }

    /// Manually trigger a full backlog scan
    pub fn trigger(&self) {
        self.mutex.lock().unwrap().triggered = true;
        self.condition.notify_all();
    }

    fn predicate(&self, state: &BacklogPopulationImpl) -> bool {
        state.triggered || self.config.enabled
    }

    fn run(&self) {
        let mut guard = self.mutex.lock().unwrap();
        while !guard.stopped {
            if self.predicate(&guard) {
                self.stats.inc(StatType::Backlog, DetailType::Loop);
                guard.triggered = false;
                drop(guard);
                self.populate_backlog();
                guard = self.mutex.lock().unwrap();
            }

            guard = self
                .condition
                .wait_timeout_while(guard, Duration::from_secs(1), |i| {
                    !i.stopped && !self.predicate(i)
                })
                .unwrap()
                .0;
        }
    }

    fn populate_backlog(&self) {
        debug_assert!(self.config.frequency > 0);

        let chunk_size = (self.config.batch_size / self.config.frequency as usize).max(1);
        let mut done = false;
        let mut next = Bound::Unbounded;
        while !done {
            {
                if self.mutex.lock().unwrap().stopped {
                    return;
                }

                let tx = self.ledger.read_txn();
                let accounts = self.ledger.store.account.range_after(&tx, next, chunk_size);
                done = accounts.len() < chunk_size;
                for (account, info) in &accounts {
                    self.stats.inc(StatType::Backlog, DetailType::Total);
                    self.activate(&tx, account, info);
                    next = Bound::Excluded(*account);
                }
            }

            // Give the rest of the node time to progress without holding the scan
            std::thread::sleep(Duration::from_millis(
                1000 / self.config.frequency as u64,
            ));
        }
    }

    fn activate(&self, tx: &dyn Transaction, account: &Account, account_info: &AccountInfo) {
        let conf_info = self
            .ledger
            .get_confirmation_height(tx, account)
            .unwrap_or_default();

        // If conf info is empty then it means nothing is confirmed yet
        if conf_info.height < account_info.block_count {
            self.stats.inc(StatType::Backlog, DetailType::Activated);
            let callback_guard = self.activate_callback.lock().unwrap();
            if let Some(callback) = callback_guard.as_ref() {
                callback(tx, account, account_info, &conf_info);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsvelo_core::{Amount, Block, BlockBuilder, DEV_GENESIS_KEY};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[test]
    fn activates_unconfirmed_accounts() {
        let ledger = Arc::new(Ledger::new_test_instance());
        let genesis_account = ledger.constants.genesis_account;

        // A second, unconfirmed block on the genesis chain
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
            .link(rsvelo_core::Account::from(1000))
            .build();
        {
            let mut txn = ledger.rw_txn();
            ledger.process(&mut txn, &mut send).unwrap();
        }

        let backlog = Arc::new(BacklogPopulation::new(
            BacklogPopulationConfig::default(),
            ledger,
            Arc::new(Stats::new()),
        ));
        let activations = Arc::new(AtomicUsize::new(0));
        let activations_l = activations.clone();
        backlog.set_activate_callback(Box::new(move |_tx, _account, _info, _conf| {
            activations_l.fetch_add(1, Ordering::SeqCst);
        }));

        backlog.start();
        let deadline = Instant::now() + Duration::from_secs(5);
        while activations.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        backlog.stop();

        assert!(activations.load(Ordering::SeqCst) > 0);
    }
}
