mod bucket;
mod hinted_scheduler;
mod manual_scheduler;
mod optimistic_scheduler;
mod priority_scheduler;

pub use bucket::{Bucket, BucketExt, PriorityBucketConfig};
pub use hinted_scheduler::{HintedScheduler, HintedSchedulerConfig, HintedSchedulerExt};
pub use manual_scheduler::{ManualScheduler, ManualSchedulerExt};
pub use optimistic_scheduler::{
    OptimisticScheduler, OptimisticSchedulerConfig, OptimisticSchedulerExt,
};
pub use priority_scheduler::{PriorityScheduler, PrioritySchedulerExt};

use super::{ActiveElections, VoteCache};
use crate::config::NodeConfig;
use crate::representatives::OnlineReps;
use crate::stats::Stats;
use rsvelo_core::{
    utils::ContainerInfo, Account, AccountInfo, BlockEnum, ConfirmationHeightInfo,
};
use rsvelo_ledger::{store::Transaction, Ledger};
use std::sync::{Arc, Mutex};

/// One scheduler per election behavior, started and stopped together
pub struct ElectionSchedulers {
    pub priority: Arc<PriorityScheduler>,
    pub manual: Arc<ManualScheduler>,
    hinted: Arc<HintedScheduler>,
    optimistic: Arc<OptimisticScheduler>,
}

impl ElectionSchedulers {
    pub fn new(
        config: &NodeConfig,
        active_elections: Arc<ActiveElections>,
        ledger: Arc<Ledger>,
        stats: Arc<Stats>,
        vote_cache: Arc<Mutex<VoteCache>>,
        online_reps: Arc<Mutex<OnlineReps>>,
    ) -> Self {
        let priority = Arc::new(PriorityScheduler::new(
            config.priority_bucket.clone(),
            config.active_elections.max_per_bucket,
            ledger.clone(),
            stats.clone(),
            active_elections.clone(),
        ));

        let manual = Arc::new(ManualScheduler::new(
            stats.clone(),
            active_elections.clone(),
        ));

        let hinted = Arc::new(HintedScheduler::new(
            config.hinted_scheduler.clone(),
            active_elections.clone(),
            ledger.clone(),
            stats.clone(),
            vote_cache,
            online_reps,
        ));

        let optimistic = Arc::new(OptimisticScheduler::new(
            config.optimistic_scheduler.clone(),
            active_elections,
            ledger,
            stats,
        ));

        Self {
            priority,
            manual,
            hinted,
            optimistic,
        }
    }

    /// Activate the account's next unconfirmed block in the priority scheduler
    pub fn activate(&self, tx: &dyn Transaction, account: &Account) -> bool {
        self.priority.activate(tx, account)
    }

    /// Called by the backlog scan for every unconfirmed account
    pub fn activate_backlog(
        &self,
        tx: &dyn Transaction,
        account: &Account,
        account_info: &AccountInfo,
        conf_info: &ConfirmationHeightInfo,
    ) {
        self.optimistic.activate(account, account_info, conf_info);
        self.priority
            .activate_with_info(tx, account, account_info, conf_info);
    }

    pub fn activate_successors(&self, tx: &dyn Transaction, block: &BlockEnum) {
        self.priority.activate_successors(tx, block);
    }

    pub fn add_manual(&self, block: Arc<BlockEnum>) {
        self.manual.push(block);
    }

    pub fn notify(&self) {
        self.priority.notify();
        self.hinted.notify();
        self.optimistic.notify();
    }

    pub fn start(&self) {
        self.priority.start();
        self.manual.start();
        self.hinted.start();
        self.optimistic.start();
    }

    pub fn stop(&self) {
        self.priority.stop();
        self.manual.stop();
        self.hinted.stop();
        self.optimistic.stop();
    }

    pub fn container_info(&self) -> ContainerInfo {
        ContainerInfo::builder()
            .node("priority", self.priority.container_info())
            .node("manual", self.manual.container_info())
            .finish()
    }
}
