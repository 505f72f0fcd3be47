use super::ElectionSchedulers;
use crate::block_processing::BlockProcessor;
use rsvelo_ledger::{BlockStatus, Ledger};
use std::sync::{Arc, Weak};

/// Dispatches live ledger processing results to the election schedulers
pub struct ProcessLiveDispatcher {
    ledger: Arc<Ledger>,
    schedulers: Weak<ElectionSchedulers>,
}

impl ProcessLiveDispatcher {
    pub fn new(ledger: Arc<Ledger>, schedulers: &Arc<ElectionSchedulers>) -> Self {
        Self {
            ledger,
            schedulers: Arc::downgrade(schedulers),
        }
    }

    pub fn connect(self: &Arc<Self>, block_processor: &BlockProcessor) {
        let self_w = Arc::downgrade(self);
        block_processor.add_batch_processed_observer(Box::new(move |batch| {
            if let Some(self_l) = self_w.upgrade() {
                for (result, context) in batch {
                    if *result == BlockStatus::Progress {
                        let block = context.block.lock().unwrap().clone();
                        self_l.inspect(&block);
                    }
                }
            }
        }));
    }

    fn inspect(&self, block: &rsvelo_core::BlockEnum) {
        if let Some(schedulers) = self.schedulers.upgrade() {
            let tx = self.ledger.read_txn();
            schedulers.activate(&tx, &block.account());
        }
    }
}
