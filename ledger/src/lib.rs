#[macro_use]
extern crate anyhow;

mod block_cementer;
mod block_insertion;
mod block_rollback;
mod block_status;
mod block_validator;
mod ledger;
mod ledger_cache;
mod ledger_constants;
mod rep_weights;
mod representative_block_finder;
pub mod store;
mod write_queue;

pub use block_status::BlockStatus;
pub use ledger::{Ledger, LedgerObserver, NullLedgerObserver};
pub use ledger_cache::LedgerCache;
pub use ledger_constants::LedgerConstants;
pub use rep_weights::RepWeights;
pub use write_queue::{WriteGuard, WriteQueue, Writer};

#[cfg(test)]
mod ledger_tests;
