mod account_store;
mod block_store;
mod confirmation_height_store;
mod frontier_store;
mod pending_store;

pub use account_store::AccountStore;
pub use block_store::BlockStore;
pub use confirmation_height_store::ConfirmationHeightStore;
pub use frontier_store::FrontierStore;
pub use pending_store::PendingStore;

use std::time::{Duration, Instant};

/// Marker for an open transaction. The in-memory table engine applies writes
/// immediately; transactions carry the single-writer discipline (enforced by
/// the write queue) and the refresh bookkeeping of the on-disk backends.
pub trait Transaction {}

pub struct ReadTransaction {
    _private: (),
}

impl ReadTransaction {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

impl Transaction for ReadTransaction {}

pub struct WriteTransaction {
    start: Instant,
}

impl WriteTransaction {
    pub(crate) fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn commit(&mut self) {
        self.start = Instant::now();
    }

    pub fn renew(&mut self) {
        self.start = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Transaction for WriteTransaction {}

/// The table set owned by the ledger
#[derive(Default)]
pub struct LedgerStore {
    pub block: BlockStore,
    pub account: AccountStore,
    pub pending: PendingStore,
    pub confirmation_height: ConfirmationHeightStore,
    pub frontier: FrontierStore,
}

impl LedgerStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn tx_begin_read(&self) -> ReadTransaction {
        ReadTransaction::new()
    }

    pub fn tx_begin_write(&self) -> WriteTransaction {
        WriteTransaction::new()
    }
}
