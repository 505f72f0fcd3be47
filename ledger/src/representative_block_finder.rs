use crate::store::{LedgerStore, Transaction};
use rsvelo_core::{Block, BlockHash, PublicKey};

/// Walks backwards through an account chain to find the representative in effect
/// at the given block
pub(crate) struct RepresentativeBlockFinder<'a> {
    txn: &'a dyn Transaction,
    store: &'a LedgerStore,
}

impl<'a> RepresentativeBlockFinder<'a> {
    pub(crate) fn new(txn: &'a dyn Transaction, store: &'a LedgerStore) -> Self {
        Self { txn, store }
    }

    pub(crate) fn find_representative(&self, hash: BlockHash) -> Option<PublicKey> {
        let mut current = hash;
        while !current.is_zero() {
            let block = self.store.block.get(self.txn, &current)?;
            if let Some(representative) = block.representative_field() {
                return Some(representative);
            }
            current = block.previous();
        }
        None
    }
}
