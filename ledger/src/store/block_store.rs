use super::{Transaction, WriteTransaction};
use rsvelo_core::{Account, Amount, Block, BlockEnum, BlockHash};
use std::collections::HashMap;
use std::sync::RwLock;

/// Stores processed blocks together with their sidebands, keyed by hash.
/// Putting a block updates the successor pointer of its predecessor.
#[derive(Default)]
pub struct BlockStore {
    blocks: RwLock<HashMap<BlockHash, BlockEnum>>,
}

impl BlockStore {
    pub fn put(&self, _txn: &mut WriteTransaction, block: &BlockEnum) {
        debug_assert!(block.sideband().is_some());
        let mut guard = self.blocks.write().unwrap();
        let hash = block.hash();
        let previous = block.previous();
        guard.insert(hash, block.clone());
        if !previous.is_zero() {
            if let Some(predecessor) = guard.get_mut(&previous) {
                let mut sideband = predecessor.sideband().unwrap().clone();
                sideband.successor = hash;
                predecessor.as_block_mut().set_sideband(sideband);
            }
        }
    }

    pub fn get(&self, _txn: &dyn Transaction, hash: &BlockHash) -> Option<BlockEnum> {
        self.blocks.read().unwrap().get(hash).cloned()
    }

    pub fn exists(&self, _txn: &dyn Transaction, hash: &BlockHash) -> bool {
        self.blocks.read().unwrap().contains_key(hash)
    }

    pub fn del(&self, _txn: &mut WriteTransaction, hash: &BlockHash) {
        self.blocks.write().unwrap().remove(hash);
    }

    pub fn successor(&self, _txn: &dyn Transaction, hash: &BlockHash) -> Option<BlockHash> {
        self.blocks
            .read()
            .unwrap()
            .get(hash)
            .and_then(|block| block.successor())
    }

    pub fn successor_clear(&self, _txn: &mut WriteTransaction, hash: &BlockHash) {
        let mut guard = self.blocks.write().unwrap();
        if let Some(block) = guard.get_mut(hash) {
            let mut sideband = block.sideband().unwrap().clone();
            sideband.successor = BlockHash::zero();
            block.as_block_mut().set_sideband(sideband);
        }
    }

    /// Balance of the account at the time of the given block
    pub fn balance(&self, txn: &dyn Transaction, hash: &BlockHash) -> Amount {
        self.get(txn, hash)
            .map(|block| block.balance())
            .unwrap_or_default()
    }

    pub fn account(&self, txn: &dyn Transaction, hash: &BlockHash) -> Option<Account> {
        self.get(txn, hash).map(|block| block.account())
    }

    pub fn count(&self, _txn: &dyn Transaction) -> usize {
        self.blocks.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LedgerStore;
    use rsvelo_core::{BlockBuilder, BlockSideband};

    #[test]
    fn put_sets_predecessor_successor() {
        let store = LedgerStore::new();
        let mut txn = store.tx_begin_write();

        let mut first = BlockBuilder::state().previous(0_u64).build();
        first
            .as_block_mut()
            .set_sideband(BlockSideband::new_test_instance());
        store.block.put(&mut txn, &first);

        let mut second = BlockBuilder::state().previous(first.hash()).build();
        second
            .as_block_mut()
            .set_sideband(BlockSideband::new_test_instance());
        store.block.put(&mut txn, &second);

        assert_eq!(
            store.block.successor(&txn, &first.hash()),
            Some(second.hash())
        );

        store.block.successor_clear(&mut txn, &first.hash());
        assert_eq!(store.block.successor(&txn, &first.hash()), None);
    }
}
