use super::{Transaction, WriteTransaction};
use rsvelo_core::{Account, BlockHash, PendingInfo, PendingKey};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Receivable amounts, keyed by (destination account, send block hash)
#[derive(Default)]
pub struct PendingStore {
    pending: RwLock<BTreeMap<PendingKey, PendingInfo>>,
}

impl PendingStore {
    pub fn put(&self, _txn: &mut WriteTransaction, key: &PendingKey, info: &PendingInfo) {
        self.pending.write().unwrap().insert(*key, *info);
    }

    pub fn get(&self, _txn: &dyn Transaction, key: &PendingKey) -> Option<PendingInfo> {
        self.pending.read().unwrap().get(key).copied()
    }

    pub fn del(&self, _txn: &mut WriteTransaction, key: &PendingKey) {
        self.pending.write().unwrap().remove(key);
    }

    pub fn exists(&self, txn: &dyn Transaction, key: &PendingKey) -> bool {
        self.get(txn, key).is_some()
    }

    /// True if any receivable entry exists for the given account
    pub fn any(&self, _txn: &dyn Transaction, account: &Account) -> bool {
        let begin = PendingKey::new(*account, BlockHash::zero());
        self.pending
            .read()
            .unwrap()
            .range(begin..)
            .next()
            .map_or(false, |(key, _)| key.receiving_account == *account)
    }

    pub fn count(&self, _txn: &dyn Transaction) -> usize {
        self.pending.read().unwrap().len()
    }
}
