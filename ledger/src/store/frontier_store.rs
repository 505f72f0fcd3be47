use super::{Transaction, WriteTransaction};
use rsvelo_core::{Account, BlockHash};
use std::collections::HashMap;
use std::sync::RwLock;

/// Maps legacy head block -> account. State blocks carry their account and are not indexed here.
#[derive(Default)]
pub struct FrontierStore {
    frontiers: RwLock<HashMap<BlockHash, Account>>,
}

impl FrontierStore {
    pub fn put(&self, _txn: &mut WriteTransaction, hash: &BlockHash, account: &Account) {
        self.frontiers.write().unwrap().insert(*hash, *account);
    }

    pub fn get(&self, _txn: &dyn Transaction, hash: &BlockHash) -> Option<Account> {
        self.frontiers.read().unwrap().get(hash).copied()
    }

    pub fn del(&self, _txn: &mut WriteTransaction, hash: &BlockHash) {
        self.frontiers.write().unwrap().remove(hash);
    }
}
