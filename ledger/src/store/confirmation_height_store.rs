use super::{Transaction, WriteTransaction};
use rsvelo_core::{Account, ConfirmationHeightInfo};
use std::collections::HashMap;
use std::sync::RwLock;

/// Maps account -> highest cemented height and frontier
#[derive(Default)]
pub struct ConfirmationHeightStore {
    heights: RwLock<HashMap<Account, ConfirmationHeightInfo>>,
}

impl ConfirmationHeightStore {
    pub fn put(&self, _txn: &mut WriteTransaction, account: &Account, info: &ConfirmationHeightInfo) {
        self.heights.write().unwrap().insert(*account, *info);
    }

    pub fn get(&self, _txn: &dyn Transaction, account: &Account) -> Option<ConfirmationHeightInfo> {
        self.heights.read().unwrap().get(account).copied()
    }

    pub fn del(&self, _txn: &mut WriteTransaction, account: &Account) {
        self.heights.write().unwrap().remove(account);
    }

    pub fn exists(&self, txn: &dyn Transaction, account: &Account) -> bool {
        self.get(txn, account).is_some()
    }

    pub fn count(&self, _txn: &dyn Transaction) -> usize {
        self.heights.read().unwrap().len()
    }
}
