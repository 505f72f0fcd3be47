use super::{Transaction, WriteTransaction};
use rsvelo_core::{Account, AccountInfo};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

/// Maps account -> account info, ordered by account number for range scans
#[derive(Default)]
pub struct AccountStore {
    accounts: RwLock<BTreeMap<Account, AccountInfo>>,
}

impl AccountStore {
    pub fn put(&self, _txn: &mut WriteTransaction, account: &Account, info: &AccountInfo) {
        self.accounts
            .write()
            .unwrap()
            .insert(*account, info.clone());
    }

    pub fn get(&self, _txn: &dyn Transaction, account: &Account) -> Option<AccountInfo> {
        self.accounts.read().unwrap().get(account).cloned()
    }

    pub fn del(&self, _txn: &mut WriteTransaction, account: &Account) {
        self.accounts.write().unwrap().remove(account);
    }

    pub fn exists(&self, txn: &dyn Transaction, account: &Account) -> bool {
        self.get(txn, account).is_some()
    }

    pub fn count(&self, _txn: &dyn Transaction) -> usize {
        self.accounts.read().unwrap().len()
    }

    /// Returns up to `max` accounts starting just above `start`, in account order
    pub fn range_after(
        &self,
        _txn: &dyn Transaction,
        start: Bound<Account>,
        max: usize,
    ) -> Vec<(Account, AccountInfo)> {
        self.accounts
            .read()
            .unwrap()
            .range((start, Bound::Unbounded))
            .take(max)
            .map(|(account, info)| (*account, info.clone()))
            .collect()
    }
}
