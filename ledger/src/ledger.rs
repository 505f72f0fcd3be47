use crate::{
    block_cementer::BlockCementer,
    block_insertion::BlockInserter,
    block_rollback::BlockRollbackPerformer,
    block_validator::BlockValidator,
    store::{LedgerStore, ReadTransaction, Transaction, WriteTransaction},
    BlockStatus, LedgerCache, LedgerConstants, WriteGuard, WriteQueue, Writer,
};
use rsvelo_core::{
    Account, AccountInfo, Amount, Block, BlockEnum, BlockHash, BlockSubType,
    ConfirmationHeightInfo, Link, PendingInfo, PendingKey, QualifiedRoot, validate_message,
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

pub trait LedgerObserver: Send + Sync {
    fn blocks_cemented(&self, _cemented_count: u64) {}
    fn block_rolled_back(&self, _block_type: BlockSubType) {}
    fn block_added(&self, _block: &BlockEnum, _is_epoch: bool) {}
}

pub struct NullLedgerObserver {}

impl NullLedgerObserver {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for NullLedgerObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerObserver for NullLedgerObserver {}

/// Transactional facade over the block store. `process`, `rollback` and
/// `confirm_max` are the only mutating entry points; all of them require the
/// caller to hold the write lease through `write_queue`.
pub struct Ledger {
    pub store: LedgerStore,
    pub cache: LedgerCache,
    pub constants: LedgerConstants,
    pub write_queue: Arc<WriteQueue>,
    pub observer: Arc<dyn LedgerObserver>,
    bootstrap_weight_max_blocks: AtomicU64,
}

impl Ledger {
    pub fn new(constants: LedgerConstants) -> Self {
        let ledger = Self {
            store: LedgerStore::new(),
            cache: LedgerCache::new(),
            constants,
            write_queue: Arc::new(WriteQueue::new()),
            observer: Arc::new(NullLedgerObserver::new()),
            bootstrap_weight_max_blocks: AtomicU64::new(1),
        };

        let mut txn = ledger.rw_txn();
        ledger.add_genesis_block(&mut txn);
        ledger
    }

    pub fn new_test_instance() -> Self {
        Self::new(LedgerConstants::dev())
    }

    pub fn set_observer(&mut self, observer: Arc<dyn LedgerObserver>) {
        self.observer = observer;
    }

    pub fn read_txn(&self) -> ReadTransaction {
        self.store.tx_begin_read()
    }

    pub fn rw_txn(&self) -> WriteTransaction {
        self.store.tx_begin_write()
    }

    fn add_genesis_block(&self, txn: &mut WriteTransaction) {
        let mut genesis = self.constants.genesis.clone();
        let genesis_hash = genesis.hash();
        let genesis_account = self.constants.genesis_account;

        genesis.as_block_mut().set_sideband(rsvelo_core::BlockSideband::new(
            genesis_account,
            BlockHash::zero(),
            self.constants.genesis_amount,
            1,
            rsvelo_core::utils::seconds_since_epoch(),
            rsvelo_core::BlockDetails::new(rsvelo_core::Epoch::Epoch0, false, true, false),
            rsvelo_core::Epoch::Epoch0,
        ));

        self.store.block.put(txn, &genesis);
        self.store.confirmation_height.put(
            txn,
            &genesis_account,
            &ConfirmationHeightInfo::new(1, genesis_hash),
        );
        self.store.account.put(
            txn,
            &genesis_account,
            &AccountInfo {
                head: genesis_hash,
                representative: genesis_account.into(),
                open_block: genesis_hash,
                balance: self.constants.genesis_amount,
                modified: rsvelo_core::utils::seconds_since_epoch(),
                block_count: 1,
                epoch: rsvelo_core::Epoch::Epoch0,
            },
        );
        self.store.frontier.put(txn, &genesis_hash, &genesis_account);

        self.cache.block_count.store(1, Ordering::SeqCst);
        self.cache.cemented_count.store(1, Ordering::SeqCst);
        self.cache.account_count.store(1, Ordering::SeqCst);
        self.cache
            .rep_weights
            .representation_add(genesis_account.into(), self.constants.genesis_amount);
    }

    /// Validates `block` against the ledger and inserts it with its computed sideband
    pub fn process(
        &self,
        txn: &mut WriteTransaction,
        block: &mut BlockEnum,
    ) -> Result<(), BlockStatus> {
        let instructions = BlockValidator::new(self, &*txn, block).validate()?;
        BlockInserter::new(self, txn, block, &instructions).insert();
        Ok(())
    }

    /// Rolls back `block` and all successors of its account chain, returning the
    /// removed blocks in reverse order. Fails without ledger changes when a block
    /// on the path is already cemented.
    pub fn rollback(
        &self,
        txn: &mut WriteTransaction,
        block: &BlockHash,
    ) -> anyhow::Result<Vec<BlockEnum>> {
        BlockRollbackPerformer::new(self, txn).roll_back(block)
    }

    /// Advances the confirmation height so that `hash` is cemented, returning every
    /// newly cemented block in dependency order. Returns an empty vector if `hash`
    /// was already cemented.
    pub fn confirm(&self, txn: &mut WriteTransaction, hash: BlockHash) -> Vec<BlockEnum> {
        self.confirm_max(txn, hash, 1024 * 128)
    }

    pub fn confirm_max(
        &self,
        txn: &mut WriteTransaction,
        hash: BlockHash,
        max_blocks: usize,
    ) -> Vec<BlockEnum> {
        BlockCementer::new(self).confirm(txn, hash, max_blocks)
    }

    pub fn get_block(&self, txn: &dyn Transaction, hash: &BlockHash) -> Option<BlockEnum> {
        self.store.block.get(txn, hash)
    }

    pub fn block_exists(&self, txn: &dyn Transaction, hash: &BlockHash) -> bool {
        self.store.block.exists(txn, hash)
    }

    pub fn get_account_info(&self, txn: &dyn Transaction, account: &Account) -> Option<AccountInfo> {
        self.store.account.get(txn, account)
    }

    pub fn get_confirmation_height(
        &self,
        txn: &dyn Transaction,
        account: &Account,
    ) -> Option<ConfirmationHeightInfo> {
        self.store.confirmation_height.get(txn, account)
    }

    pub fn get_frontier(&self, txn: &dyn Transaction, hash: &BlockHash) -> Option<Account> {
        self.store.frontier.get(txn, hash)
    }

    pub fn get_pending(&self, txn: &dyn Transaction, key: &PendingKey) -> Option<PendingInfo> {
        self.store.pending.get(txn, key)
    }

    /// Balance for account containing the given block at the time of the block.
    /// Returns 0 if the block was not found
    pub fn balance(&self, txn: &dyn Transaction, hash: &BlockHash) -> Amount {
        if hash.is_zero() {
            Amount::zero()
        } else {
            self.store.block.balance(txn, hash)
        }
    }

    /// Balance for account by account number
    pub fn account_balance(
        &self,
        txn: &dyn Transaction,
        account: &Account,
        only_confirmed: bool,
    ) -> Amount {
        if only_confirmed {
            match self.store.confirmation_height.get(txn, account) {
                Some(info) => self.balance(txn, &info.frontier),
                None => Amount::zero(),
            }
        } else {
            match self.store.account.get(txn, account) {
                Some(info) => info.balance,
                None => Amount::zero(),
            }
        }
    }

    /// Return absolute amount decrease or increase for block
    pub fn block_amount(&self, txn: &dyn Transaction, hash: &BlockHash) -> Option<Amount> {
        self.store.block.get(txn, hash).map(|block| {
            let block_balance = block.balance();
            let previous_balance = self.balance(txn, &block.previous());
            if block_balance > previous_balance {
                block_balance - previous_balance
            } else {
                previous_balance - block_balance
            }
        })
    }

    /// Return account containing block hash
    pub fn account(&self, txn: &dyn Transaction, hash: &BlockHash) -> Option<Account> {
        self.store.block.account(txn, hash)
    }

    /// Given a receive/open block, the hash of its source block; zero for other blocks
    pub fn block_source(&self, txn: &dyn Transaction, block: &BlockEnum) -> BlockHash {
        debug_assert!(
            block.previous().is_zero() || self.store.block.exists(txn, &block.previous())
        );
        block.source_or_link()
    }

    pub fn block_confirmed(&self, txn: &dyn Transaction, hash: &BlockHash) -> bool {
        match self.store.block.get(txn, hash) {
            Some(block) => {
                let sideband = block.sideband().unwrap();
                match self.store.confirmation_height.get(txn, &block.account()) {
                    Some(info) => info.height >= sideband.height,
                    None => false,
                }
            }
            None => false,
        }
    }

    /// The block that occupies a fork point, if any
    pub fn successor(&self, txn: &dyn Transaction, root: &QualifiedRoot) -> Option<BlockEnum> {
        let (mut successor, get_from_previous) = if root.previous.is_zero() {
            match self.store.account.get(txn, &root.root.into()) {
                Some(info) => (Some(info.open_block), false),
                None => (None, true),
            }
        } else {
            (None, true)
        };

        if get_from_previous {
            successor = self.store.block.successor(txn, &root.previous);
        }

        successor.and_then(|hash| self.store.block.get(txn, &hash))
    }

    pub fn block_successor(&self, txn: &dyn Transaction, hash: &BlockHash) -> Option<BlockHash> {
        self.store.block.successor(txn, hash)
    }

    /// Vote weight of an account
    pub fn weight(&self, account: &Account) -> Amount {
        self.cache.rep_weights.representation_get(&account.into())
    }

    pub fn is_epoch_link(&self, link: &Link) -> bool {
        self.constants.epochs.is_epoch_link(link)
    }

    pub fn validate_epoch_signature(&self, block: &BlockEnum) -> anyhow::Result<()> {
        let epoch = self
            .constants
            .epochs
            .epoch(&block.link_field().unwrap_or_default())
            .ok_or_else(|| anyhow!("not an epoch link"))?;
        let signer = self
            .constants
            .epochs
            .signer(epoch)
            .ok_or_else(|| anyhow!("no epoch signer"))?;
        validate_message(signer, block.hash().as_bytes(), block.block_signature())
    }

    pub fn dependents_confirmed(&self, txn: &dyn Transaction, block: &BlockEnum) -> bool {
        block
            .dependent_blocks(&self.constants.epochs, &self.constants.genesis_account)
            .iter()
            .all(|hash| self.block_confirmed(txn, hash))
    }

    pub fn update_account(
        &self,
        txn: &mut WriteTransaction,
        account: &Account,
        old_info: &AccountInfo,
        new_info: &AccountInfo,
    ) {
        if !new_info.head.is_zero() {
            if old_info.head.is_zero() && new_info.open_block == new_info.head {
                self.cache.account_count.fetch_add(1, Ordering::SeqCst);
            }
            self.store.account.put(txn, account, new_info);
        } else {
            debug_assert!(!self.store.confirmation_height.exists(&*txn, account));
            self.store.account.del(txn, account);
            debug_assert!(self.cache.account_count.load(Ordering::SeqCst) > 0);
            self.cache.account_count.fetch_sub(1, Ordering::SeqCst);
        }
    }

    pub fn block_count(&self) -> u64 {
        self.cache.block_count.load(Ordering::SeqCst)
    }

    pub fn cemented_count(&self) -> u64 {
        self.cache.cemented_count.load(Ordering::SeqCst)
    }

    pub fn account_count(&self) -> u64 {
        self.cache.account_count.load(Ordering::SeqCst)
    }

    pub fn bootstrap_weight_max_blocks(&self) -> u64 {
        self.bootstrap_weight_max_blocks.load(Ordering::SeqCst)
    }

    pub fn set_bootstrap_weight_max_blocks(&self, max: u64) {
        self.bootstrap_weight_max_blocks.store(max, Ordering::SeqCst)
    }

    /// Commits and renews the write lease when the transaction has been open for
    /// too long, so other writers get a chance to make progress
    pub fn refresh_if_needed(
        &self,
        mut write_guard: WriteGuard,
        mut txn: WriteTransaction,
        writer: Writer,
    ) -> (WriteGuard, WriteTransaction) {
        if txn.elapsed() > Duration::from_millis(500) {
            drop(write_guard);
            txn.commit();
            write_guard = self.write_queue.wait(writer);
            txn.renew();
        }
        (write_guard, txn)
    }
}
