use super::rollback_planner::{RollbackInstructions, RollbackPlanner, RollbackStep};
use crate::representative_block_finder::RepresentativeBlockFinder;
use crate::store::WriteTransaction;
use crate::Ledger;
use rsvelo_core::{utils::seconds_since_epoch, Amount, Block, BlockEnum, BlockHash, PendingKey};
use std::sync::atomic::Ordering;

/// Rolls back the head block of an account chain repeatedly until the target
/// block does not exist anymore. Fails without ledger changes if a block on the
/// path is already cemented.
pub(crate) struct BlockRollbackPerformer<'a> {
    ledger: &'a Ledger,
    txn: &'a mut WriteTransaction,
    pub rolled_back: Vec<BlockEnum>,
}

impl<'a> BlockRollbackPerformer<'a> {
    pub(crate) fn new(ledger: &'a Ledger, txn: &'a mut WriteTransaction) -> Self {
        Self {
            ledger,
            txn,
            rolled_back: Vec::new(),
        }
    }

    pub(crate) fn roll_back(mut self, block_hash: &BlockHash) -> anyhow::Result<Vec<BlockEnum>> {
        self.roll_back_in_order(block_hash)?;
        Ok(self.rolled_back)
    }

    fn roll_back_in_order(&mut self, block_hash: &BlockHash) -> anyhow::Result<()> {
        while self.ledger.store.block.exists(&*self.txn, block_hash) {
            let head_block = self.load_account_head(block_hash)?;
            let planner = self.create_planner(head_block.clone())?;
            let step = planner.roll_back_head_block()?;
            match step {
                RollbackStep::RollBackBlock(instructions) => {
                    self.apply(&instructions);
                    self.rolled_back.push(head_block);
                }
                RollbackStep::RequestDependencyRollback(dependency) => {
                    self.roll_back_in_order(&dependency)?;
                }
            }
        }
        Ok(())
    }

    fn load_account_head(&self, block_hash: &BlockHash) -> anyhow::Result<BlockEnum> {
        let block = self
            .ledger
            .get_block(&*self.txn, block_hash)
            .ok_or_else(|| anyhow!("block not found"))?;
        let info = self
            .ledger
            .get_account_info(&*self.txn, &block.account())
            .ok_or_else(|| anyhow!("account not found"))?;
        self.ledger
            .get_block(&*self.txn, &info.head)
            .ok_or_else(|| anyhow!("head block not found"))
    }

    fn create_planner(&self, head_block: BlockEnum) -> anyhow::Result<RollbackPlanner> {
        let account = head_block.account();
        let current_account_info = self
            .ledger
            .get_account_info(&*self.txn, &account)
            .ok_or_else(|| anyhow!("account not found"))?;

        let previous = if head_block.previous().is_zero() {
            None
        } else {
            self.ledger.get_block(&*self.txn, &head_block.previous())
        };

        let previous_representative = match (&previous, head_block.representative_field()) {
            (Some(previous), Some(_)) => {
                RepresentativeBlockFinder::new(&*self.txn, &self.ledger.store)
                    .find_representative(previous.hash())
            }
            _ => None,
        };

        let is_receive = current_account_info.balance
            > previous.as_ref().map(|b| b.balance()).unwrap_or_default();
        let linked_account = if is_receive {
            self.ledger
                .account(&*self.txn, &head_block.source_or_link())
                .unwrap_or_default()
        } else {
            Default::default()
        };

        let pending_receive = self.ledger.store.pending.get(
            &*self.txn,
            &PendingKey::new(head_block.destination_or_link(), head_block.hash()),
        );

        let latest_block_for_destination = self
            .ledger
            .get_account_info(&*self.txn, &head_block.destination_or_link())
            .map(|info| info.head);

        Ok(RollbackPlanner {
            epochs: &self.ledger.constants.epochs,
            head_block,
            account,
            current_account_info,
            previous_representative,
            previous,
            linked_account,
            pending_receive,
            latest_block_for_destination,
            confirmation_height: self
                .ledger
                .get_confirmation_height(&*self.txn, &account)
                .unwrap_or_default(),
            seconds_since_epoch: seconds_since_epoch(),
        })
    }

    fn apply(&mut self, instructions: &RollbackInstructions) {
        self.ledger
            .store
            .block
            .del(self.txn, &instructions.block_hash);

        if let Some(previous) = instructions.clear_successor {
            self.ledger.store.block.successor_clear(self.txn, &previous);
        }

        self.ledger.update_account(
            self.txn,
            &instructions.account,
            &instructions.old_account_info,
            &instructions.set_account_info,
        );

        if let Some(key) = &instructions.remove_pending {
            self.ledger.store.pending.del(self.txn, key);
        }

        if let Some((key, info)) = &instructions.add_pending {
            self.ledger.store.pending.put(self.txn, key, info);
        }

        self.roll_back_frontier(instructions);
        self.roll_back_representative_cache(instructions);

        self.ledger.cache.block_count.fetch_sub(1, Ordering::SeqCst);
        self.ledger
            .observer
            .block_rolled_back(instructions.block_sub_type);
    }

    fn roll_back_frontier(&mut self, instructions: &RollbackInstructions) {
        self.ledger
            .store
            .frontier
            .del(self.txn, &instructions.block_hash);

        if let Some(previous) = &instructions.clear_successor {
            if let Some(previous_block) = self.ledger.get_block(&*self.txn, previous) {
                if previous_block.is_legacy() {
                    self.ledger
                        .store
                        .frontier
                        .put(self.txn, previous, &instructions.account);
                }
            }
        }
    }

    fn roll_back_representative_cache(&mut self, instructions: &RollbackInstructions) {
        let old_info = &instructions.old_account_info;
        let new_info = &instructions.set_account_info;
        if !new_info.head.is_zero() {
            self.ledger.cache.rep_weights.representation_add_dual(
                old_info.representative,
                Amount::zero().wrapping_sub(old_info.balance),
                new_info.representative,
                new_info.balance,
            );
        } else {
            self.ledger.cache.rep_weights.representation_add(
                old_info.representative,
                Amount::zero().wrapping_sub(old_info.balance),
            );
        }
    }
}
