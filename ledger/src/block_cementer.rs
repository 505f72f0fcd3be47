use crate::store::WriteTransaction;
use crate::{Ledger, LedgerObserver};
use rsvelo_core::{Block, BlockEnum, BlockHash, ConfirmationHeightInfo};
use std::collections::VecDeque;
use std::sync::atomic::Ordering;

/// Cements blocks in the ledger by advancing confirmation heights.
/// Dependencies (previous block and receive source) are cemented first.
pub(crate) struct BlockCementer<'a> {
    ledger: &'a Ledger,
    observer: &'a dyn LedgerObserver,
}

impl<'a> BlockCementer<'a> {
    pub(crate) fn new(ledger: &'a Ledger) -> Self {
        Self {
            ledger,
            observer: ledger.observer.as_ref(),
        }
    }

    pub(crate) fn confirm(
        &self,
        txn: &mut WriteTransaction,
        target_hash: BlockHash,
        max_blocks: usize,
    ) -> Vec<BlockEnum> {
        let mut result = Vec::new();

        let mut stack = VecDeque::new();
        stack.push_back(target_hash);
        while let Some(&hash) = stack.back() {
            let Some(block) = self.ledger.get_block(&*txn, &hash) else {
                // The block might be rolled back while confirming dependencies
                break;
            };

            let dependents = block.dependent_blocks(
                &self.ledger.constants.epochs,
                &self.ledger.constants.genesis_account,
            );
            for dependent in dependents.iter() {
                if !self.ledger.block_confirmed(&*txn, dependent) {
                    stack.push_back(*dependent);

                    // Limit the stack size to avoid excessive memory usage
                    // This will forget the bottom of the dependency tree
                    if stack.len() > max_blocks {
                        stack.pop_front();
                    }
                }
            }

            if stack.back() == Some(&hash) {
                stack.pop_back();
                if !self.ledger.block_confirmed(&*txn, &hash) {
                    // We must only confirm blocks that have their dependencies confirmed
                    let conf_height = ConfirmationHeightInfo::new(block.height(), block.hash());
                    self.ledger.store.confirmation_height.put(
                        txn,
                        &block.account(),
                        &conf_height,
                    );
                    self.ledger
                        .cache
                        .cemented_count
                        .fetch_add(1, Ordering::SeqCst);

                    self.observer.blocks_cemented(1);

                    result.push(block);
                }
            } else {
                // Unconfirmed dependencies were added
            }

            // Early return might leave parts of the dependency tree unconfirmed
            if result.len() >= max_blocks {
                break;
            }
        }
        result
    }
}
