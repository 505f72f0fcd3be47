use super::BlockValidator;
use crate::BlockStatus;
use rsvelo_core::{validate_message, Account, Block, BlockEnum, BlockHash};

impl<'a> BlockValidator<'a> {
    pub(crate) fn ensure_block_does_not_exist_yet(&self) -> Result<(), BlockStatus> {
        if self
            .ledger
            .store
            .block
            .exists(self.txn, &self.block.hash())
        {
            return Err(BlockStatus::Old);
        }
        Ok(())
    }

    pub(crate) fn ensure_valid_signature(&self) -> Result<(), BlockStatus> {
        let result = if self.is_epoch_block() {
            self.ledger.validate_epoch_signature(self.block)
        } else {
            validate_message(
                &self.account.into(),
                self.block.hash().as_bytes(),
                self.block.block_signature(),
            )
        };
        result.map_err(|_| BlockStatus::BadSignature)
    }

    pub(crate) fn ensure_block_is_not_for_burn_account(&self) -> Result<(), BlockStatus> {
        if self.account.is_zero() {
            Err(BlockStatus::OpenedBurnAccount)
        } else {
            Ok(())
        }
    }

    pub(crate) fn ensure_account_exists_for_none_open_block(&self) -> Result<(), BlockStatus> {
        if !self.block.is_open() && self.old_account_info.is_none() {
            Err(BlockStatus::GapPrevious)
        } else {
            Ok(())
        }
    }

    pub(crate) fn ensure_no_double_account_open(&self) -> Result<(), BlockStatus> {
        if self.account_exists() && self.block.is_open() {
            Err(BlockStatus::Fork)
        } else {
            Ok(())
        }
    }

    pub(crate) fn ensure_previous_block_is_correct(&self) -> Result<(), BlockStatus> {
        self.ensure_previous_block_exists()?;
        self.ensure_previous_block_is_account_head()
    }

    fn ensure_previous_block_exists(&self) -> Result<(), BlockStatus> {
        if self.account_exists() && !self.block.previous().is_zero() && self.previous_block.is_none()
        {
            return Err(BlockStatus::GapPrevious);
        }

        if self.is_new_account() && !self.block.previous().is_zero() {
            return Err(BlockStatus::GapPrevious);
        }

        Ok(())
    }

    fn ensure_previous_block_is_account_head(&self) -> Result<(), BlockStatus> {
        if let Some(info) = &self.old_account_info {
            if self.block.previous() != info.head {
                return Err(BlockStatus::Fork);
            }
        }

        Ok(())
    }

    pub(crate) fn ensure_valid_predecessor(&self) -> Result<(), BlockStatus> {
        if self.block.previous().is_zero() {
            return Ok(());
        }

        let previous = self
            .previous_block
            .as_ref()
            .ok_or(BlockStatus::GapPrevious)?;

        if !self.block.valid_predecessor(previous.block_type()) {
            Err(BlockStatus::BlockPosition)
        } else {
            Ok(())
        }
    }

    pub(crate) fn ensure_sufficient_work(&self) -> Result<(), BlockStatus> {
        if !self
            .ledger
            .constants
            .work
            .is_valid_pow(self.block, &self.block_details())
        {
            Err(BlockStatus::InsufficientWork)
        } else {
            Ok(())
        }
    }

    pub(crate) fn get_account(&self) -> Result<Account, BlockStatus> {
        let account = match self.block {
            BlockEnum::LegacyOpen(open) => open.account(),
            BlockEnum::State(state) => state.account(),
            BlockEnum::LegacySend(_) | BlockEnum::LegacyReceive(_) | BlockEnum::LegacyChange(_) => {
                self.get_account_from_frontier_table()?
            }
        };
        Ok(account)
    }

    fn get_account_from_frontier_table(&self) -> Result<Account, BlockStatus> {
        let previous = self
            .ledger
            .get_block(self.txn, &self.block.previous())
            .ok_or(BlockStatus::GapPrevious)?;
        if !self.block.valid_predecessor(previous.block_type()) {
            return Err(BlockStatus::BlockPosition);
        }
        self.ensure_frontier(&self.block.previous())
    }

    fn ensure_frontier(&self, previous: &BlockHash) -> Result<Account, BlockStatus> {
        self.ledger
            .get_frontier(self.txn, previous)
            .ok_or(BlockStatus::Fork)
    }
}
