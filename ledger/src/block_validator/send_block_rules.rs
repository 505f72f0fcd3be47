use super::BlockValidator;
use crate::BlockStatus;
use rsvelo_core::{Amount, BlockEnum};

impl<'a> BlockValidator<'a> {
    pub(crate) fn ensure_no_negative_amount_send(&self) -> Result<(), BlockStatus> {
        // Is this trying to spend a negative amount (Malicious)
        if let BlockEnum::LegacySend(send) = self.block {
            if let Some(info) = &self.old_account_info {
                if info.balance < send.balance() {
                    return Err(BlockStatus::NegativeSpend);
                }
            }
        }

        Ok(())
    }

    /// A state block that neither sends nor carries a link must not create funds
    pub(crate) fn ensure_no_balance_change_without_link(&self) -> Result<(), BlockStatus> {
        if let BlockEnum::State(state) = self.block {
            if state.link().is_zero() && !self.is_epoch_block() {
                if self.amount_received() > Amount::zero() {
                    return Err(BlockStatus::BalanceMismatch);
                }
            }
        }

        Ok(())
    }
}
