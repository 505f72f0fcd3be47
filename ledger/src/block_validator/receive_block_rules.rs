use super::BlockValidator;
use crate::BlockStatus;
use rsvelo_core::{BlockEnum, Epoch};

impl<'a> BlockValidator<'a> {
    pub(crate) fn ensure_pending_receive_is_correct(&self) -> Result<(), BlockStatus> {
        self.ensure_source_block_exists()?;
        self.ensure_receive_block_receives_pending_amount()?;
        self.ensure_legacy_source_is_epoch_0()
    }

    fn ensure_source_block_exists(&self) -> Result<(), BlockStatus> {
        let source = match self.block {
            BlockEnum::LegacyReceive(receive) => receive.mandatory_source(),
            BlockEnum::LegacyOpen(open) => open.mandatory_source(),
            BlockEnum::State(state) => {
                if self.is_receive() {
                    state.link().into()
                } else {
                    return Ok(());
                }
            }
            _ => return Ok(()),
        };

        if !self.ledger.store.block.exists(self.txn, &source) {
            Err(BlockStatus::GapSource)
        } else {
            Ok(())
        }
    }

    fn ensure_receive_block_receives_pending_amount(&self) -> Result<(), BlockStatus> {
        if self.is_receive() {
            match &self.pending_receive_info {
                Some(pending) => {
                    if self.amount() != pending.amount {
                        return Err(BlockStatus::BalanceMismatch);
                    }
                }
                None => {
                    return Err(BlockStatus::Unreceivable);
                }
            };
        }

        Ok(())
    }

    fn ensure_legacy_source_is_epoch_0(&self) -> Result<(), BlockStatus> {
        let is_legacy_receive = matches!(
            self.block,
            BlockEnum::LegacyReceive(_) | BlockEnum::LegacyOpen(_)
        );

        if is_legacy_receive
            && self
                .pending_receive_info
                .as_ref()
                .map(|x| x.epoch)
                .unwrap_or_default()
                != Epoch::Epoch0
        {
            Err(BlockStatus::Unreceivable)
        } else {
            Ok(())
        }
    }
}
