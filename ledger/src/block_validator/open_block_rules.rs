use super::BlockValidator;
use crate::BlockStatus;
use rsvelo_core::BlockEnum;

impl<'a> BlockValidator<'a> {
    pub(crate) fn ensure_open_block_has_link(&self) -> Result<(), BlockStatus> {
        if let BlockEnum::State(state) = self.block {
            if self.block.is_open() && state.link().is_zero() {
                return Err(BlockStatus::GapSource);
            }
        }
        Ok(())
    }
}
