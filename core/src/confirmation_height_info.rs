use crate::BlockHash;

/// Confirmation height and the hash of the highest confirmed block of an account
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmationHeightInfo {
    pub height: u64,
    pub frontier: BlockHash,
}

impl ConfirmationHeightInfo {
    pub fn new(height: u64, frontier: BlockHash) -> Self {
        Self { height, frontier }
    }

    pub fn new_test_instance() -> Self {
        Self::new(42, BlockHash::from(7))
    }
}
