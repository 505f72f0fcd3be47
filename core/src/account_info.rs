use crate::{Amount, BlockHash, Epoch, PublicKey};

/// Latest information about an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub head: BlockHash,
    pub representative: PublicKey,
    pub open_block: BlockHash,
    pub balance: Amount,
    /// Seconds since posix epoch
    pub modified: u64,
    pub block_count: u64,
    pub epoch: Epoch,
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            head: BlockHash::zero(),
            representative: PublicKey::zero(),
            open_block: BlockHash::zero(),
            balance: Amount::zero(),
            modified: 0,
            block_count: 0,
            epoch: Epoch::Epoch0,
        }
    }
}

impl AccountInfo {
    pub fn new_test_instance() -> Self {
        Self {
            head: BlockHash::from(1),
            representative: PublicKey::from(2),
            open_block: BlockHash::from(3),
            balance: Amount::raw(42),
            modified: 4,
            block_count: 5,
            epoch: Epoch::Epoch2,
        }
    }
}
