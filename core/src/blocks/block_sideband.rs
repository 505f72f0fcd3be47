use crate::{Account, Amount, BlockDetails, BlockHash, Epoch};

/// Derived metadata attached to a block once it has been processed into the ledger
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BlockSideband {
    /// Height of the block within its account chain
    pub height: u64,
    /// Seconds since posix epoch at processing time
    pub timestamp: u64,
    /// Successor to the current block, zero until one is processed
    pub successor: BlockHash,
    pub account: Account,
    pub balance: Amount,
    pub details: BlockDetails,
    /// Epoch of the source block of receive/open blocks
    pub source_epoch: Epoch,
}

impl BlockSideband {
    pub fn new(
        account: Account,
        successor: BlockHash,
        balance: Amount,
        height: u64,
        timestamp: u64,
        details: BlockDetails,
        source_epoch: Epoch,
    ) -> Self {
        Self {
            height,
            timestamp,
            successor,
            account,
            balance,
            details,
            source_epoch,
        }
    }

    pub fn new_test_instance() -> Self {
        Self {
            height: 42,
            timestamp: 1,
            successor: BlockHash::zero(),
            account: Account::from(1),
            balance: Amount::raw(100),
            details: BlockDetails::default(),
            source_epoch: Epoch::Epoch0,
        }
    }
}

impl Default for BlockSideband {
    fn default() -> Self {
        Self {
            height: 0,
            timestamp: 0,
            successor: BlockHash::zero(),
            account: Account::zero(),
            balance: Amount::zero(),
            details: BlockDetails::default(),
            source_epoch: Epoch::Epoch0,
        }
    }
}
