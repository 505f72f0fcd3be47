use crate::{BlockEnum, BlockHash, HashOrAccount};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Key of the unchecked table: the hash of the dependency a block is waiting for,
/// plus the hash of the parked block itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct UncheckedKey {
    pub previous: BlockHash,
    pub hash: BlockHash,
}

impl UncheckedKey {
    pub fn new(dependency: HashOrAccount, hash: BlockHash) -> Self {
        Self {
            previous: dependency.into(),
            hash,
        }
    }
}

/// Information on an unchecked block
#[derive(Clone)]
pub struct UncheckedInfo {
    pub block: Arc<BlockEnum>,
    /// Seconds since posix epoch
    pub modified: u64,
}

impl UncheckedInfo {
    pub fn new(block: Arc<BlockEnum>) -> Self {
        Self {
            block,
            modified: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs(),
        }
    }
}
