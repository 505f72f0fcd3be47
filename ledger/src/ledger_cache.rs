use crate::RepWeights;
use std::sync::atomic::AtomicU64;

/// Cached counters over the block store, maintained incrementally
pub struct LedgerCache {
    pub rep_weights: RepWeights,
    pub cemented_count: AtomicU64,
    pub block_count: AtomicU64,
    pub account_count: AtomicU64,
}

impl LedgerCache {
    pub fn new() -> Self {
        Self {
            rep_weights: RepWeights::new(),
            cemented_count: AtomicU64::new(0),
            block_count: AtomicU64::new(0),
            account_count: AtomicU64::new(0),
        }
    }
}

impl Default for LedgerCache {
    fn default() -> Self {
        Self::new()
    }
}
