use rsvelo_core::{BlockHash, Root};

/// Seam to the vote generator, which produces and broadcasts this node's own
/// votes. Vote production lives outside the core; elections only request votes
/// for a root and winner hash.
pub trait VoteGenerator: Send + Sync {
    fn add(&self, root: &Root, hash: &BlockHash);
}

/// Generator that drops all requests, used when voting is disabled and in tests
#[derive(Default)]
pub struct NullVoteGenerator {}

impl NullVoteGenerator {
    pub fn new() -> Self {
        Default::default()
    }
}

impl VoteGenerator for NullVoteGenerator {
    fn add(&self, _root: &Root, _hash: &BlockHash) {}
}
