use crate::{
    sign_message, validate_message, Account, Amount, BlockHash, BlockHashBuilder, KeyPair,
    Signature,
};
use std::time::SystemTime;

/// A signed statement by a representative endorsing a set of block hashes
#[derive(Clone, Debug)]
pub struct Vote {
    pub voting_account: Account,
    pub signature: Signature,
    /// Vote timestamp in milliseconds since posix epoch. u64::MAX indicates a final vote.
    pub timestamp: u64,
    /// The hashes for which this vote is valid
    pub hashes: Vec<BlockHash>,
}

impl Vote {
    pub const TIMESTAMP_MAX: u64 = u64::MAX;
    pub const MAX_HASHES: usize = 255;

    pub fn new(keys: &KeyPair, timestamp: u64, hashes: Vec<BlockHash>) -> Self {
        let mut result = Self {
            voting_account: keys.account(),
            signature: Signature::new(),
            timestamp,
            hashes,
        };
        result.signature = sign_message(
            &keys.private_key(),
            &keys.public_key(),
            result.hash().as_bytes(),
        );
        result
    }

    pub fn new_final(keys: &KeyPair, hashes: Vec<BlockHash>) -> Self {
        Self::new(keys, Self::TIMESTAMP_MAX, hashes)
    }

    pub fn is_final(&self) -> bool {
        self.timestamp == Self::TIMESTAMP_MAX
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The hash the signature is calculated over
    pub fn hash(&self) -> BlockHash {
        let mut builder = BlockHashBuilder::new().update(b"vote ");
        for hash in &self.hashes {
            builder = builder.update(hash.as_bytes());
        }
        builder.update(self.timestamp.to_le_bytes()).build()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_message(
            &self.voting_account.into(),
            self.hash().as_bytes(),
            &self.signature,
        )
    }
}

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive)]
pub enum VoteCode {
    Invalid = 0,
    /// Vote has the highest timestamp, it's a replay
    Replay = 1,
    /// Vote hasn't been seen
    Vote = 2,
    /// Unknown if replay or vote
    Indeterminate = 3,
    /// Vote is valid, but got ignored (e.g. due to cooldown)
    Ignored = 4,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VoteSource {
    Live,
    Cache,
}

/// A vote snapshot together with the ledger weight of its representative
#[derive(Clone, Debug)]
pub struct VoteWithWeightInfo {
    pub representative: Account,
    pub time: SystemTime,
    pub timestamp: u64,
    pub hash: BlockHash,
    pub weight: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_valid() {
        let keys = KeyPair::new();
        let vote = Vote::new(&keys, 123, vec![BlockHash::from(1)]);
        assert!(vote.validate().is_ok());
    }

    #[test]
    fn tampered_vote_fails_validation() {
        let keys = KeyPair::new();
        let mut vote = Vote::new(&keys, 123, vec![BlockHash::from(1)]);
        vote.timestamp = 124;
        assert!(vote.validate().is_err());
    }

    #[test]
    fn final_vote() {
        let keys = KeyPair::new();
        let vote = Vote::new_final(&keys, vec![BlockHash::from(1)]);
        assert!(vote.is_final());
        assert!(vote.validate().is_ok());
    }
}
