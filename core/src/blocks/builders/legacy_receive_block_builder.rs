use crate::{BlockEnum, BlockHash, KeyPair, ReceiveBlock};

pub struct LegacyReceiveBlockBuilder {
    key: KeyPair,
    previous: BlockHash,
    source: BlockHash,
    work: u64,
}

impl LegacyReceiveBlockBuilder {
    pub fn new() -> Self {
        Self {
            key: KeyPair::from(42),
            previous: BlockHash::from(1),
            source: BlockHash::from(2),
            work: u64::MAX,
        }
    }

    pub fn key(mut self, key: &KeyPair) -> Self {
        self.key = key.clone();
        self
    }

    pub fn previous(mut self, previous: impl Into<BlockHash>) -> Self {
        self.previous = previous.into();
        self
    }

    pub fn source(mut self, source: impl Into<BlockHash>) -> Self {
        self.source = source.into();
        self
    }

    pub fn work(mut self, work: u64) -> Self {
        self.work = work;
        self
    }

    pub fn build(self) -> BlockEnum {
        BlockEnum::LegacyReceive(ReceiveBlock::new(
            self.previous,
            self.source,
            &self.key.private_key(),
            &self.key.public_key(),
            self.work,
        ))
    }
}

impl Default for LegacyReceiveBlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}
