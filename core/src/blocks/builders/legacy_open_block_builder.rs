use crate::{BlockEnum, BlockHash, KeyPair, OpenBlock, PublicKey};

pub struct LegacyOpenBlockBuilder {
    key: KeyPair,
    source: BlockHash,
    representative: PublicKey,
    work: u64,
}

impl LegacyOpenBlockBuilder {
    pub fn new() -> Self {
        Self {
            key: KeyPair::from(42),
            source: BlockHash::from(1),
            representative: PublicKey::from(2),
            work: u64::MAX,
        }
    }

    pub fn key(mut self, key: &KeyPair) -> Self {
        self.key = key.clone();
        self
    }

    pub fn source(mut self, source: impl Into<BlockHash>) -> Self {
        self.source = source.into();
        self
    }

    pub fn representative(mut self, representative: impl Into<PublicKey>) -> Self {
        self.representative = representative.into();
        self
    }

    pub fn work(mut self, work: u64) -> Self {
        self.work = work;
        self
    }

    pub fn build(self) -> BlockEnum {
        BlockEnum::LegacyOpen(OpenBlock::new(
            self.source,
            self.representative,
            self.key.account(),
            &self.key.private_key(),
            &self.key.public_key(),
            self.work,
        ))
    }
}

impl Default for LegacyOpenBlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}
