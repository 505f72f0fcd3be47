use crate::{BlockEnum, BlockHash, ChangeBlock, KeyPair, PublicKey};

pub struct LegacyChangeBlockBuilder {
    key: KeyPair,
    previous: BlockHash,
    representative: PublicKey,
    work: u64,
}

impl LegacyChangeBlockBuilder {
    pub fn new() -> Self {
        Self {
            key: KeyPair::from(42),
            previous: BlockHash::from(1),
            representative: PublicKey::from(2),
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

    pub fn representative(mut self, representative: impl Into<PublicKey>) -> Self {
        self.representative = representative.into();
        self
    }

    pub fn work(mut self, work: u64) -> Self {
        self.work = work;
        self
    }

    pub fn build(self) -> BlockEnum {
        BlockEnum::LegacyChange(ChangeBlock::new(
            self.previous,
            self.representative,
            &self.key.private_key(),
            &self.key.public_key(),
            self.work,
        ))
    }
}

impl Default for LegacyChangeBlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}
