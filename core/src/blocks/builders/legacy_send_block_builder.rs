use crate::{Account, Amount, BlockEnum, BlockHash, KeyPair, SendBlock};

pub struct LegacySendBlockBuilder {
    key: KeyPair,
    previous: BlockHash,
    destination: Account,
    balance: Amount,
    work: u64,
}

impl LegacySendBlockBuilder {
    pub fn new() -> Self {
        Self {
            key: KeyPair::from(42),
            previous: BlockHash::from(1),
            destination: Account::from(2),
            balance: Amount::raw(3),
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

    pub fn destination(mut self, destination: impl Into<Account>) -> Self {
        self.destination = destination.into();
        self
    }

    pub fn balance(mut self, balance: impl Into<Amount>) -> Self {
        self.balance = balance.into();
        self
    }

    pub fn work(mut self, work: u64) -> Self {
        self.work = work;
        self
    }

    pub fn build(self) -> BlockEnum {
        BlockEnum::LegacySend(SendBlock::new(
            &self.previous,
            &self.destination,
            &self.balance,
            &self.key.private_key(),
            &self.key.public_key(),
            self.work,
        ))
    }
}

impl Default for LegacySendBlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}
