use crate::{Account, Amount, BlockEnum, BlockHash, KeyPair, Link, PublicKey, StateBlock};

pub struct StateBlockBuilder {
    key: KeyPair,
    account: Option<Account>,
    previous: BlockHash,
    representative: PublicKey,
    balance: Amount,
    link: Link,
    work: u64,
}

impl StateBlockBuilder {
    pub fn new() -> Self {
        Self {
            key: KeyPair::from(42),
            account: None,
            previous: BlockHash::from(1),
            representative: PublicKey::from(2),
            balance: Amount::raw(3),
            link: Link::from(4),
            work: u64::MAX,
        }
    }

    pub fn key(mut self, key: &KeyPair) -> Self {
        self.key = key.clone();
        self
    }

    pub fn account(mut self, account: impl Into<Account>) -> Self {
        self.account = Some(account.into());
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

    pub fn balance(mut self, balance: impl Into<Amount>) -> Self {
        self.balance = balance.into();
        self
    }

    pub fn link(mut self, link: impl Into<Link>) -> Self {
        self.link = link.into();
        self
    }

    pub fn work(mut self, work: u64) -> Self {
        self.work = work;
        self
    }

    pub fn build(self) -> BlockEnum {
        let account = self.account.unwrap_or_else(|| self.key.account());
        BlockEnum::State(StateBlock::new(
            account,
            self.previous,
            self.representative,
            self.balance,
            self.link,
            &self.key.private_key(),
            &self.key.public_key(),
            self.work,
        ))
    }
}

impl Default for StateBlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}
