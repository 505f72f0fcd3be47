use super::{BlockSideband, BlockType, LazyBlockHash};
use crate::{
    sign_message, validate_message, Account, Amount, Block, BlockHash, BlockHashBuilder, Link,
    PublicKey, RawKey, Root, Signature,
};

#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct StateHashables {
    /// Account of the block. Only the account owner can produce a valid signature.
    pub account: Account,
    /// Previous block in the account chain, zero for the first block
    pub previous: BlockHash,
    pub representative: PublicKey,
    /// Resulting balance of the account after this block
    pub balance: Amount,
    /// Receive: source hash / Send: destination account / Change: zero
    pub link: Link,
}

impl From<&StateHashables> for BlockHash {
    fn from(hashables: &StateHashables) -> Self {
        let mut preamble = [0u8; 32];
        preamble[31] = BlockType::State as u8;
        BlockHashBuilder::new()
            .update(preamble)
            .update(hashables.account.as_bytes())
            .update(hashables.previous.as_bytes())
            .update(hashables.representative.as_bytes())
            .update(hashables.balance.to_be_bytes())
            .update(hashables.link.as_bytes())
            .build()
    }
}

#[derive(Clone, Debug)]
pub struct StateBlock {
    pub hashables: StateHashables,
    pub signature: Signature,
    pub work: u64,
    pub hash: LazyBlockHash,
    pub sideband: Option<BlockSideband>,
}

impl StateBlock {
    pub fn new(
        account: Account,
        previous: BlockHash,
        representative: PublicKey,
        balance: Amount,
        link: Link,
        prv_key: &RawKey,
        pub_key: &PublicKey,
        work: u64,
    ) -> Self {
        let hashables = StateHashables {
            account,
            previous,
            representative,
            balance,
            link,
        };

        let hash = LazyBlockHash::new();
        let signature = sign_message(prv_key, pub_key, hash.hash(&hashables).as_bytes());

        Self {
            hashables,
            work,
            signature,
            hash,
            sideband: None,
        }
    }

    pub fn account(&self) -> Account {
        self.hashables.account
    }

    pub fn link(&self) -> Link {
        self.hashables.link
    }

    pub fn balance(&self) -> Amount {
        self.hashables.balance
    }

    pub fn source(&self) -> BlockHash {
        BlockHash::zero()
    }

    pub fn mandatory_representative(&self) -> PublicKey {
        self.hashables.representative
    }

    pub fn verify_signature(&self) -> anyhow::Result<()> {
        validate_message(
            &self.account().into(),
            self.hash().as_bytes(),
            self.block_signature(),
        )
    }
}

impl PartialEq for StateBlock {
    fn eq(&self, other: &Self) -> bool {
        self.hashables == other.hashables
            && self.signature == other.signature
            && self.work == other.work
    }
}

impl Eq for StateBlock {}

impl Block for StateBlock {
    fn block_type(&self) -> BlockType {
        BlockType::State
    }

    fn account_field(&self) -> Option<Account> {
        Some(self.hashables.account)
    }

    fn sideband(&'_ self) -> Option<&'_ BlockSideband> {
        self.sideband.as_ref()
    }

    fn set_sideband(&mut self, sideband: BlockSideband) {
        self.sideband = Some(sideband);
    }

    fn hash(&self) -> BlockHash {
        self.hash.hash(&self.hashables)
    }

    fn link_field(&self) -> Option<Link> {
        Some(self.hashables.link)
    }

    fn block_signature(&self) -> &Signature {
        &self.signature
    }

    fn set_block_signature(&mut self, signature: &Signature) {
        self.signature = signature.clone();
    }

    fn work(&self) -> u64 {
        self.work
    }

    fn set_work(&mut self, work: u64) {
        self.work = work;
    }

    fn previous(&self) -> BlockHash {
        self.hashables.previous
    }

    fn root(&self) -> Root {
        if !self.previous().is_zero() {
            self.previous().into()
        } else {
            self.hashables.account.into()
        }
    }

    fn balance_field(&self) -> Option<Amount> {
        Some(self.hashables.balance)
    }

    fn source_field(&self) -> Option<BlockHash> {
        None
    }

    fn representative_field(&self) -> Option<PublicKey> {
        Some(self.hashables.representative)
    }

    fn destination_field(&self) -> Option<Account> {
        None
    }

    fn valid_predecessor(&self, _block_type: BlockType) -> bool {
        true
    }
}
