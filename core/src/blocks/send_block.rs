use super::{BlockSideband, BlockType, LazyBlockHash};
use crate::{
    sign_message, Account, Amount, Block, BlockHash, BlockHashBuilder, Link, PublicKey, RawKey,
    Root, Signature,
};

#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct SendHashables {
    pub previous: BlockHash,
    pub destination: Account,
    pub balance: Amount,
}

impl From<&SendHashables> for BlockHash {
    fn from(hashables: &SendHashables) -> Self {
        BlockHashBuilder::new()
            .update(hashables.previous.as_bytes())
            .update(hashables.destination.as_bytes())
            .update(hashables.balance.to_be_bytes())
            .build()
    }
}

#[derive(Clone, Debug)]
pub struct SendBlock {
    pub hashables: SendHashables,
    pub signature: Signature,
    pub work: u64,
    pub hash: LazyBlockHash,
    pub sideband: Option<BlockSideband>,
}

impl SendBlock {
    pub fn new(
        previous: &BlockHash,
        destination: &Account,
        balance: &Amount,
        prv_key: &RawKey,
        pub_key: &PublicKey,
        work: u64,
    ) -> Self {
        let hashables = SendHashables {
            previous: *previous,
            destination: *destination,
            balance: *balance,
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

    pub fn destination(&self) -> &Account {
        &self.hashables.destination
    }

    pub fn balance(&self) -> Amount {
        self.hashables.balance
    }
}

impl PartialEq for SendBlock {
    fn eq(&self, other: &Self) -> bool {
        self.hashables == other.hashables
            && self.signature == other.signature
            && self.work == other.work
    }
}

impl Eq for SendBlock {}

impl Block for SendBlock {
    fn block_type(&self) -> BlockType {
        BlockType::LegacySend
    }

    fn account_field(&self) -> Option<Account> {
        None
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
        None
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
        self.previous().into()
    }

    fn balance_field(&self) -> Option<Amount> {
        Some(self.hashables.balance)
    }

    fn source_field(&self) -> Option<BlockHash> {
        None
    }

    fn representative_field(&self) -> Option<PublicKey> {
        None
    }

    fn destination_field(&self) -> Option<Account> {
        Some(self.hashables.destination)
    }

    fn valid_predecessor(&self, block_type: BlockType) -> bool {
        valid_send_block_predecessor(block_type)
    }
}

pub fn valid_send_block_predecessor(block_type: BlockType) -> bool {
    matches!(
        block_type,
        BlockType::LegacySend
            | BlockType::LegacyReceive
            | BlockType::LegacyOpen
            | BlockType::LegacyChange
    )
}
