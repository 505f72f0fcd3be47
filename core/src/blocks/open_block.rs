use super::{BlockSideband, BlockType, LazyBlockHash};
use crate::{
    sign_message, Account, Amount, Block, BlockHash, BlockHashBuilder, KeyPair, Link, PublicKey,
    RawKey, Root, Signature,
};

#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct OpenHashables {
    /// Block or source of funds this block is opening with
    pub source: BlockHash,
    /// Representative of the account being opened
    pub representative: PublicKey,
    /// Account being opened
    pub account: Account,
}

impl From<&OpenHashables> for BlockHash {
    fn from(hashables: &OpenHashables) -> Self {
        BlockHashBuilder::new()
            .update(hashables.source.as_bytes())
            .update(hashables.representative.as_bytes())
            .update(hashables.account.as_bytes())
            .build()
    }
}

#[derive(Clone, Debug)]
pub struct OpenBlock {
    pub hashables: OpenHashables,
    pub signature: Signature,
    pub work: u64,
    pub hash: LazyBlockHash,
    pub sideband: Option<BlockSideband>,
}

impl OpenBlock {
    pub fn new(
        source: BlockHash,
        representative: PublicKey,
        account: Account,
        prv_key: &RawKey,
        pub_key: &PublicKey,
        work: u64,
    ) -> Self {
        let hashables = OpenHashables {
            source,
            representative,
            account,
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

    pub fn new_genesis(genesis_key: &KeyPair, work: u64) -> Self {
        let account = genesis_key.account();
        Self::new(
            account.into(),
            account.into(),
            account,
            &genesis_key.private_key(),
            &genesis_key.public_key(),
            work,
        )
    }

    pub fn account(&self) -> Account {
        self.hashables.account
    }

    pub fn source(&self) -> BlockHash {
        self.hashables.source
    }

    pub fn mandatory_source(&self) -> BlockHash {
        self.hashables.source
    }

    pub fn mandatory_representative(&self) -> PublicKey {
        self.hashables.representative
    }
}

impl PartialEq for OpenBlock {
    fn eq(&self, other: &Self) -> bool {
        self.hashables == other.hashables
            && self.signature == other.signature
            && self.work == other.work
    }
}

impl Eq for OpenBlock {}

impl Block for OpenBlock {
    fn block_type(&self) -> BlockType {
        BlockType::LegacyOpen
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
        BlockHash::zero()
    }

    fn root(&self) -> Root {
        self.hashables.account.into()
    }

    fn balance_field(&self) -> Option<Amount> {
        None
    }

    fn source_field(&self) -> Option<BlockHash> {
        Some(self.hashables.source)
    }

    fn representative_field(&self) -> Option<PublicKey> {
        Some(self.hashables.representative)
    }

    fn destination_field(&self) -> Option<Account> {
        None
    }

    fn valid_predecessor(&self, _block_type: BlockType) -> bool {
        false
    }
}
