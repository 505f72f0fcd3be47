mod block_details;
pub use block_details::BlockDetails;

mod block_sideband;
pub use block_sideband::BlockSideband;

mod change_block;
pub use change_block::{valid_change_block_predecessor, ChangeBlock, ChangeHashables};

mod open_block;
pub use open_block::{OpenBlock, OpenHashables};

mod receive_block;
pub use receive_block::{valid_receive_block_predecessor, ReceiveBlock, ReceiveHashables};

mod send_block;
pub use send_block::{valid_send_block_predecessor, SendBlock, SendHashables};

mod state_block;
pub use state_block::{StateBlock, StateHashables};

mod builders;
pub use builders::*;

use crate::{
    Account, Amount, BlockHash, BlockHashBuilder, Epoch, Epochs, FullHash, Link, PublicKey,
    QualifiedRoot, Root, Signature,
};
use num::FromPrimitive;
use std::{
    ops::Deref,
    sync::{Arc, RwLock},
};

#[repr(u8)]
#[derive(PartialEq, Eq, Debug, Clone, Copy, FromPrimitive, Hash, PartialOrd, Ord)]
pub enum BlockType {
    Invalid = 0,
    NotABlock = 1,
    LegacySend = 2,
    LegacyReceive = 3,
    LegacyOpen = 4,
    LegacyChange = 5,
    State = 6,
}

impl TryFrom<u8> for BlockType {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        FromPrimitive::from_u8(value).ok_or_else(|| anyhow!("invalid block type value"))
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockSubType {
    Send,
    Receive,
    Open,
    Change,
    Epoch,
}

#[derive(Clone, Default)]
pub struct LazyBlockHash {
    hash: Arc<RwLock<BlockHash>>,
}

impl LazyBlockHash {
    pub fn new() -> Self {
        Self {
            hash: Arc::new(RwLock::new(BlockHash::zero())),
        }
    }

    pub fn hash(&'_ self, factory: impl Into<BlockHash>) -> BlockHash {
        let mut value = self.hash.read().unwrap();
        if value.is_zero() {
            drop(value);
            let mut x = self.hash.write().unwrap();
            let block_hash: BlockHash = factory.into();
            *x = block_hash;
            drop(x);
            value = self.hash.read().unwrap();
        }

        *value
    }

    pub fn clear(&self) {
        let mut x = self.hash.write().unwrap();
        *x = BlockHash::zero();
    }
}

impl std::fmt::Debug for LazyBlockHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self.hash.read().unwrap().deref(), f)
    }
}

pub trait Block: FullHash {
    fn block_type(&self) -> BlockType;
    fn account_field(&self) -> Option<Account>;

    /**
     * Contextual details about a block, some fields may or may not be set depending on block type.
     * This field is set via set_sideband in ledger processing or when loading blocks from the store.
     * Otherwise it may be null (for example, an old block or fork).
     */
    fn sideband(&'_ self) -> Option<&'_ BlockSideband>;
    fn set_sideband(&mut self, sideband: BlockSideband);
    fn hash(&self) -> BlockHash;
    fn link_field(&self) -> Option<Link>;
    fn block_signature(&self) -> &Signature;
    fn set_block_signature(&mut self, signature: &Signature);
    fn work(&self) -> u64;
    fn set_work(&mut self, work: u64);
    fn previous(&self) -> BlockHash;
    fn root(&self) -> Root;
    fn balance_field(&self) -> Option<Amount>;
    /// Source block for open/receive blocks, None otherwise.
    fn source_field(&self) -> Option<BlockHash>;
    fn representative_field(&self) -> Option<PublicKey>;
    fn destination_field(&self) -> Option<Account>;
    fn qualified_root(&self) -> QualifiedRoot {
        QualifiedRoot::new(self.root(), self.previous())
    }
    fn valid_predecessor(&self, block_type: BlockType) -> bool;
}

impl<T: Block> FullHash for T {
    fn full_hash(&self) -> BlockHash {
        BlockHashBuilder::new()
            .update(self.hash().as_bytes())
            .update(self.block_signature().as_bytes())
            .update(self.work().to_ne_bytes())
            .build()
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BlockEnum {
    LegacySend(SendBlock),
    LegacyReceive(ReceiveBlock),
    LegacyOpen(OpenBlock),
    LegacyChange(ChangeBlock),
    State(StateBlock),
}

impl BlockEnum {
    pub fn new_test_instance() -> Self {
        Self::new_test_instance_with_key(42)
    }

    pub fn new_test_instance_with_key(key: impl Into<crate::KeyPair>) -> Self {
        let key = key.into();
        Self::State(StateBlock::new(
            key.account(),
            BlockHash::from(1),
            PublicKey::from(2),
            Amount::raw(3),
            Link::from(4),
            &key.private_key(),
            &key.public_key(),
            u64::MAX,
        ))
    }

    pub fn block_type(&self) -> BlockType {
        self.as_block().block_type()
    }

    pub fn as_block_mut(&mut self) -> &mut dyn Block {
        match self {
            BlockEnum::LegacySend(b) => b,
            BlockEnum::LegacyReceive(b) => b,
            BlockEnum::LegacyOpen(b) => b,
            BlockEnum::LegacyChange(b) => b,
            BlockEnum::State(b) => b,
        }
    }

    pub fn as_block(&self) -> &dyn Block {
        match self {
            BlockEnum::LegacySend(b) => b,
            BlockEnum::LegacyReceive(b) => b,
            BlockEnum::LegacyOpen(b) => b,
            BlockEnum::LegacyChange(b) => b,
            BlockEnum::State(b) => b,
        }
    }

    /// Balance of the account after this block. For legacy receive/open/change
    /// blocks the balance is only known once the block has a sideband.
    pub fn balance(&self) -> Amount {
        match self {
            BlockEnum::LegacySend(b) => b.balance(),
            BlockEnum::LegacyReceive(b) => b.sideband().unwrap().balance,
            BlockEnum::LegacyOpen(b) => b.sideband().unwrap().balance,
            BlockEnum::LegacyChange(b) => b.sideband().unwrap().balance,
            BlockEnum::State(b) => b.balance(),
        }
    }

    pub fn is_open(&self) -> bool {
        match &self {
            BlockEnum::LegacyOpen(_) => true,
            BlockEnum::State(state) => state.previous().is_zero(),
            _ => false,
        }
    }

    pub fn is_legacy(&self) -> bool {
        !matches!(self, BlockEnum::State(_))
    }

    pub fn is_epoch(&self) -> bool {
        match self {
            BlockEnum::State(_) => self.sideband().unwrap().details.is_epoch,
            _ => false,
        }
    }

    pub fn is_send(&self) -> bool {
        match self {
            BlockEnum::LegacySend(_) => true,
            BlockEnum::State(_) => self.sideband().unwrap().details.is_send,
            _ => false,
        }
    }

    pub fn is_receive(&self) -> bool {
        match self {
            BlockEnum::LegacyReceive(_) | BlockEnum::LegacyOpen(_) => true,
            BlockEnum::State(_) => self.sideband().unwrap().details.is_receive,
            _ => false,
        }
    }

    pub fn is_change(&self) -> bool {
        match self {
            BlockEnum::LegacyChange(_) => true,
            BlockEnum::State(state) => state.link().is_zero(),
            _ => false,
        }
    }

    pub fn source(&self) -> Option<BlockHash> {
        match self {
            BlockEnum::LegacyOpen(i) => Some(i.source()),
            BlockEnum::LegacyReceive(i) => Some(i.mandatory_source()),
            BlockEnum::State(i) => {
                if i.sideband().unwrap().details.is_receive {
                    Some(i.link().into())
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn destination(&self) -> Option<Account> {
        match self {
            BlockEnum::LegacySend(i) => Some(*i.destination()),
            BlockEnum::State(i) => {
                if i.sideband().unwrap().details.is_send {
                    Some(i.link().into())
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn source_or_link(&self) -> BlockHash {
        self.source_field()
            .unwrap_or_else(|| self.link_field().unwrap_or_default().into())
    }

    pub fn destination_or_link(&self) -> Account {
        self.destination_field()
            .unwrap_or_else(|| self.link_field().unwrap_or_default().into())
    }

    pub fn account(&self) -> Account {
        match self.account_field() {
            Some(account) => account,
            None => self.sideband().unwrap().account,
        }
    }

    pub fn height(&self) -> u64 {
        self.sideband().map(|s| s.height).unwrap_or_default()
    }

    pub fn successor(&self) -> Option<BlockHash> {
        if let Some(sideband) = self.sideband() {
            if !sideband.successor.is_zero() {
                Some(sideband.successor)
            } else {
                None
            }
        } else {
            None
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.sideband().unwrap().details.epoch
    }

    pub fn source_epoch(&self) -> Epoch {
        self.sideband().unwrap().source_epoch
    }

    /// There can be at most two dependencies per block, namely "previous" and "link/source".
    pub fn dependent_blocks(&self, epochs: &Epochs, genesis_account: &Account) -> DependentBlocks {
        match self {
            BlockEnum::LegacySend(_) | BlockEnum::LegacyChange(_) => {
                DependentBlocks::new(self.previous(), BlockHash::zero())
            }
            BlockEnum::LegacyReceive(receive) => {
                DependentBlocks::new(receive.previous(), receive.mandatory_source())
            }
            BlockEnum::LegacyOpen(open) => {
                if &open.account() == genesis_account {
                    DependentBlocks::none()
                } else {
                    DependentBlocks::new(open.source(), BlockHash::zero())
                }
            }
            BlockEnum::State(state) => {
                let link_refers_to_block = !self.is_send() && !epochs.is_epoch_link(&state.link());
                let linked_block = if link_refers_to_block {
                    state.link().into()
                } else {
                    BlockHash::zero()
                };
                DependentBlocks::new(self.previous(), linked_block)
            }
        }
    }
}

impl FullHash for BlockEnum {
    fn full_hash(&self) -> BlockHash {
        self.as_block().full_hash()
    }
}

impl Deref for BlockEnum {
    type Target = dyn Block;

    fn deref(&self) -> &Self::Target {
        match self {
            BlockEnum::LegacySend(b) => b,
            BlockEnum::LegacyReceive(b) => b,
            BlockEnum::LegacyOpen(b) => b,
            BlockEnum::LegacyChange(b) => b,
            BlockEnum::State(b) => b,
        }
    }
}

#[derive(Default)]
pub struct DependentBlocks {
    dependents: [BlockHash; 2],
}

impl DependentBlocks {
    pub fn new(previous: BlockHash, link: BlockHash) -> Self {
        Self {
            dependents: [previous, link],
        }
    }

    pub fn none() -> Self {
        Self::new(BlockHash::zero(), BlockHash::zero())
    }

    pub fn previous(&self) -> Option<BlockHash> {
        self.get_index(0)
    }

    pub fn link(&self) -> Option<BlockHash> {
        self.get_index(1)
    }

    fn get_index(&self, index: usize) -> Option<BlockHash> {
        if self.dependents[index].is_zero() {
            None
        } else {
            Some(self.dependents[index])
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockHash> {
        self.dependents
            .iter()
            .filter(|i| !i.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    #[test]
    fn state_open_root_is_account() {
        let block = BlockBuilder::state().previous(BlockHash::zero()).build();
        assert_eq!(block.root(), block.account().into());
        assert!(block.is_open());
    }

    #[test]
    fn state_root_is_previous() {
        let block = BlockBuilder::state().previous(BlockHash::from(7)).build();
        assert_eq!(block.root(), BlockHash::from(7).into());
    }

    #[test]
    fn qualified_root_combines_root_and_previous() {
        let block = BlockBuilder::state().previous(BlockHash::from(7)).build();
        assert_eq!(
            block.qualified_root(),
            QualifiedRoot::new(block.root(), block.previous())
        );
    }

    #[test]
    fn legacy_block_cannot_follow_state_block() {
        let key = KeyPair::new();
        let send = SendBlock::new(
            &BlockHash::from(1),
            &Account::from(2),
            &Amount::raw(3),
            &key.private_key(),
            &key.public_key(),
            4,
        );
        assert!(!send.valid_predecessor(BlockType::State));
        assert!(send.valid_predecessor(BlockType::LegacySend));
    }

    #[test]
    fn hash_is_stable() {
        let block = BlockEnum::new_test_instance();
        assert_eq!(block.hash(), block.hash());
    }
}
