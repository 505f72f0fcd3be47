#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate num_derive;

mod account;
pub use account::Account;

mod amount;
pub use amount::{Amount, MVLO_RATIO, VLO_RATIO};

mod block_hash;
pub use block_hash::{BlockHash, BlockHashBuilder};

mod key_pair;
pub use key_pair::{sign_message, validate_message, KeyPair};

mod raw_key;
pub use raw_key::RawKey;

mod signature;
pub use signature::Signature;

mod u256_struct;

pub mod utils;

mod qualified_root;
pub use qualified_root::QualifiedRoot;

mod account_info;
pub use account_info::AccountInfo;

mod epoch;
pub use epoch::{Epoch, Epochs};

mod confirmation_height_info;
pub use confirmation_height_info::ConfirmationHeightInfo;

mod pending_key;
pub use pending_key::PendingKey;

mod pending_info;
pub use pending_info::PendingInfo;

mod difficulty;
pub use difficulty::{Difficulty, DifficultyV1, StubDifficulty, WorkVersion};

mod blocks;
pub use blocks::*;

pub mod work;

mod unchecked_info;
pub use unchecked_info::{UncheckedInfo, UncheckedKey};

mod vote;
pub use vote::{Vote, VoteCode, VoteSource, VoteWithWeightInfo};

use blake2::{
    digest::{Update, VariableOutput},
    Blake2bVar,
};
use once_cell::sync::Lazy;
use std::fmt::Write;

pub fn write_hex_bytes(bytes: &[u8], f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
    for &byte in bytes {
        write!(f, "{:02X}", byte)?;
    }
    Ok(())
}

pub fn to_hex_string(i: u64) -> String {
    format!("{:016X}", i)
}

pub fn u64_from_hex_str(s: impl AsRef<str>) -> Result<u64, std::num::ParseIntError> {
    u64::from_str_radix(s.as_ref(), 16)
}

u256_struct!(HashOrAccount);
u256_struct!(Link);
u256_struct!(PublicKey);
u256_struct!(Root);

impl serde::Serialize for Root {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.encode_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Root {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = <String as serde::Deserialize>::deserialize(deserializer)?;
        Root::decode_hex(&value).map_err(|_| serde::de::Error::custom("could not decode root"))
    }
}

impl From<HashOrAccount> for Account {
    fn from(source: HashOrAccount) -> Self {
        Account::from_bytes(*source.as_bytes())
    }
}

impl From<&HashOrAccount> for Account {
    fn from(source: &HashOrAccount) -> Self {
        Account::from_bytes(*source.as_bytes())
    }
}

impl From<Link> for Account {
    fn from(link: Link) -> Self {
        Account::from_bytes(*link.as_bytes())
    }
}

impl From<&Link> for Account {
    fn from(link: &Link) -> Self {
        Account::from_bytes(*link.as_bytes())
    }
}

impl From<Root> for Account {
    fn from(root: Root) -> Self {
        Account::from_bytes(*root.as_bytes())
    }
}

impl From<Account> for Link {
    fn from(account: Account) -> Self {
        Link::from_bytes(*account.as_bytes())
    }
}

impl From<&Account> for Link {
    fn from(account: &Account) -> Self {
        Link::from_bytes(*account.as_bytes())
    }
}

impl From<BlockHash> for Link {
    fn from(hash: BlockHash) -> Self {
        Link::from_bytes(*hash.as_bytes())
    }
}

impl From<HashOrAccount> for BlockHash {
    fn from(source: HashOrAccount) -> Self {
        BlockHash::from_bytes(*source.as_bytes())
    }
}

impl From<&HashOrAccount> for BlockHash {
    fn from(source: &HashOrAccount) -> Self {
        BlockHash::from_bytes(*source.as_bytes())
    }
}

impl From<Link> for BlockHash {
    fn from(link: Link) -> Self {
        BlockHash::from_bytes(*link.as_bytes())
    }
}

impl From<Root> for BlockHash {
    fn from(root: Root) -> Self {
        BlockHash::from_bytes(*root.as_bytes())
    }
}

impl From<Account> for HashOrAccount {
    fn from(account: Account) -> Self {
        HashOrAccount::from_bytes(*account.as_bytes())
    }
}

impl From<BlockHash> for HashOrAccount {
    fn from(hash: BlockHash) -> Self {
        HashOrAccount::from_bytes(*hash.as_bytes())
    }
}

impl From<Link> for HashOrAccount {
    fn from(link: Link) -> Self {
        HashOrAccount::from_bytes(*link.as_bytes())
    }
}

impl From<PublicKey> for Root {
    fn from(key: PublicKey) -> Self {
        Root::from_bytes(*key.as_bytes())
    }
}

impl From<Account> for Root {
    fn from(account: Account) -> Self {
        Root::from_bytes(*account.as_bytes())
    }
}

impl From<&Account> for Root {
    fn from(account: &Account) -> Self {
        Root::from_bytes(*account.as_bytes())
    }
}

impl From<BlockHash> for Root {
    fn from(hash: BlockHash) -> Self {
        Root::from_bytes(*hash.as_bytes())
    }
}

impl From<&BlockHash> for Root {
    fn from(hash: &BlockHash) -> Self {
        Root::from_bytes(*hash.as_bytes())
    }
}

pub trait FullHash {
    fn full_hash(&self) -> BlockHash;
}

pub fn deterministic_key(seed: &RawKey, index: u32) -> RawKey {
    let mut buffer = [0; 32];
    let mut hasher = Blake2bVar::new(buffer.len()).unwrap();
    hasher.update(seed.as_bytes());
    hasher.update(&index.to_be_bytes());
    hasher.finalize_variable(&mut buffer).unwrap();
    RawKey::from_bytes(buffer)
}

/**
 * Network variants with different genesis blocks and work parameters
 */
#[repr(u16)]
#[derive(Clone, Copy, FromPrimitive, PartialEq, Eq, Debug)]
pub enum Networks {
    Invalid = 0x0,
    // Low work parameters, publicly known genesis key, dev IP ports
    VeloDevNetwork = 0x5641, // 'V', 'A'
    // Normal work parameters, secret beta genesis key, beta IP ports
    VeloBetaNetwork = 0x5642, // 'V', 'B'
    // Normal work parameters, secret live key, live IP ports
    VeloLiveNetwork = 0x5643, // 'V', 'C'
}

impl Networks {
    pub fn as_str(&self) -> &str {
        match self {
            Networks::Invalid => "invalid",
            Networks::VeloDevNetwork => "dev",
            Networks::VeloBetaNetwork => "beta",
            Networks::VeloLiveNetwork => "live",
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Networks::VeloDevNetwork)
    }
}

pub fn epoch_v1_link() -> Link {
    let mut link_bytes = [0u8; 32];
    link_bytes[..14].copy_from_slice(b"epoch v1 block");
    Link::from_bytes(link_bytes)
}

pub fn epoch_v2_link() -> Link {
    let mut link_bytes = [0u8; 32];
    link_bytes[..14].copy_from_slice(b"epoch v2 block");
    Link::from_bytes(link_bytes)
}

static DEV_PRIVATE_KEY_DATA: &str =
    "28B2C6F3B5B3E1A2D4F0A9C7E65D1B08F3A67D902B1E4C5D8A9F0B3C6E2D7A14";

pub static DEV_GENESIS_KEY: Lazy<KeyPair> =
    Lazy::new(|| KeyPair::from_priv_key_hex(DEV_PRIVATE_KEY_DATA).unwrap());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_key_is_stable() {
        let seed = RawKey::from(1);
        assert_eq!(deterministic_key(&seed, 3), deterministic_key(&seed, 3));
        assert_ne!(deterministic_key(&seed, 3), deterministic_key(&seed, 4));
    }

    #[test]
    fn hash_or_account_conversions() {
        let hash = BlockHash::from(42);
        let converted: HashOrAccount = hash.into();
        assert_eq!(BlockHash::from(converted), hash);
    }
}
