use crate::Account;
use blake2::{
    digest::{Update, VariableOutput},
    Blake2bVar,
};

crate::u256_struct!(BlockHash);

impl serde::Serialize for BlockHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.encode_hex())
    }
}

impl<'de> serde::Deserialize<'de> for BlockHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = <String as serde::Deserialize>::deserialize(deserializer)?;
        BlockHash::decode_hex(&value)
            .map_err(|_| serde::de::Error::custom("could not decode block hash"))
    }
}

impl From<Account> for BlockHash {
    fn from(account: Account) -> Self {
        BlockHash::from_bytes(*account.as_bytes())
    }
}

impl From<&Account> for BlockHash {
    fn from(account: &Account) -> Self {
        BlockHash::from_bytes(*account.as_bytes())
    }
}

pub struct BlockHashBuilder {
    blake: Blake2bVar,
}

impl Default for BlockHashBuilder {
    fn default() -> Self {
        Self {
            blake: Blake2bVar::new(32).unwrap(),
        }
    }
}

impl BlockHashBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn update(mut self, data: impl AsRef<[u8]>) -> Self {
        self.blake.update(data.as_ref());
        self
    }

    pub fn build(self) -> BlockHash {
        let mut hash_bytes = [0u8; 32];
        self.blake.finalize_variable(&mut hash_bytes).unwrap();
        BlockHash::from_bytes(hash_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_builder_is_deterministic() {
        let a = BlockHashBuilder::new().update(b"hello").build();
        let b = BlockHashBuilder::new().update(b"hello").build();
        assert_eq!(a, b);
        assert_ne!(a, BlockHashBuilder::new().update(b"world").build());
    }

    #[test]
    fn decode_hex_pads_left() {
        let hash = BlockHash::decode_hex("AB").unwrap();
        assert_eq!(hash, BlockHash::from(0xAB_u64));
    }
}
