use crate::PublicKey;
use anyhow::Result;
use blake2::{
    digest::{Update, VariableOutput},
    Blake2bVar,
};
use primitive_types::U512;
use serde::de::{Unexpected, Visitor};

crate::u256_struct!(Account);

impl Account {
    pub const MAX: Self = Self::from_bytes([0xFF; 32]);

    pub fn encode_account(&self) -> String {
        let mut number = U512::from_big_endian(&self.0);
        let check = U512::from_little_endian(&self.account_checksum());
        number <<= 40;
        number |= check;

        let mut result = String::with_capacity(65);

        for _i in 0..60 {
            let r = number.byte(0) & 0x1f_u8;
            number >>= 5;
            result.push(account_encode(r));
        }
        result.push_str("_olev"); // velo_
        result.chars().rev().collect()
    }

    fn account_checksum(&self) -> [u8; 5] {
        let mut check = [0u8; 5];
        let mut blake = Blake2bVar::new(check.len()).unwrap();
        blake.update(&self.0);
        blake.finalize_variable(&mut check).unwrap();

        check
    }

    pub fn decode_account(source: impl AsRef<str>) -> Result<Account> {
        EncodedAccountStr(source.as_ref()).to_u512()?.to_account()
    }
}

impl serde::Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.encode_account())
    }
}

impl<'de> serde::Deserialize<'de> for Account {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(AccountVisitor {})
    }
}

struct AccountVisitor {}

impl<'de> Visitor<'de> for AccountVisitor {
    type Value = Account;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("an account in the form \"velo_...\"")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Account::decode_account(v).map_err(|_| {
            serde::de::Error::invalid_value(
                Unexpected::Str(v),
                &"an account in the form \"velo_...\"",
            )
        })
    }
}

struct EncodedAccountU512(U512);

impl EncodedAccountU512 {
    fn account_bytes(&self) -> [u8; 32] {
        let bytes_512 = (self.0 >> 40).to_big_endian();
        let mut bytes_256 = [0u8; 32];
        bytes_256.copy_from_slice(&bytes_512[32..]);
        bytes_256
    }

    fn checksum_bytes(&self) -> [u8; 5] {
        [
            self.0.byte(0),
            self.0.byte(1),
            self.0.byte(2),
            self.0.byte(3),
            self.0.byte(4),
        ]
    }

    fn to_account(&self) -> Result<Account> {
        let account = Account::from_bytes(self.account_bytes());
        if account.account_checksum() == self.checksum_bytes() {
            Ok(account)
        } else {
            Err(anyhow!("invalid checksum"))
        }
    }
}

struct EncodedAccountStr<'a>(&'a str);

impl<'a> EncodedAccountStr<'a> {
    fn is_valid(&self) -> bool {
        self.0.len() > 5
            && self.has_valid_prefix()
            && self.is_length_valid()
            && self.is_first_digit_valid()
    }

    fn has_valid_prefix(&self) -> bool {
        self.0.starts_with("velo_") || self.0.starts_with("velo-")
    }

    fn is_length_valid(&self) -> bool {
        self.0.chars().count() == 65
    }

    fn prefix_len(&self) -> usize {
        5
    }

    fn first_digit(&self) -> Option<char> {
        self.0.chars().nth(self.prefix_len())
    }

    fn is_first_digit_valid(&self) -> bool {
        matches!(self.first_digit(), Some('1') | Some('3'))
    }

    fn chars_after_prefix(&'_ self) -> impl Iterator<Item = char> + '_ {
        self.0.chars().skip(self.prefix_len())
    }

    fn to_u512(&self) -> Result<EncodedAccountU512> {
        if !self.is_valid() {
            bail!("invalid account string");
        }

        let mut number = U512::default();
        for character in self.chars_after_prefix() {
            match self.decode_byte(character) {
                Some(byte) => {
                    number <<= 5;
                    number = number + byte;
                }
                None => bail!("invalid character"),
            }
        }
        Ok(EncodedAccountU512(number))
    }

    fn decode_byte(&self, character: char) -> Option<u8> {
        if character.is_ascii() {
            let character = character as u8;
            if (0x30..0x80).contains(&character) {
                let byte: u8 = account_decode(character);
                if byte != b'~' {
                    return Some(byte);
                }
            }
        }

        None
    }
}

const ACCOUNT_LOOKUP: &[char] = &[
    '1', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k',
    'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'w', 'x', 'y', 'z',
];

const ACCOUNT_REVERSE: &[char] = &[
    '~', '0', '~', '1', '2', '3', '4', '5', '6', '7', '~', '~', '~', '~', '~', '~', '~', '~', '~',
    '~', '~', '~', '~', '~', '~', '~', '~', '~', '~', '~', '~', '~', '~', '~', '~', '~', '~', '~',
    '~', '~', '~', '~', '~', '~', '~', '~', '~', '~', '~', '8', '9', ':', ';', '<', '=', '>', '?',
    '@', 'A', 'B', '~', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', '~', 'L', 'M', 'N', 'O', '~',
    '~', '~', '~', '~',
];

fn account_encode(value: u8) -> char {
    ACCOUNT_LOOKUP[value as usize]
}

fn account_decode(value: u8) -> u8 {
    let mut result = ACCOUNT_REVERSE[(value - 0x30) as usize] as u8;
    if result != b'~' {
        result -= 0x30;
    }
    result
}

impl From<Account> for PublicKey {
    fn from(value: Account) -> Self {
        Self::from_bytes(*value.as_bytes())
    }
}

impl From<&Account> for PublicKey {
    fn from(value: &Account) -> Self {
        Self::from_bytes(*value.as_bytes())
    }
}

impl From<PublicKey> for Account {
    fn from(value: PublicKey) -> Self {
        Self::from_bytes(*value.as_bytes())
    }
}

impl From<&PublicKey> for Account {
    fn from(value: &PublicKey) -> Self {
        Self::from_bytes(*value.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_zero() {
        let account = Account::zero();
        let encoded = account.encode_account();
        assert!(encoded.starts_with("velo_1"));
        assert_eq!(encoded.chars().count(), 65);
        let copy = Account::decode_account(&encoded).expect("decode failed");
        assert_eq!(account, copy);
    }

    #[test]
    fn encode_all() {
        let account = Account::from_bytes([0xFF; 32]);
        let encoded = account.encode_account();
        assert!(encoded.starts_with("velo_3"));
        let copy = Account::decode_account(&encoded).expect("decode failed");
        assert_eq!(account, copy);
    }

    #[test]
    fn encode_fail() {
        let account = Account::zero();
        let mut encoded = account.encode_account();
        encoded.replace_range(16..17, "x");
        assert!(Account::decode_account(&encoded).is_err());
    }

    #[test]
    fn decode_less_than_64_chars() {
        let account = Account::decode_hex("AA").unwrap();
        assert_eq!(
            *account.as_bytes(),
            [
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                0, 0, 0, 0xAA
            ]
        )
    }

    #[test]
    fn serde_round_trip() {
        let account = Account::from(123);
        let serialized = serde_json::to_string(&account).unwrap();
        let deserialized: Account = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, account);
    }
}
