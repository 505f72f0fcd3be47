use anyhow::Result;
use serde::de::{Unexpected, Visitor};

/// Raw balance in the smallest unit. 10^30 raw make one VLO.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Amount {
    raw: u128, // native endian!
}

pub const VLO_RATIO: u128 = 10u128.pow(24);
pub const MVLO_RATIO: u128 = 10u128.pow(30);

impl Amount {
    pub const MAX: Amount = Amount::raw(u128::MAX);

    pub const fn raw(value: u128) -> Self {
        Self { raw: value }
    }

    pub const fn vlo(value: u128) -> Self {
        Self {
            raw: value * MVLO_RATIO,
        }
    }

    pub const fn zero() -> Self {
        Self::raw(0)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    pub fn from_be_bytes(bytes: [u8; 16]) -> Self {
        Self {
            raw: u128::from_be_bytes(bytes),
        }
    }

    pub fn to_be_bytes(self) -> [u8; 16] {
        self.raw.to_be_bytes()
    }

    pub fn encode_hex(&self) -> String {
        format!("{:032X}", self.raw)
    }

    pub fn decode_hex(s: impl AsRef<str>) -> Result<Self> {
        let value = u128::from_str_radix(s.as_ref(), 16)?;
        Ok(Amount::raw(value))
    }

    pub fn decode_dec(s: impl AsRef<str>) -> Result<Self> {
        Ok(Self::raw(s.as_ref().parse::<u128>()?))
    }

    pub fn to_string_dec(self) -> String {
        self.raw.to_string()
    }

    pub fn number(&self) -> u128 {
        self.raw
    }

    pub fn wrapping_add(&self, other: Amount) -> Amount {
        self.raw.wrapping_add(other.raw).into()
    }

    pub fn wrapping_sub(&self, other: Amount) -> Amount {
        self.raw.wrapping_sub(other.raw).into()
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Amount::raw(value)
    }
}

impl std::fmt::Debug for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.raw += rhs.raw;
    }
}

impl std::ops::SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.raw -= rhs.raw;
    }
}

impl std::ops::Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount::raw(self.raw + rhs.raw)
    }
}

impl std::ops::Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount::raw(self.raw - rhs.raw)
    }
}

impl std::ops::Div<u128> for Amount {
    type Output = Self;

    fn div(self, rhs: u128) -> Self::Output {
        Amount::raw(self.number() / rhs)
    }
}

impl std::ops::Mul<u128> for Amount {
    type Output = Self;

    fn mul(self, rhs: u128) -> Self::Output {
        Amount::raw(self.number() * rhs)
    }
}

impl std::cmp::PartialOrd for Amount {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::cmp::Ord for Amount {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl serde::Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string_dec())
    }
}

impl<'de> serde::Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(AmountVisitor {})
    }
}

struct AmountVisitor {}

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a 128 bit amount in decimal")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        let value = v.parse::<u128>().map_err(|_| {
            serde::de::Error::invalid_value(Unexpected::Str(v), &"a 128 bit decimal string")
        })?;
        Ok(Amount::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_amount_in_vlo() {
        assert_eq!(Amount::vlo(1).to_string_dec(), "1000000000000000000000000000000");
    }

    #[test]
    fn hex_round_trip() {
        let amount = Amount::raw(123456789);
        assert_eq!(Amount::decode_hex(amount.encode_hex()).unwrap(), amount);
    }

    #[test]
    fn serde_serialize() {
        let serialized = serde_json::to_string(&Amount::MAX).unwrap();
        assert_eq!(serialized, "\"340282366920938463463374607431768211455\"");
    }

    #[test]
    fn serde_deserialize() {
        let deserialized: Amount = serde_json::from_str("\"123\"").unwrap();
        assert_eq!(deserialized, Amount::raw(123));
    }
}
