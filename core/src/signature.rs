use std::fmt::Write;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    bytes: [u8; 64],
}

impl Signature {
    pub fn new() -> Self {
        Self { bytes: [0; 64] }
    }

    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&'_ self) -> &'_ [u8; 64] {
        &self.bytes
    }

    pub fn encode_hex(&self) -> String {
        let mut result = String::with_capacity(128);
        for &byte in self.bytes.iter() {
            write!(&mut result, "{:02X}", byte).unwrap();
        }
        result
    }

    pub fn decode_hex(s: impl AsRef<str>) -> anyhow::Result<Self> {
        let mut bytes = [0u8; 64];
        hex::decode_to_slice(s.as_ref(), &mut bytes)?;
        Ok(Signature::from_bytes(bytes))
    }

    pub fn make_invalid(&mut self) {
        self.bytes[31] ^= 1;
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let mut signature = Signature::new();
        signature.make_invalid();
        let decoded = Signature::decode_hex(signature.encode_hex()).unwrap();
        assert_eq!(decoded, signature);
    }
}
