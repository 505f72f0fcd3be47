use super::{PublicKey, RawKey, Signature};
use crate::Account;
use anyhow::Context;
use rand::Rng;

pub struct KeyPair {
    keypair: ed25519_dalek_blake2b::Keypair,
}

impl Default for KeyPair {
    fn default() -> Self {
        let bytes: [u8; 32] = rand::thread_rng().gen();
        Self::from_priv_key_bytes(&bytes).unwrap()
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self::from_priv_key_bytes(self.keypair.secret.as_bytes()).unwrap()
    }
}

impl KeyPair {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn zero() -> Self {
        Self::from_priv_key_bytes(&[0u8; 32]).unwrap()
    }

    pub fn from_priv_key_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let secret = ed25519_dalek_blake2b::SecretKey::from_bytes(bytes)
            .map_err(|_| anyhow!("could not load secret key"))?;
        let public = ed25519_dalek_blake2b::PublicKey::from(&secret);
        Ok(Self {
            keypair: ed25519_dalek_blake2b::Keypair { secret, public },
        })
    }

    pub fn from_priv_key_hex(s: impl AsRef<str>) -> anyhow::Result<Self> {
        let input = s.as_ref();
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(input, &mut bytes)
            .with_context(|| format!("input string: '{}'", input))?;
        Self::from_priv_key_bytes(&bytes)
    }

    pub fn account(&self) -> Account {
        Account::from_bytes(self.keypair.public.to_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_bytes(self.keypair.public.to_bytes())
    }

    pub fn private_key(&self) -> RawKey {
        RawKey::from_bytes(self.keypair.secret.to_bytes())
    }
}

impl From<u64> for KeyPair {
    fn from(value: u64) -> Self {
        let mut bytes = [0; 32];
        bytes[..8].copy_from_slice(&value.to_be_bytes());
        Self::from_priv_key_bytes(&bytes).unwrap()
    }
}

impl From<RawKey> for KeyPair {
    fn from(value: RawKey) -> Self {
        Self::from_priv_key_bytes(value.as_bytes()).unwrap()
    }
}

pub fn sign_message(private_key: &RawKey, public_key: &PublicKey, data: &[u8]) -> Signature {
    let secret = ed25519_dalek_blake2b::SecretKey::from_bytes(private_key.as_bytes())
        .expect("could not extract secret key");
    let public = ed25519_dalek_blake2b::PublicKey::from_bytes(public_key.as_bytes())
        .expect("could not extract public key");
    let expanded = ed25519_dalek_blake2b::ExpandedSecretKey::from(&secret);
    let signature = expanded.sign(data, &public);
    Signature::from_bytes(signature.to_bytes())
}

pub fn validate_message(
    public_key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> anyhow::Result<()> {
    let public = ed25519_dalek_blake2b::PublicKey::from_bytes(public_key.as_bytes())
        .map_err(|_| anyhow!("could not extract public key"))?;
    let sig = ed25519_dalek_blake2b::Signature::from_bytes(signature.as_bytes())
        .map_err(|_| anyhow!("invalid signature bytes"))?;
    public
        .verify_strict(message, &sig)
        .map_err(|_| anyhow!("could not verify message"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_validate() -> anyhow::Result<()> {
        let keypair = KeyPair::new();
        let data = [0u8; 32];
        let signature = sign_message(&keypair.private_key(), &keypair.public_key(), &data);
        validate_message(&keypair.public_key(), &data, &signature)?;
        Ok(())
    }

    #[test]
    fn tampered_signature_fails() {
        let keypair = KeyPair::new();
        let data = [0u8; 32];
        let mut signature = sign_message(&keypair.private_key(), &keypair.public_key(), &data);
        signature.make_invalid();
        assert!(validate_message(&keypair.public_key(), &data, &signature).is_err());
    }

    #[test]
    fn signing_same_message_twice_produces_equal_signatures() {
        let keypair = KeyPair::new();
        let data = [1, 2, 3];
        let signature_a = sign_message(&keypair.private_key(), &keypair.public_key(), &data);
        let signature_b = sign_message(&keypair.private_key(), &keypair.public_key(), &data);
        assert_eq!(signature_a, signature_b);
    }
}
