use crate::{Link, PublicKey};
use std::collections::HashMap;

#[repr(u8)]
#[derive(Clone, Copy, FromPrimitive, PartialEq, Eq, Debug, PartialOrd, Ord, Hash)]
pub enum Epoch {
    Invalid = 0,
    Unspecified = 1,
    Epoch0 = 2,
    Epoch1 = 3,
    Epoch2 = 4,
}

impl Epoch {
    pub const MAX: Epoch = Epoch::Epoch2;
}

impl Default for Epoch {
    fn default() -> Self {
        Epoch::Epoch0
    }
}

#[derive(Default, Clone)]
pub struct Epochs {
    epochs: HashMap<Epoch, EpochInfo>,
}

#[derive(Clone)]
struct EpochInfo {
    signer: PublicKey,
    link: Link,
}

impl Epochs {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add(&mut self, epoch: Epoch, signer: PublicKey, link: Link) {
        self.epochs.insert(epoch, EpochInfo { signer, link });
    }

    pub fn is_epoch_link(&self, link: &Link) -> bool {
        self.epochs.values().any(|i| &i.link == link)
    }

    pub fn link(&self, epoch: Epoch) -> Option<&Link> {
        self.epochs.get(&epoch).map(|i| &i.link)
    }

    pub fn signer(&self, epoch: Epoch) -> Option<&PublicKey> {
        self.epochs.get(&epoch).map(|i| &i.signer)
    }

    pub fn epoch(&self, link: &Link) -> Option<Epoch> {
        for (&epoch, info) in &self.epochs {
            if &info.link == link {
                return Some(epoch);
            }
        }

        None
    }

    /// Checks that new epoch is 1 version higher than epoch
    pub fn is_sequential(epoch: Epoch, new_epoch: Epoch) -> bool {
        // Currently assumes that the epoch versions in the enum are sequential.
        let epoch_id = epoch as u8;
        let new_epoch_id = new_epoch as u8;
        epoch_id >= Epoch::Epoch0 as u8 && new_epoch_id == epoch_id + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_sequential() {
        assert!(Epochs::is_sequential(Epoch::Epoch0, Epoch::Epoch1));
        assert!(Epochs::is_sequential(Epoch::Epoch1, Epoch::Epoch2));

        assert!(!Epochs::is_sequential(Epoch::Epoch0, Epoch::Epoch2));
        assert!(!Epochs::is_sequential(Epoch::Epoch0, Epoch::Invalid));
        assert!(!Epochs::is_sequential(Epoch::Unspecified, Epoch::Epoch1));
        assert!(!Epochs::is_sequential(Epoch::Epoch1, Epoch::Epoch0));
        assert!(!Epochs::is_sequential(Epoch::Epoch2, Epoch::Epoch2));
    }

    #[test]
    fn epoch_link_lookup() {
        let mut epochs = Epochs::new();
        let link = Link::from(42);
        epochs.add(Epoch::Epoch1, PublicKey::from(7), link);
        assert!(epochs.is_epoch_link(&link));
        assert!(!epochs.is_epoch_link(&Link::from(43)));
        assert_eq!(epochs.epoch(&link), Some(Epoch::Epoch1));
        assert_eq!(epochs.signer(Epoch::Epoch1), Some(&PublicKey::from(7)));
    }
}
