use crate::{BlockHash, Root};

/// Uniquely identifies a fork point: the root plus the previous block hash.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct QualifiedRoot {
    pub root: Root,
    pub previous: BlockHash,
}

impl QualifiedRoot {
    pub fn new(root: Root, previous: BlockHash) -> Self {
        Self { root, previous }
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut buffer = [0; 64];
        buffer[..32].copy_from_slice(self.root.as_bytes());
        buffer[32..].copy_from_slice(self.previous.as_bytes());
        buffer
    }

    pub fn new_test_instance() -> Self {
        Self::new(Root::from(111), BlockHash::from(222))
    }
}

impl std::fmt::Debug for QualifiedRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.root, self.previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_bytes_concatenates_root_and_previous() {
        let root = QualifiedRoot::new_test_instance();
        let bytes = root.to_bytes();
        assert_eq!(&bytes[..32], root.root.as_bytes());
        assert_eq!(&bytes[32..], root.previous.as_bytes());
    }
}
