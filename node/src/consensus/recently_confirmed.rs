use super::ElectionStatus;
use bounded_vec_deque::BoundedVecDeque;
use rsvelo_core::{utils::ContainerInfo, BlockHash, QualifiedRoot};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Bounded FIFO of recently confirmed election roots, used to suppress
/// re-creating an election whose outcome is already decided
pub struct RecentlyConfirmedCache {
    mutex: Mutex<RecentlyConfirmedCacheImpl>,
    max_len: usize,
}

struct RecentlyConfirmedCacheImpl {
    sequenced: VecDeque<(QualifiedRoot, BlockHash)>,
    by_root: HashMap<QualifiedRoot, BlockHash>,
    by_hash: HashMap<BlockHash, QualifiedRoot>,
}

impl RecentlyConfirmedCache {
    pub fn new(max_len: usize) -> Self {
        Self {
            mutex: Mutex::new(RecentlyConfirmedCacheImpl {
                sequenced: VecDeque::new(),
                by_root: HashMap::new(),
                by_hash: HashMap::new(),
            }),
            max_len,
        }
    }

    pub fn put(&self, root: QualifiedRoot, hash: BlockHash) {
        let mut guard = self.mutex.lock().unwrap();
        if guard.by_root.contains_key(&root) {
            return;
        }
        guard.sequenced.push_back((root, hash));
        guard.by_root.insert(root, hash);
        guard.by_hash.insert(hash, root);
        while guard.sequenced.len() > self.max_len {
            if let Some((old_root, old_hash)) = guard.sequenced.pop_front() {
                guard.by_root.remove(&old_root);
                guard.by_hash.remove(&old_hash);
            }
        }
    }

    pub fn root_exists(&self, root: &QualifiedRoot) -> bool {
        self.mutex.lock().unwrap().by_root.contains_key(root)
    }

    pub fn hash_exists(&self, hash: &BlockHash) -> bool {
        self.mutex.lock().unwrap().by_hash.contains_key(hash)
    }

    pub fn back(&self) -> Option<(QualifiedRoot, BlockHash)> {
        self.mutex.lock().unwrap().sequenced.back().cloned()
    }

    pub fn erase(&self, hash: &BlockHash) {
        let mut guard = self.mutex.lock().unwrap();
        if let Some(root) = guard.by_hash.remove(hash) {
            guard.by_root.remove(&root);
            guard.sequenced.retain(|(r, _)| r != &root);
        }
    }

    pub fn len(&self) -> usize {
        self.mutex.lock().unwrap().sequenced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut guard = self.mutex.lock().unwrap();
        guard.sequenced.clear();
        guard.by_root.clear();
        guard.by_hash.clear();
    }

    pub fn container_info(&self) -> ContainerInfo {
        [(
            "confirmed",
            self.len(),
            std::mem::size_of::<QualifiedRoot>() + std::mem::size_of::<BlockHash>(),
        )]
        .into()
    }
}

/// Bounded FIFO of statuses of recently cemented elections, for the
/// confirmation history surface
pub struct RecentlyCementedCache {
    cemented: Mutex<BoundedVecDeque<ElectionStatus>>,
}

impl RecentlyCementedCache {
    pub fn new(max_len: usize) -> Self {
        Self {
            cemented: Mutex::new(BoundedVecDeque::new(max_len)),
        }
    }

    pub fn put(&self, status: ElectionStatus) {
        self.cemented.lock().unwrap().push_back(status);
    }

    pub fn list(&self) -> Vec<ElectionStatus> {
        self.cemented.lock().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.cemented.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn container_info(&self) -> ContainerInfo {
        [(
            "cemented",
            self.len(),
            std::mem::size_of::<ElectionStatus>(),
        )]
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_lookup() {
        let cache = RecentlyConfirmedCache::new(8);
        let root = QualifiedRoot::new_test_instance();
        let hash = BlockHash::from(7);
        cache.put(root, hash);

        assert!(cache.root_exists(&root));
        assert!(cache.hash_exists(&hash));
        assert_eq!(cache.back(), Some((root, hash)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn bounded_fifo() {
        let cache = RecentlyConfirmedCache::new(2);
        for i in 0..4_u64 {
            cache.put(
                QualifiedRoot::new(i.into(), BlockHash::zero()),
                BlockHash::from(i),
            );
        }
        assert_eq!(cache.len(), 2);
        assert!(!cache.hash_exists(&BlockHash::from(0_u64)));
        assert!(!cache.hash_exists(&BlockHash::from(1_u64)));
        assert!(cache.hash_exists(&BlockHash::from(2_u64)));
        assert!(cache.hash_exists(&BlockHash::from(3_u64)));
    }

    #[test]
    fn erase() {
        let cache = RecentlyConfirmedCache::new(8);
        let root = QualifiedRoot::new_test_instance();
        let hash = BlockHash::from(7);
        cache.put(root, hash);
        cache.erase(&hash);
        assert!(!cache.root_exists(&root));
        assert!(cache.is_empty());
    }

    #[test]
    fn cemented_history_is_bounded() {
        let cache = RecentlyCementedCache::new(2);
        for _ in 0..4 {
            cache.put(ElectionStatus::default());
        }
        assert_eq!(cache.len(), 2);
    }
}
