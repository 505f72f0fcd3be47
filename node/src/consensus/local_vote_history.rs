use rsvelo_core::{utils::ContainerInfo, BlockHash, Root, Vote};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Remembers the votes this node has generated per root, so that stale votes
/// can be invalidated when an election winner changes
pub struct LocalVoteHistory {
    mutex: Mutex<HashMap<Root, Vec<LocalVote>>>,
}

struct LocalVote {
    hash: BlockHash,
    vote: Arc<Vote>,
}

impl LocalVoteHistory {
    pub fn new() -> Self {
        Self {
            mutex: Mutex::new(HashMap::new()),
        }
    }

    pub fn add(&self, root: Root, hash: BlockHash, vote: Arc<Vote>) {
        let mut guard = self.mutex.lock().unwrap();
        let entries = guard.entry(root).or_default();
        // A new vote for this root invalidates votes for other hashes
        entries.retain(|entry| entry.hash == hash);
        entries.push(LocalVote { hash, vote });
    }

    pub fn votes(&self, root: &Root, hash: &BlockHash, is_final: bool) -> Vec<Arc<Vote>> {
        let guard = self.mutex.lock().unwrap();
        guard
            .get(root)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| {
                        entry.hash == *hash && (!is_final || entry.vote.is_final())
                    })
                    .map(|entry| Arc::clone(&entry.vote))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn erase(&self, root: &Root) {
        self.mutex.lock().unwrap().remove(root);
    }

    pub fn len(&self) -> usize {
        self.mutex.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn container_info(&self) -> ContainerInfo {
        [(
            "history",
            self.len(),
            std::mem::size_of::<Root>() + std::mem::size_of::<LocalVote>(),
        )]
        .into()
    }
}

impl Default for LocalVoteHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsvelo_core::KeyPair;

    #[test]
    fn add_and_query() {
        let history = LocalVoteHistory::new();
        let keys = KeyPair::new();
        let root = Root::from(1);
        let hash = BlockHash::from(2);
        history.add(root, hash, Arc::new(Vote::new(&keys, 1, vec![hash])));

        assert_eq!(history.votes(&root, &hash, false).len(), 1);
        assert!(history.votes(&root, &hash, true).is_empty());
        assert!(history.votes(&root, &BlockHash::from(3), false).is_empty());
    }

    #[test]
    fn new_hash_invalidates_old_votes() {
        let history = LocalVoteHistory::new();
        let keys = KeyPair::new();
        let root = Root::from(1);
        let first = BlockHash::from(2);
        let second = BlockHash::from(3);
        history.add(root, first, Arc::new(Vote::new(&keys, 1, vec![first])));
        history.add(root, second, Arc::new(Vote::new(&keys, 2, vec![second])));

        assert!(history.votes(&root, &first, false).is_empty());
        assert_eq!(history.votes(&root, &second, false).len(), 1);
    }

    #[test]
    fn erase() {
        let history = LocalVoteHistory::new();
        let keys = KeyPair::new();
        let root = Root::from(1);
        let hash = BlockHash::from(2);
        history.add(root, hash, Arc::new(Vote::new(&keys, 1, vec![hash])));
        history.erase(&root);
        assert!(history.is_empty());
    }
}
