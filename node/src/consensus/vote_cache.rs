use rsvelo_core::{utils::ContainerInfo, Account, Amount, BlockHash, Vote};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct VoteCacheConfig {
    pub max_size: usize,
    pub max_voters: usize,
    pub age_cutoff: Duration,
}

impl Default for VoteCacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1024 * 64,
            max_voters: 64,
            age_cutoff: Duration::from_secs(5 * 60),
        }
    }
}

struct VoterEntry {
    representative: Account,
    vote: Arc<Vote>,
}

struct CacheEntry {
    voters: Vec<VoterEntry>,
    last_vote: Instant,
}

impl CacheEntry {
    fn new() -> Self {
        Self {
            voters: Vec::new(),
            last_vote: Instant::now(),
        }
    }

    /// Adds the vote, replacing any older vote from the same representative.
    /// Returns false if the voter list is full.
    fn vote(&mut self, representative: Account, vote: &Arc<Vote>, max_voters: usize) -> bool {
        self.last_vote = Instant::now();
        if let Some(existing) = self
            .voters
            .iter_mut()
            .find(|entry| entry.representative == representative)
        {
            if vote.timestamp() > existing.vote.timestamp() {
                existing.vote = Arc::clone(vote);
            }
            return true;
        }
        if self.voters.len() >= max_voters {
            return false;
        }
        self.voters.push(VoterEntry {
            representative,
            vote: Arc::clone(vote),
        });
        true
    }
}

/// An entry eligible for election hinting, ordered by tally
pub struct TopEntry {
    pub hash: BlockHash,
    pub tally: Amount,
    pub final_tally: Amount,
}

/// Bounded cache of votes for hashes that currently have no active election.
/// Consulted when elections start so no vote weight is lost.
pub struct VoteCache {
    config: VoteCacheConfig,
    cache: HashMap<BlockHash, CacheEntry>,
    sequenced: VecDeque<BlockHash>,
    rep_weight_query: Box<dyn Fn(&Account) -> Amount + Send + Sync>,
}

impl VoteCache {
    pub fn new(
        config: VoteCacheConfig,
        rep_weight_query: Box<dyn Fn(&Account) -> Amount + Send + Sync>,
    ) -> Self {
        Self {
            config,
            cache: HashMap::new(),
            sequenced: VecDeque::new(),
            rep_weight_query,
        }
    }

    pub fn insert(&mut self, vote: &Arc<Vote>) {
        let representative = vote.voting_account;
        if (self.rep_weight_query)(&representative).is_zero() {
            return;
        }

        for hash in vote.hashes.clone() {
            if !self.cache.contains_key(&hash) {
                while self.sequenced.len() >= self.config.max_size {
                    if let Some(oldest) = self.sequenced.pop_front() {
                        self.cache.remove(&oldest);
                    }
                }
                self.cache.insert(hash, CacheEntry::new());
                self.sequenced.push_back(hash);
            }
            let entry = self.cache.get_mut(&hash).unwrap();
            entry.vote(representative, vote, self.config.max_voters);
        }
    }

    /// All cached votes for the given hash
    pub fn find(&self, hash: &BlockHash) -> Vec<Arc<Vote>> {
        self.cache
            .get(hash)
            .map(|entry| entry.voters.iter().map(|v| Arc::clone(&v.vote)).collect())
            .unwrap_or_default()
    }

    pub fn tally(&self, hash: &BlockHash) -> Amount {
        let mut result = Amount::zero();
        if let Some(entry) = self.cache.get(hash) {
            for voter in &entry.voters {
                result += (self.rep_weight_query)(&voter.representative);
            }
        }
        result
    }

    /// Entries above `min_tally`, best tally first, for the hinted scheduler
    pub fn top(&self, min_tally: Amount) -> Vec<TopEntry> {
        let mut results = Vec::new();
        for hash in &self.sequenced {
            let tally = self.tally(hash);
            if tally < min_tally {
                continue;
            }
            let mut final_tally = Amount::zero();
            if let Some(entry) = self.cache.get(hash) {
                for voter in &entry.voters {
                    if voter.vote.is_final() {
                        final_tally += (self.rep_weight_query)(&voter.representative);
                    }
                }
            }
            results.push(TopEntry {
                hash: *hash,
                tally,
                final_tally,
            });
        }
        results.sort_by(|a, b| b.tally.cmp(&a.tally));
        results
    }

    pub fn erase(&mut self, hash: &BlockHash) {
        if self.cache.remove(hash).is_some() {
            self.sequenced.retain(|h| h != hash);
        }
    }

    /// Evicts entries that have not seen a vote within the age cutoff
    pub fn cleanup(&mut self) {
        let cutoff = Instant::now() - self.config.age_cutoff;
        let stale: Vec<BlockHash> = self
            .cache
            .iter()
            .filter(|(_, entry)| entry.last_vote < cutoff)
            .map(|(hash, _)| *hash)
            .collect();
        for hash in stale {
            self.erase(&hash);
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.sequenced.clear();
    }

    pub fn container_info(&self) -> ContainerInfo {
        [(
            "cache",
            self.len(),
            std::mem::size_of::<BlockHash>() + std::mem::size_of::<CacheEntry>(),
        )]
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsvelo_core::KeyPair;

    fn test_cache() -> VoteCache {
        VoteCache::new(
            VoteCacheConfig::default(),
            Box::new(|_| Amount::raw(100)), // every representative has weight 100
        )
    }

    #[test]
    fn insert_and_find() {
        let mut cache = test_cache();
        let keys = KeyPair::new();
        let hash = BlockHash::from(1);
        let vote = Arc::new(Vote::new(&keys, 1, vec![hash]));

        cache.insert(&vote);

        assert_eq!(cache.find(&hash).len(), 1);
        assert_eq!(cache.tally(&hash), Amount::raw(100));
        assert!(cache.find(&BlockHash::from(2)).is_empty());
    }

    #[test]
    fn repeated_vote_from_same_rep_counts_once() {
        let mut cache = test_cache();
        let keys = KeyPair::new();
        let hash = BlockHash::from(1);

        cache.insert(&Arc::new(Vote::new(&keys, 1, vec![hash])));
        cache.insert(&Arc::new(Vote::new(&keys, 2, vec![hash])));

        assert_eq!(cache.find(&hash).len(), 1);
        assert_eq!(cache.tally(&hash), Amount::raw(100));
    }

    #[test]
    fn top_orders_by_tally() {
        let mut cache = test_cache();
        let first = BlockHash::from(1);
        let second = BlockHash::from(2);
        cache.insert(&Arc::new(Vote::new(&KeyPair::new(), 1, vec![first])));
        cache.insert(&Arc::new(Vote::new(&KeyPair::new(), 1, vec![second])));
        cache.insert(&Arc::new(Vote::new(&KeyPair::new(), 1, vec![second])));

        let top = cache.top(Amount::zero());
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].hash, second);
        assert_eq!(top[0].tally, Amount::raw(200));
    }

    #[test]
    fn erase() {
        let mut cache = test_cache();
        let hash = BlockHash::from(1);
        cache.insert(&Arc::new(Vote::new(&KeyPair::new(), 1, vec![hash])));
        cache.erase(&hash);
        assert!(cache.is_empty());
    }
}
