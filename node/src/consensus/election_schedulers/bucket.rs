use crate::consensus::{ActiveElections, ActiveElectionsExt, Election, ElectionBehavior};
use crate::stats::{DetailType, StatType, Stats};
use rsvelo_core::{Amount, Block, BlockEnum, BlockHash, QualifiedRoot};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, Weak};

#[derive(Clone)]
pub struct PriorityBucketConfig {
    /// Maximum number of blocks to sort by priority per bucket
    pub max_blocks: usize,
    /// Number of guaranteed slots per bucket available for election activation
    pub reserved_elections: usize,
    /// Maximum number of slots per bucket
    pub max_elections: usize,
}

impl Default for PriorityBucketConfig {
    fn default() -> Self {
        Self {
            max_blocks: 1024 * 8,
            reserved_elections: 100,
            max_elections: 150,
        }
    }
}

/// Candidate block ordered by arrival time of the account frontier, hash as tiebreak
#[derive(Clone)]
struct BlockEntry {
    time: u64,
    hash: BlockHash,
    block: Arc<BlockEnum>,
}

impl PartialEq for BlockEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.hash == other.hash
    }
}

impl Eq for BlockEntry {}

impl Ord for BlockEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time.cmp(&other.time).then(self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for BlockEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct OrderedElections {
    by_root: HashMap<QualifiedRoot, u64>,
    by_time: BTreeSet<(u64, QualifiedRoot)>,
    elections: HashMap<QualifiedRoot, Arc<Election>>,
}

impl OrderedElections {
    fn insert(&mut self, root: QualifiedRoot, time: u64, election: Arc<Election>) {
        if self.by_root.insert(root, time).is_none() {
            self.by_time.insert((time, root));
            self.elections.insert(root, election);
        }
    }

    fn erase(&mut self, root: &QualifiedRoot) {
        if let Some(time) = self.by_root.remove(root) {
            self.by_time.remove(&(time, *root));
            self.elections.remove(root);
        }
    }

    fn len(&self) -> usize {
        self.by_root.len()
    }

    /// The election with the numerically highest time, i.e. the worst priority
    fn worst(&self) -> Option<(u64, Arc<Election>)> {
        self.by_time
            .iter()
            .next_back()
            .map(|(time, root)| (*time, Arc::clone(self.elections.get(root).unwrap())))
    }
}

/// A partition of election candidates by the send-balance range of the first
/// block. Holds a bounded ordered queue of candidate blocks and an index of
/// the elections this bucket has started.
pub struct Bucket {
    pub minimum_balance: Amount,
    config: PriorityBucketConfig,
    max_per_bucket: usize,
    active: Arc<ActiveElections>,
    stats: Arc<Stats>,
    queue: Mutex<BTreeSet<BlockEntry>>,
    elections: Mutex<OrderedElections>,
}

impl Bucket {
    pub fn new(
        minimum_balance: Amount,
        config: PriorityBucketConfig,
        max_per_bucket: usize,
        active: Arc<ActiveElections>,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            minimum_balance,
            config,
            max_per_bucket,
            active,
            stats,
            queue: Mutex::new(BTreeSet::new()),
            elections: Mutex::new(OrderedElections::default()),
        }
    }

    pub fn can_accept(&self, priority: Amount) -> bool {
        priority >= self.minimum_balance
    }

    /// Inserts the candidate, evicting the worst entry when full.
    /// Returns false if the candidate itself was the one evicted.
    pub fn push(&self, time: u64, block: Arc<BlockEnum>) -> bool {
        let entry = BlockEntry {
            time,
            hash: block.hash(),
            block,
        };
        let mut queue = self.queue.lock().unwrap();
        let inserted = queue.insert(entry.clone());
        if queue.len() > self.config.max_blocks {
            let evicted = queue.iter().next_back().cloned();
            if let Some(evicted) = evicted {
                queue.remove(&evicted);
                if evicted == entry {
                    return false;
                }
            }
        }
        inserted
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn election_count(&self) -> usize {
        self.elections.lock().unwrap().len()
    }

    /// True when the top candidate would be admitted as an election
    pub fn available(&self) -> bool {
        let queue = self.queue.lock().unwrap();
        match queue.iter().next() {
            Some(first) => {
                let elections = self.elections.lock().unwrap();
                self.election_vacancy(first.time, &elections)
            }
            None => false,
        }
    }

    fn election_vacancy(&self, candidate_time: u64, elections: &OrderedElections) -> bool {
        if elections.len() < self.config.reserved_elections {
            return true;
        }
        if elections.len() >= self.config.max_elections {
            return false;
        }
        if self.active.vacancy(ElectionBehavior::Priority) > 0 {
            return true;
        }
        // Compare with the lowest priority election in this bucket; a strictly
        // better candidate replaces it
        match elections.worst() {
            Some((worst_time, _)) => candidate_time < worst_time,
            None => true,
        }
    }
}

pub trait BucketExt {
    /// Hands the top candidate to active elections
    fn activate(&self) -> bool;
    /// Trims elections above the per-bucket limit, worst priority first
    fn update(&self);
}

impl BucketExt for Arc<Bucket> {
    fn activate(&self) -> bool {
        let entry = {
            let mut queue = self.queue.lock().unwrap();
            match queue.iter().next().cloned() {
                Some(first) => {
                    queue.remove(&first);
                    first
                }
                None => return false,
            }
        };

        {
            // Make space by cancelling the worst election when at the limit
            let elections = self.elections.lock().unwrap();
            if elections.len() >= self.config.max_elections {
                if let Some((_, worst)) = elections.worst() {
                    drop(elections);
                    self.active.cancel_election(&worst);
                }
            }
        }

        let bucket_w: Weak<Bucket> = Arc::downgrade(self);
        let erase_callback = Box::new(move |root: &QualifiedRoot| {
            if let Some(bucket) = bucket_w.upgrade() {
                bucket.elections.lock().unwrap().erase(root);
            }
        });

        let (inserted, election) =
            self.active
                .insert(&entry.block, ElectionBehavior::Priority, Some(erase_callback));

        if inserted {
            let election = election.unwrap();
            self.elections.lock().unwrap().insert(
                election.qualified_root,
                entry.time,
                election,
            );
            self.stats
                .inc(StatType::ElectionScheduler, DetailType::Activated);
        } else {
            self.stats
                .inc(StatType::ElectionScheduler, DetailType::ActivateFailed);
        }

        inserted
    }

    fn update(&self) {
        loop {
            let worst = {
                let elections = self.elections.lock().unwrap();
                if elections.len() <= self.max_per_bucket {
                    break;
                }
                elections.worst()
            };
            match worst {
                Some((_, election)) => {
                    self.stats
                        .inc(StatType::ElectionScheduler, DetailType::Trimmed);
                    self.active.cancel_election(&election);
                }
                None => break,
            }
        }
    }
}
