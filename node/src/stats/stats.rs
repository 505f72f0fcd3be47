use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::debug;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum StatType {
    Ledger,
    Blockprocessor,
    BlockprocessorResult,
    BlockprocessorSource,
    BlockprocessorOverfill,
    Active,
    ActiveStarted,
    ActiveElections,
    ActiveConfirmed,
    ActiveDropped,
    ActiveTimeout,
    Election,
    ConfirmingSet,
    ElectionScheduler,
    ManualScheduler,
    OptimisticScheduler,
    Hinting,
    VoteCache,
    Unchecked,
    Backlog,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum DetailType {
    All,

    // blockprocessor
    Process,
    ProcessBlocking,
    ProcessBlockingTimeout,
    Overfill,
    Force,
    QueueOverflow,

    // block sources
    Unknown,
    Live,
    Bootstrap,
    Unchecked,
    Local,
    Forced,

    // block statuses
    Progress,
    BadSignature,
    Old,
    NegativeSpend,
    Fork,
    Unreceivable,
    GapPrevious,
    GapSource,
    GapEpochOpenPending,
    OpenedBurnAccount,
    BalanceMismatch,
    RepresentativeMismatch,
    BlockPosition,
    InsufficientWork,

    // ledger
    Rollback,
    RollbackFailed,

    // active elections
    Loop,
    EraseOldest,
    ElectionBlockConflict,
    Manual,
    Priority,
    Hinted,
    Optimistic,

    // election
    VoteNew,
    VoteCached,
    BroadcastVote,
    BroadcastVoteNormal,
    BroadcastVoteFinal,
    BroadcastBlockInitial,
    BroadcastBlockRepeat,
    ConfirmOnce,
    Expired,
    Cancelled,

    // confirming set
    Insert,
    Duplicate,
    Cementing,
    Cemented,
    AlreadyCemented,
    CementingFailed,
    MissingBlock,
    Notify,
    NotifyIntermediate,
    Cooldown,

    // scheduler
    Activated,
    ActivateSkip,
    ActivateFailed,
    ActivateFull,
    Cleanup,
    Trimmed,

    // unchecked
    Put,
    Satisfied,
    Trigger,

    // backlog
    Total,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum Direction {
    In,
    Out,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum Sample {
    ActiveElectionDuration,
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
struct CounterKey {
    stat_type: StatType,
    detail: DetailType,
    dir: Direction,
}

impl CounterKey {
    fn new(stat_type: StatType, detail: DetailType, dir: Direction) -> Self {
        Self {
            stat_type,
            detail,
            dir,
        }
    }
}

struct CounterEntry(AtomicU64);

impl CounterEntry {
    fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    fn add(&self, value: u64) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }

    fn count(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

struct SamplerEntry {
    samples: RwLock<Vec<i64>>,
    max_samples: usize,
    pub expected_min_max: (i64, i64),
}

impl SamplerEntry {
    fn new(max_samples: usize, expected_min_max: (i64, i64)) -> Self {
        Self {
            samples: RwLock::new(Vec::new()),
            max_samples,
            expected_min_max,
        }
    }

    fn add(&self, value: i64) {
        let mut guard = self.samples.write().unwrap();
        if guard.len() >= self.max_samples {
            guard.remove(0);
        }
        guard.push(value);
    }

    fn collect(&self) -> Vec<i64> {
        std::mem::take(&mut *self.samples.write().unwrap())
    }
}

/// Registry of event counters and samplers
pub struct Stats {
    mutables: RwLock<StatMutables>,
    enable_logging: bool,
    max_samples: usize,
}

struct StatMutables {
    counters: BTreeMap<CounterKey, CounterEntry>,
    samplers: BTreeMap<Sample, SamplerEntry>,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            mutables: RwLock::new(StatMutables {
                counters: BTreeMap::new(),
                samplers: BTreeMap::new(),
            }),
            enable_logging: rsvelo_core::utils::get_env_bool("VELO_LOG_STATS").unwrap_or(false),
            max_samples: 1024,
        }
    }

    /// Add `value` to the given counter
    pub fn add_dir(&self, stat_type: StatType, detail: DetailType, dir: Direction, value: u64) {
        if value == 0 {
            return;
        }

        if self.enable_logging {
            debug!("Stat: {:?}::{:?}::{:?} += {}", stat_type, detail, dir, value);
        }

        let key = CounterKey::new(stat_type, detail, dir);

        // This is a two-step process to avoid exclusively locking the mutex in the common case
        {
            let lock = self.mutables.read().unwrap();
            if let Some(counter) = lock.counters.get(&key) {
                counter.add(value);
                return;
            }
        }
        // Not found, create a new entry
        {
            let mut lock = self.mutables.write().unwrap();
            let counter = lock.counters.entry(key).or_insert_with(CounterEntry::new);
            counter.add(value);
        }
    }

    pub fn add(&self, stat_type: StatType, detail: DetailType, value: u64) {
        self.add_dir(stat_type, detail, Direction::In, value)
    }

    pub fn inc(&self, stat_type: StatType, detail: DetailType) {
        self.add_dir(stat_type, detail, Direction::In, 1)
    }

    pub fn inc_dir(&self, stat_type: StatType, detail: DetailType, dir: Direction) {
        self.add_dir(stat_type, detail, dir, 1)
    }

    pub fn count(&self, stat_type: StatType, detail: DetailType, dir: Direction) -> u64 {
        let lock = self.mutables.read().unwrap();
        lock.counters
            .get(&CounterKey::new(stat_type, detail, dir))
            .map(|counter| counter.count())
            .unwrap_or_default()
    }

    pub fn sample(&self, sample: Sample, expected_min_max: (i64, i64), value: i64) {
        // This is a two-step process to avoid exclusively locking the mutex in the common case
        {
            let lock = self.mutables.read().unwrap();
            if let Some(sampler) = lock.samplers.get(&sample) {
                sampler.add(value);
                return;
            }
        }
        {
            let mut lock = self.mutables.write().unwrap();
            let sampler = lock
                .samplers
                .entry(sample)
                .or_insert_with(|| SamplerEntry::new(self.max_samples, expected_min_max));
            sampler.add(value);
        }
    }

    pub fn samples(&self, sample: Sample) -> Vec<i64> {
        let lock = self.mutables.read().unwrap();
        lock.samplers
            .get(&sample)
            .map(|sampler| sampler.collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters() {
        let stats = Stats::new();
        assert_eq!(
            stats.count(StatType::Ledger, DetailType::Fork, Direction::In),
            0
        );
        stats.inc(StatType::Ledger, DetailType::Fork);
        stats.add(StatType::Ledger, DetailType::Fork, 2);
        assert_eq!(
            stats.count(StatType::Ledger, DetailType::Fork, Direction::In),
            3
        );
    }

    #[test]
    fn samples() {
        let stats = Stats::new();
        stats.sample(Sample::ActiveElectionDuration, (0, 1000), 5);
        stats.sample(Sample::ActiveElectionDuration, (0, 1000), 7);
        assert_eq!(stats.samples(Sample::ActiveElectionDuration), vec![5, 7]);
    }
}
