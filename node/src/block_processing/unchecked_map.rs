use crate::stats::{DetailType, StatType, Stats};
use rsvelo_core::{
    utils::ContainerInfo, Block, BlockEnum, HashOrAccount, UncheckedInfo, UncheckedKey,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub type SatisfiedCallback = Box<dyn Fn(&UncheckedInfo) + Send + Sync>;

/// Parking lot for blocks whose dependencies have not arrived yet, keyed by the
/// dependency they are waiting for. Bounded; new entries are dropped when full.
pub struct UncheckedMap {
    max_entries: usize,
    stats: Arc<Stats>,
    mutex: Mutex<UncheckedMapImpl>,
    satisfied: Mutex<Option<SatisfiedCallback>>,
}

struct UncheckedMapImpl {
    entries: BTreeMap<UncheckedKey, UncheckedInfo>,
}

impl UncheckedMap {
    pub const DEFAULT_MAX_ENTRIES: usize = 64 * 1024;

    pub fn new(max_entries: usize, stats: Arc<Stats>) -> Self {
        Self {
            max_entries,
            stats,
            mutex: Mutex::new(UncheckedMapImpl {
                entries: BTreeMap::new(),
            }),
            satisfied: Mutex::new(None),
        }
    }

    pub fn set_satisfied_observer(&self, callback: SatisfiedCallback) {
        *self.satisfied.lock().unwrap() = Some(callback);
    }

    pub fn put(&self, dependency: HashOrAccount, info: UncheckedInfo) {
        let mut guard = self.mutex.lock().unwrap();
        if guard.entries.len() >= self.max_entries {
            self.stats.inc(StatType::Unchecked, DetailType::Overfill);
            return;
        }
        let key = UncheckedKey::new(dependency, info.block.hash());
        if guard.entries.insert(key, info).is_none() {
            self.stats.inc(StatType::Unchecked, DetailType::Put);
        }
    }

    /// Hands all blocks waiting for `dependency` to the satisfied observer and
    /// removes them from the map
    pub fn trigger(&self, dependency: &HashOrAccount) {
        let satisfied = self.pop_satisfied(dependency);
        if satisfied.is_empty() {
            return;
        }
        self.stats.inc(StatType::Unchecked, DetailType::Trigger);

        let callback_guard = self.satisfied.lock().unwrap();
        for info in &satisfied {
            self.stats.inc(StatType::Unchecked, DetailType::Satisfied);
            if let Some(callback) = callback_guard.as_ref() {
                callback(info);
            }
        }
    }

    fn pop_satisfied(&self, dependency: &HashOrAccount) -> Vec<UncheckedInfo> {
        let mut guard = self.mutex.lock().unwrap();
        let begin = UncheckedKey {
            previous: (*dependency).into(),
            hash: rsvelo_core::BlockHash::zero(),
        };
        let keys: Vec<UncheckedKey> = guard
            .entries
            .range(begin..)
            .take_while(|(key, _)| key.previous == (*dependency).into())
            .map(|(key, _)| *key)
            .collect();

        keys.iter()
            .filter_map(|key| guard.entries.remove(key))
            .collect()
    }

    pub fn exists(&self, dependency: &HashOrAccount, block: &BlockEnum) -> bool {
        let key = UncheckedKey::new(*dependency, block.hash());
        self.mutex.lock().unwrap().entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.mutex.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.mutex.lock().unwrap().entries.clear();
    }

    pub fn container_info(&self) -> ContainerInfo {
        [(
            "entries",
            self.len(),
            std::mem::size_of::<UncheckedKey>() + std::mem::size_of::<UncheckedInfo>(),
        )]
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsvelo_core::BlockBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_map() -> UncheckedMap {
        UncheckedMap::new(UncheckedMap::DEFAULT_MAX_ENTRIES, Arc::new(Stats::new()))
    }

    #[test]
    fn put_and_trigger() {
        let unchecked = test_map();
        let block = Arc::new(BlockBuilder::state().build());
        let dependency: HashOrAccount = block.previous().into();

        unchecked.put(dependency, UncheckedInfo::new(block.clone()));
        assert_eq!(unchecked.len(), 1);
        assert!(unchecked.exists(&dependency, &block));

        let triggered = Arc::new(AtomicUsize::new(0));
        let triggered_l = triggered.clone();
        unchecked.set_satisfied_observer(Box::new(move |_| {
            triggered_l.fetch_add(1, Ordering::SeqCst);
        }));

        unchecked.trigger(&dependency);
        assert_eq!(triggered.load(Ordering::SeqCst), 1);
        assert_eq!(unchecked.len(), 0);
    }

    #[test]
    fn trigger_unrelated_dependency() {
        let unchecked = test_map();
        let block = Arc::new(BlockBuilder::state().build());
        unchecked.put(block.previous().into(), UncheckedInfo::new(block));

        unchecked.trigger(&HashOrAccount::from(9999));
        assert_eq!(unchecked.len(), 1);
    }

    #[test]
    fn bounded() {
        let unchecked = UncheckedMap::new(2, Arc::new(Stats::new()));
        for i in 0..5_u64 {
            let block = Arc::new(BlockBuilder::state().previous(i).build());
            unchecked.put(block.previous().into(), UncheckedInfo::new(block));
        }
        assert_eq!(unchecked.len(), 2);
    }
}
