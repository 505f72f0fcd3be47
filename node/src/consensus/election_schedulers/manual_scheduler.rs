use crate::consensus::{ActiveElections, ActiveElectionsExt, ElectionBehavior};
use crate::stats::{DetailType, StatType, Stats};
use rsvelo_core::{utils::ContainerInfo, BlockEnum};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

/// Starts elections for blocks injected by operator-facing surfaces.
/// Manual elections are not subject to the priority caps.
pub struct ManualScheduler {
    mutex: Mutex<ManualSchedulerImpl>,
    condition: Condvar,
    stats: Arc<Stats>,
    active: Arc<ActiveElections>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

struct ManualSchedulerImpl {
    queue: VecDeque<Arc<BlockEnum>>,
    stopped: bool,
}

impl ManualScheduler {
    pub fn new(stats: Arc<Stats>, active: Arc<ActiveElections>) -> Self {
        Self {
            mutex: Mutex::new(ManualSchedulerImpl {
                queue: VecDeque::new(),
                stopped: false,
            }),
            condition: Condvar::new(),
            stats,
            active,
            thread: Mutex::new(None),
        }
    }

    pub fn push(&self, block: Arc<BlockEnum>) {
        {
            let mut guard = self.mutex.lock().unwrap();
            guard.queue.push_back(block);
        }
        self.stats
            .inc(StatType::ManualScheduler, DetailType::Activated);
        self.condition.notify_all();
    }

    pub fn stop(&self) {
        self.mutex.lock().unwrap().stopped = true;
        self.condition.notify_all();
        if let Some(handle) = self.thread.lock().unwrap().take() {
            handle.join().unwrap();
        }
    }

    pub fn len(&self) -> usize {
        self.mutex.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn container_info(&self) -> ContainerInfo {
        [(
            "queue",
            self.len(),
            std::mem::size_of::<Arc<BlockEnum>>(),
        )]
        .into()
    }
}

pub trait ManualSchedulerExt {
    fn start(&self);
}

impl ManualSchedulerExt for Arc<ManualScheduler> {
    fn start(&self) {
        debug_assert!(self.thread.lock().unwrap().is_none());
        let self_l = Arc::clone(self);
        *self.thread.lock().unwrap() = Some(
            std::thread::Builder::new()
                .name("Sched Manual".to_string())
                .spawn(move || {
                    self_l.run();
                })
                .unwrap(),
        );
    }
}

impl ManualScheduler {
    fn run(self: &Arc<Self>) {
        let mut guard = self.mutex.lock().unwrap();
        while !guard.stopped {
            guard = self
                .condition
                .wait_while(guard, |i| !i.stopped && i.queue.is_empty())
                .unwrap();

            if guard.stopped {
                return;
            }

            while let Some(block) = guard.queue.pop_front() {
                drop(guard);
                self.stats.inc(StatType::ManualScheduler, DetailType::Loop);
                self.active.insert(&block, ElectionBehavior::Manual, None);
                guard = self.mutex.lock().unwrap();
            }
        }
    }
}
