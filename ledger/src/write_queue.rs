use std::{
    collections::BTreeSet,
    sync::{Arc, Condvar, Mutex},
};

/// Distinct areas write locking is done, ordered by ascending priority
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum Writer {
    Testing, // Used in tests to emulate a write lock
    Pruning,
    VotingFinal,
    Node,
    ConfirmationHeight,
    ProcessBatch,
    OnlineWeight,
}

pub struct WriteGuard {
    guard_finish_callback: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl WriteGuard {
    pub fn new(guard_finish_callback: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self {
            guard_finish_callback: Some(guard_finish_callback),
        }
    }

    pub fn release(&mut self) {
        if let Some(callback) = self.guard_finish_callback.take() {
            callback();
        }
    }

    pub fn is_owned(&self) -> bool {
        self.guard_finish_callback.is_some()
    }

    pub fn null() -> Self {
        Self {
            guard_finish_callback: None,
        }
    }
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Ensures there is at most one process-wide holder of a write transaction.
/// Waiters are granted the lease in descending `Writer` priority order.
pub struct WriteQueue {
    data: Arc<WriteQueueData>,
    guard_finish_callback: Arc<dyn Fn() + Send + Sync>,
}

struct WriteQueueData {
    state: Mutex<WriteQueueState>,
    condition: Condvar,
}

struct WriteQueueState {
    held: bool,
    waiting: BTreeSet<Writer>,
}

impl WriteQueue {
    pub fn new() -> Self {
        let data = Arc::new(WriteQueueData {
            state: Mutex::new(WriteQueueState {
                held: false,
                waiting: BTreeSet::new(),
            }),
            condition: Condvar::new(),
        });

        let data_clone = data.clone();

        Self {
            data,
            guard_finish_callback: Arc::new(move || {
                {
                    let mut guard = data_clone.state.lock().unwrap();
                    guard.held = false;
                }
                data_clone.condition.notify_all();
            }),
        }
    }

    /// Blocks until the lease is free and this writer is the highest priority waiter,
    /// then blocks other waiters until the returned guard goes out of scope
    pub fn wait(&self, writer: Writer) -> WriteGuard {
        let mut state = self.data.state.lock().unwrap();
        debug_assert!(!state.waiting.contains(&writer));
        state.waiting.insert(writer);

        let mut state = self
            .data
            .condition
            .wait_while(state, |s| {
                s.held || s.waiting.iter().next_back() != Some(&writer)
            })
            .unwrap();

        state.waiting.remove(&writer);
        state.held = true;
        self.create_write_guard()
    }

    pub fn try_lock(&self, writer: Writer) -> Option<WriteGuard> {
        let mut state = self.data.state.lock().unwrap();
        if state.held || state.waiting.iter().next_back().map_or(false, |w| *w > writer) {
            return None;
        }
        state.held = true;
        Some(self.create_write_guard())
    }

    /// Returns true if a lease is currently held by anyone
    pub fn is_held(&self) -> bool {
        self.data.state.lock().unwrap().held
    }

    fn create_write_guard(&self) -> WriteGuard {
        WriteGuard::new(Arc::clone(&self.guard_finish_callback))
    }
}

impl Default for WriteQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn lease_is_exclusive() {
        let queue = WriteQueue::new();
        let guard = queue.wait(Writer::Testing);
        assert!(queue.is_held());
        assert!(queue.try_lock(Writer::ProcessBatch).is_none());
        drop(guard);
        assert!(!queue.is_held());
    }

    #[test]
    fn higher_priority_waiter_goes_first() {
        let queue = Arc::new(WriteQueue::new());
        let guard = queue.wait(Writer::Testing);

        let queue_l = queue.clone();
        let low = thread::spawn(move || {
            let _guard = queue_l.wait(Writer::Pruning);
            std::time::SystemTime::now()
        });

        let queue_l = queue.clone();
        let high = thread::spawn(move || {
            let _guard = queue_l.wait(Writer::ProcessBatch);
            std::time::SystemTime::now()
        });

        // Let both threads enqueue before releasing
        thread::sleep(Duration::from_millis(50));
        drop(guard);

        let high_time = high.join().unwrap();
        let low_time = low.join().unwrap();
        assert!(high_time <= low_time);
    }
}
