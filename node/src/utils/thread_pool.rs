use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub type Task = Box<dyn FnOnce() + Send>;

pub trait ThreadPool: Send + Sync {
    fn push_task(&self, task: Task);
    fn add_delayed_task(&self, delay: Duration, task: Task);
    fn num_queued_tasks(&self) -> usize;
}

/// A fixed set of worker threads draining a shared task queue.
/// Delayed tasks move into the queue once their delay elapses.
pub struct ThreadPoolImpl {
    shared: Arc<PoolShared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

struct PoolShared {
    state: Mutex<PoolState>,
    condition: Condvar,
}

struct PoolState {
    tasks: VecDeque<Task>,
    delayed: BTreeMap<(Instant, u64), Task>,
    next_delayed_id: u64,
    stopped: bool,
}

impl ThreadPoolImpl {
    pub fn create(num_threads: usize, thread_name: impl Into<String>) -> Self {
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                tasks: VecDeque::new(),
                delayed: BTreeMap::new(),
                next_delayed_id: 0,
                stopped: false,
            }),
            condition: Condvar::new(),
        });

        let name = thread_name.into();
        let mut threads = Vec::with_capacity(num_threads);
        for _ in 0..num_threads {
            let shared_l = Arc::clone(&shared);
            threads.push(
                std::thread::Builder::new()
                    .name(name.clone())
                    .spawn(move || run_worker(shared_l))
                    .unwrap(),
            );
        }

        Self {
            shared,
            threads: Mutex::new(threads),
        }
    }

    pub fn stop(&self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            if state.stopped {
                return;
            }
            state.stopped = true;
            state.delayed.clear();
        }
        self.shared.condition.notify_all();
        let threads = std::mem::take(&mut *self.threads.lock().unwrap());
        for handle in threads {
            handle.join().unwrap();
        }
    }
}

impl ThreadPool for ThreadPoolImpl {
    fn push_task(&self, task: Task) {
        {
            let mut state = self.shared.state.lock().unwrap();
            if state.stopped {
                return;
            }
            state.tasks.push_back(task);
        }
        self.shared.condition.notify_one();
    }

    fn add_delayed_task(&self, delay: Duration, task: Task) {
        {
            let mut state = self.shared.state.lock().unwrap();
            if state.stopped {
                return;
            }
            let id = state.next_delayed_id;
            state.next_delayed_id += 1;
            state.delayed.insert((Instant::now() + delay, id), task);
        }
        self.shared.condition.notify_all();
    }

    fn num_queued_tasks(&self) -> usize {
        let state = self.shared.state.lock().unwrap();
        state.tasks.len() + state.delayed.len()
    }
}

impl Drop for ThreadPoolImpl {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(shared: Arc<PoolShared>) {
    let mut state = shared.state.lock().unwrap();
    loop {
        if state.stopped {
            return;
        }

        // Promote due delayed tasks
        let now = Instant::now();
        while let Some(&(due, id)) = state.delayed.keys().next() {
            if due > now {
                break;
            }
            let task = state.delayed.remove(&(due, id)).unwrap();
            state.tasks.push_back(task);
        }

        if let Some(task) = state.tasks.pop_front() {
            drop(state);
            task();
            state = shared.state.lock().unwrap();
            continue;
        }

        state = match state.delayed.keys().next().copied() {
            Some((due, _)) => {
                let timeout = due.saturating_duration_since(Instant::now());
                shared.condition.wait_timeout(state, timeout).unwrap().0
            }
            None => shared.condition.wait(state).unwrap(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn executes_tasks() {
        let pool = ThreadPoolImpl::create(1, "test pool");
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_l = counter.clone();
        pool.push_task(Box::new(move || {
            counter_l.fetch_add(1, Ordering::SeqCst);
        }));
        let deadline = Instant::now() + Duration::from_secs(5);
        while counter.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        pool.stop();
    }

    #[test]
    fn executes_delayed_tasks() {
        let pool = ThreadPoolImpl::create(1, "test pool");
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_l = counter.clone();
        pool.add_delayed_task(
            Duration::from_millis(10),
            Box::new(move || {
                counter_l.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let deadline = Instant::now() + Duration::from_secs(5);
        while counter.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        pool.stop();
    }
}
