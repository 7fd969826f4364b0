//! Deterministic executor for effects under test.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Wake, Waker};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::store::{SpawnError, Spawner};

struct Shared {
    ready: Mutex<BTreeSet<u64>>,
    notify: Notify,
}

struct TaskWaker {
    id: u64,
    shared: Arc<Shared>,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.shared.ready.lock().insert(self.id);
        self.shared.notify.notify_one();
    }
}

/// Single-threaded executor that only makes progress when asked.
///
/// Spawned tasks are polled by [`TestScheduler::run_until_idle`] on the
/// calling thread, lowest task id first, until none is ready. Nothing runs
/// in the background, so the interleaving of effects is a function of the
/// test alone.
pub struct TestScheduler {
    tasks: Mutex<BTreeMap<u64, BoxFuture<'static, ()>>>,
    next_id: AtomicU64,
    shared: Arc<Shared>,
}

impl TestScheduler {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
            shared: Arc::new(Shared {
                ready: Mutex::new(BTreeSet::new()),
                notify: Notify::new(),
            }),
        }
    }

    /// Polls ready tasks until none is left. Returns the number of polls.
    pub fn run_until_idle(&self) -> usize {
        let mut polls = 0;
        loop {
            let Some(id) = self.shared.ready.lock().pop_first() else {
                break;
            };
            // Woken after it already completed.
            let Some(mut task) = self.tasks.lock().remove(&id) else {
                continue;
            };

            let waker = Waker::from(Arc::new(TaskWaker {
                id,
                shared: Arc::clone(&self.shared),
            }));
            let mut cx = Context::from_waker(&waker);
            polls += 1;
            if task.as_mut().poll(&mut cx).is_pending() {
                self.tasks.lock().insert(id, task);
            }
        }
        polls
    }

    /// Number of spawned tasks that have not completed.
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn has_ready(&self) -> bool {
        !self.shared.ready.lock().is_empty()
    }

    /// Resolves once some task has been woken since the last call.
    pub async fn woken(&self) {
        self.shared.notify.notified().await;
    }
}

impl Default for TestScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Spawner for TestScheduler {
    fn spawn(&self, task: BoxFuture<'static, ()>) -> Result<(), SpawnError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.tasks.lock().insert(id, task);
        self.shared.ready.lock().insert(id);
        self.shared.notify.notify_one();
        Ok(())
    }
}

impl std::fmt::Debug for TestScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestScheduler")
            .field("pending", &self.pending())
            .field("ready", &self.shared.ready.lock().len())
            .finish()
    }
}
