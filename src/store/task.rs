//! Handle to the work started by one `send`.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

use super::instance::Instance;

#[derive(Default)]
struct SlotState {
    resolved: bool,
    cancelled: bool,
    instances: Vec<Arc<Instance>>,
}

/// Shared between a [`StoreTask`] and the store while the action is queued
/// and reduced.
#[derive(Default)]
pub(crate) struct TaskSlot {
    state: Mutex<SlotState>,
    notify: Notify,
    resolved: Condvar,
}

impl TaskSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Ties a started effect to this slot.
    pub(crate) fn attach(&self, instance: &Arc<Instance>) {
        let cancelled = {
            let mut state = self.state.lock();
            state.instances.push(Arc::clone(instance));
            state.cancelled
        };
        if cancelled {
            instance.cancel();
        }
    }

    /// Marks the action as reduced and all of its effects as attached.
    pub(crate) fn resolve(&self) {
        self.state.lock().resolved = true;
        self.resolved.notify_all();
        self.notify.notify_waiters();
    }

    /// Blocks the calling thread until [`resolve`](Self::resolve) runs.
    pub(crate) fn wait_resolved(&self) {
        let mut state = self.state.lock();
        while !state.resolved {
            self.resolved.wait(&mut state);
        }
    }
}

/// Handle to the effects started by one dispatched action.
///
/// Dropping the handle does not cancel anything.
pub struct StoreTask {
    slot: Arc<TaskSlot>,
}

impl StoreTask {
    pub(crate) fn new(slot: Arc<TaskSlot>) -> Self {
        Self { slot }
    }

    /// Cancels every effect the action started, including ones it has not
    /// started yet because the action is still queued.
    pub fn cancel(&self) {
        let instances = {
            let mut state = self.slot.state.lock();
            state.cancelled = true;
            state.instances.clone()
        };
        for instance in instances {
            instance.cancel();
        }
    }

    /// True once the action was reduced and every effect it started ended.
    pub fn is_finished(&self) -> bool {
        let state = self.slot.state.lock();
        state.resolved && state.instances.iter().all(|instance| instance.is_completed())
    }

    /// Waits until the action was reduced and every effect it started ended.
    pub async fn finish(self) {
        loop {
            let notified = self.slot.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.slot.state.lock().resolved {
                break;
            }
            notified.await;
        }
        let instances = self.slot.state.lock().instances.clone();
        for instance in instances {
            instance.completed().await;
        }
    }
}

impl std::fmt::Debug for StoreTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.slot.state.lock();
        f.debug_struct("StoreTask")
            .field("resolved", &state.resolved)
            .field("cancelled", &state.cancelled)
            .field("effects", &state.instances.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> Arc<Instance> {
        Arc::new(Instance::new(0, None, None, "Load".to_string()))
    }

    #[test]
    fn cancel_before_attach_cancels_on_attach() {
        let slot = Arc::new(TaskSlot::new());
        let task = StoreTask::new(Arc::clone(&slot));
        task.cancel();

        let effect = instance();
        slot.attach(&effect);
        assert!(effect.is_cancelled());
    }

    #[test]
    fn finished_requires_resolution_and_completion() {
        let slot = Arc::new(TaskSlot::new());
        let task = StoreTask::new(Arc::clone(&slot));
        let effect = instance();
        slot.attach(&effect);
        assert!(!task.is_finished());

        slot.resolve();
        assert!(!task.is_finished());

        effect.complete();
        assert!(task.is_finished());
    }

    #[test]
    fn wait_resolved_blocks_until_another_thread_resolves() {
        let slot = Arc::new(TaskSlot::new());
        let resolver = {
            let slot = Arc::clone(&slot);
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(20));
                slot.resolve();
            })
        };
        slot.wait_resolved();
        assert!(slot.state.lock().resolved);
        resolver.join().unwrap();
    }

    #[tokio::test]
    async fn finish_waits_for_effects() {
        let slot = Arc::new(TaskSlot::new());
        let task = StoreTask::new(Arc::clone(&slot));
        let effect = instance();
        slot.attach(&effect);
        slot.resolve();

        let completer = {
            let effect = Arc::clone(&effect);
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                effect.complete();
            })
        };
        task.finish().await;
        assert!(effect.is_completed());
        completer.await.unwrap();
    }
}
