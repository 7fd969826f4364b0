//! Cancellation handle for one running effect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::effect::EffectId;

/// One started effect, identified or anonymous.
///
/// Cancellation is cooperative: the supervising task observes it at its
/// next suspension point and drops the work. Emitters check
/// [`Instance::is_cancelled`] before every delivery, so nothing sent after
/// the flag flips reaches the store.
pub(crate) struct Instance {
    serial: u64,
    id: Option<EffectId>,
    parent: Option<Arc<Instance>>,
    started_by: String,
    cancelled: AtomicBool,
    completed: AtomicBool,
    notify: Notify,
}

impl Instance {
    pub(crate) fn new(
        serial: u64,
        id: Option<EffectId>,
        parent: Option<Arc<Instance>>,
        started_by: String,
    ) -> Self {
        Self {
            serial,
            id,
            parent,
            started_by,
            cancelled: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }

    pub(crate) fn id(&self) -> Option<&EffectId> {
        self.id.as_ref()
    }

    pub(crate) fn started_by(&self) -> &str {
        &self.started_by
    }

    /// Nearest identity on the path from this instance to the root.
    pub(crate) fn identity(&self) -> Option<EffectId> {
        match (&self.id, &self.parent) {
            (Some(id), _) => Some(id.clone()),
            (None, Some(parent)) => parent.identity(),
            (None, None) => None,
        }
    }

    /// Flags the instance as cancelled. Returns false if it already was.
    pub(crate) fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        tracing::debug!(serial = self.serial, id = ?self.id, "effect cancelled");
        self.notify.notify_waiters();
        true
    }

    /// True once this instance or any enclosing one was cancelled.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.parent.as_ref().is_some_and(|parent| parent.is_cancelled())
    }

    pub(crate) fn complete(&self) {
        if !self.completed.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Resolves once this instance itself is cancelled.
    pub(crate) async fn cancelled(&self) {
        self.wait_for(&self.cancelled).await;
    }

    /// Resolves once the work behind this instance has been dropped.
    pub(crate) async fn completed(&self) {
        self.wait_for(&self.completed).await;
    }

    async fn wait_for(&self, flag: &AtomicBool) {
        loop {
            // Register before checking the flag so a notify_waiters() between
            // the check and the await is not lost.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if flag.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: Option<&'static str>, parent: Option<Arc<Instance>>) -> Arc<Instance> {
        Arc::new(Instance::new(0, id.map(EffectId::from), parent, "Start".to_string()))
    }

    #[test]
    fn cancel_reports_first_call_only() {
        let effect = instance(Some("timer"), None);
        assert!(effect.cancel());
        assert!(!effect.cancel());
        assert!(effect.is_cancelled());
    }

    #[test]
    fn child_observes_parent_cancellation() {
        let parent = instance(Some("outer"), None);
        let child = instance(None, Some(Arc::clone(&parent)));
        assert_eq!(child.identity(), Some(EffectId::from("outer")));
        assert!(!child.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_wakes_waiter() {
        let effect = instance(None, None);
        let waiter = {
            let effect = Arc::clone(&effect);
            tokio::spawn(async move { effect.cancelled().await })
        };
        tokio::task::yield_now().await;
        effect.cancel();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn completed_returns_immediately_when_already_set() {
        let effect = instance(None, None);
        effect.complete();
        effect.completed().await;
        assert!(effect.is_completed());
    }
}
