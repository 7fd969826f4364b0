//! Virtual time.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::dependencies::Clock;

#[derive(Default)]
struct Timer {
    fired: bool,
    waker: Option<Waker>,
}

#[derive(Default)]
struct ClockState {
    now: Duration,
    next_seq: u64,
    timers: BTreeMap<(Duration, u64), Timer>,
}

/// Clock that only moves when told to.
///
/// A sleep registers its deadline when it is created. Advancing the clock
/// fires deadlines in order; timers sharing a deadline fire in the order
/// they were created.
#[derive(Clone, Default)]
pub struct TestClock {
    state: Arc<Mutex<ClockState>>,
}

impl TestClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the earliest pending deadline at or before `target`, moving
    /// the clock to it. Returns false when there is none.
    pub fn fire_next(&self, target: Duration) -> bool {
        let mut state = self.state.lock();
        let Some(deadline) = state
            .timers
            .iter()
            .find(|(_, timer)| !timer.fired)
            .map(|((deadline, _), _)| *deadline)
            .filter(|deadline| *deadline <= target)
        else {
            return false;
        };

        state.now = state.now.max(deadline);
        for ((_, _), timer) in state.timers.range_mut((deadline, 0)..=(deadline, u64::MAX)) {
            timer.fired = true;
            if let Some(waker) = timer.waker.take() {
                waker.wake();
            }
        }
        true
    }

    /// Moves the clock forward to `now` without firing anything.
    pub fn set_now(&self, now: Duration) {
        let mut state = self.state.lock();
        state.now = state.now.max(now);
    }

    /// Sleeps that have not completed yet.
    pub fn pending_timers(&self) -> usize {
        self.state
            .lock()
            .timers
            .values()
            .filter(|timer| !timer.fired)
            .count()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Duration {
        self.state.lock().now
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        let mut state = self.state.lock();
        let deadline = state.now + duration;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.timers.insert(
            (deadline, seq),
            Timer {
                fired: duration.is_zero(),
                waker: None,
            },
        );
        Box::pin(TestSleep {
            state: Arc::clone(&self.state),
            key: (deadline, seq),
        })
    }
}

impl std::fmt::Debug for TestClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TestClock")
            .field("now", &state.now)
            .field("timers", &state.timers.len())
            .finish()
    }
}

struct TestSleep {
    state: Arc<Mutex<ClockState>>,
    key: (Duration, u64),
}

impl Future for TestSleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.state.lock();
        let Some(timer) = state.timers.get_mut(&self.key) else {
            return Poll::Ready(());
        };
        if !timer.fired {
            timer.waker = Some(cx.waker().clone());
            return Poll::Pending;
        }
        state.timers.remove(&self.key);
        Poll::Ready(())
    }
}

impl Drop for TestSleep {
    fn drop(&mut self) {
        self.state.lock().timers.remove(&self.key);
    }
}
