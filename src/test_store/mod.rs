//! Exhaustive, deterministic testing of reducers and their effects.
//!
//! A [`TestStore`] wraps a regular [`Store`] whose effects run on a
//! [`TestScheduler`] and sleep on a [`TestClock`]. Every state change and
//! every action an effect emits has to be asserted, in order:
//!
//! ```text
//! send(a, |s| ..)      reduce a, compare with the expected mutation
//! receive(b, |s| ..)   next effect-emitted action must be b
//! advance_time(d)      fire timers due within d, in deadline order
//! finish()             nothing left running, nothing left unasserted
//! ```
//!
//! Failures never panic. They are collected and returned by
//! [`TestStore::finish`], so one run reports every problem it found.

mod clock;
mod diff;
mod scheduler;

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::HarnessConfig;
use crate::dependencies::{
    Clock, ClockKey, Dependencies, DependencyOverrides, DependencyTable, ExecutionMode,
    UuidGenerator, UuidKey,
};
use crate::issue::{Failure, FailureLog, IssueReporter};
use crate::reducer::Reducer;
use crate::store::{Observer, Origin, Reduced, Spawner, Store, StoreTask};
use diff::state_diff;

pub use clock::TestClock;
pub use scheduler::TestScheduler;

struct Observed<S, A> {
    sent: Option<S>,
    received: VecDeque<Reduced<S, A>>,
}

/// Every failure a test run recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFailures(pub Vec<Failure>);

impl fmt::Display for TestFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} test failure(s):", self.0.len())?;
        for (index, failure) in self.0.iter().enumerate() {
            writeln!(f, "{}. {failure}", index + 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for TestFailures {}

/// Harness that asserts every mutation and every effect-emitted action.
pub struct TestStore<R: Reducer> {
    store: Store<R>,
    scheduler: Arc<TestScheduler>,
    clock: TestClock,
    observed: Arc<Mutex<Observed<R::State, R::Action>>>,
    expected: R::State,
    failures: FailureLog,
    timeout: Duration,
    finished: bool,
}

impl<R> TestStore<R>
where
    R: Reducer,
    R::State: Serialize,
    R::Action: PartialEq,
{
    /// Harness over the built-in dependency table.
    pub fn new(initial: R::State, reducer: R, overrides: DependencyOverrides) -> Self {
        Self::with_table(Arc::new(DependencyTable::with_defaults()), initial, reducer, overrides)
    }

    /// Harness resolving dependencies from `table` in test mode.
    ///
    /// The clock is always this harness's [`TestClock`] and the uuid
    /// generator a fresh incrementing one; `overrides` are applied on top.
    pub fn with_table(
        table: Arc<DependencyTable>,
        initial: R::State,
        reducer: R,
        overrides: DependencyOverrides,
    ) -> Self {
        let failures = FailureLog::new();
        let clock = TestClock::new();
        let scheduler = Arc::new(TestScheduler::new());
        let dependencies = Dependencies::new(table, ExecutionMode::Test)
            .with_reporter(IssueReporter::collecting(failures.clone()))
            .with_override::<ClockKey>(Arc::new(clock.clone()) as Arc<dyn Clock>)
            .with_override::<UuidKey>(UuidGenerator::incrementing())
            .apply(&overrides);

        let observed = Arc::new(Mutex::new(Observed {
            sent: None,
            received: VecDeque::new(),
        }));
        let sink = Arc::clone(&observed);
        let observer: Observer<R::State, R::Action> = Box::new(move |reduced| {
            let mut observed = sink.lock();
            match reduced.origin {
                Origin::Sent => observed.sent = Some(reduced.state),
                Origin::Effect(_) => observed.received.push_back(reduced),
            }
        });

        let store = Store::build(
            initial.clone(),
            reducer,
            dependencies,
            Arc::clone(&scheduler) as Arc<dyn Spawner>,
            Some(observer),
        );

        Self {
            store,
            scheduler,
            clock,
            observed,
            expected: initial,
            failures,
            timeout: HarnessConfig::default().receive_timeout(),
            finished: false,
        }
    }

    /// How long [`receive`](Self::receive) waits for an action.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_config(self, config: &HarnessConfig) -> Self {
        self.with_timeout(config.receive_timeout())
    }

    /// Sends `action` and asserts the state it produces.
    ///
    /// `update` receives a copy of the state expected before the action and
    /// must turn it into the state expected after it. Effects started by the
    /// action run until they suspend before this returns.
    pub fn send(&mut self, action: R::Action, update: impl FnOnce(&mut R::State)) -> TestStoreTask {
        self.flag_unreceived("before sending an action");

        let label = format!("{action:?}");
        tracing::debug!(action = %label, "test store send");
        let task = self.store.send(action);
        let actual = self.observed.lock().sent.take();
        self.scheduler.run_until_idle();

        let actual = actual.unwrap_or_else(|| self.store.state());
        self.assert_state(&label, update, actual);
        TestStoreTask {
            task,
            action: label,
            scheduler: Arc::clone(&self.scheduler),
            failures: self.failures.clone(),
            timeout: self.timeout,
        }
    }

    /// Asserts that the next effect-emitted action equals `expected`, then
    /// asserts the state it produced.
    pub async fn receive(&mut self, expected: R::Action, update: impl FnOnce(&mut R::State)) {
        let description = format!("{expected:?}");
        self.receive_matching(&description, move |action| *action == expected, update)
            .await;
    }

    /// Like [`receive`](Self::receive), for actions that are easier to
    /// match than to construct. `description` names the expectation in
    /// failure messages.
    pub async fn receive_matching(
        &mut self,
        description: &str,
        matches: impl FnOnce(&R::Action) -> bool,
        update: impl FnOnce(&mut R::State),
    ) {
        let Some(received) = self.next_received(description).await else {
            return;
        };

        if !matches(&received.action) {
            self.failures.record(Failure::UnexpectedAction {
                expected: description.to_string(),
                actual: format!("{:?}", received.action),
                origin: received.origin.to_string(),
            });
            self.expected = received.state;
            return;
        }

        let label = format!("{:?}", received.action);
        self.assert_state(&label, update, received.state);
    }

    /// Moves virtual time forward by `duration`, running every effect woken
    /// along the way before moving further.
    pub fn advance_time(&mut self, duration: Duration) {
        let target = self.clock.now() + duration;
        self.scheduler.run_until_idle();
        while self.clock.fire_next(target) {
            self.scheduler.run_until_idle();
        }
        self.clock.set_now(target);
        self.scheduler.run_until_idle();
    }

    /// Accepts every received action not yet asserted, without checking
    /// them, and continues from the current state.
    pub fn skip_received_actions(&mut self) {
        self.scheduler.run_until_idle();
        let skipped = self.observed.lock().received.len();
        self.observed.lock().received.clear();
        tracing::debug!(skipped, "skipped received actions");
        self.expected = self.store.state();
    }

    /// Cancels every running effect without reporting it.
    pub fn cancel_in_flight_effects(&mut self) {
        self.store.cancel_all_effects();
        self.scheduler.run_until_idle();
    }

    /// Runs the exhaustiveness check and returns every recorded failure.
    ///
    /// Effects still running are given up to the receive timeout to end on
    /// their own. Whatever is left is reported and cancelled.
    pub async fn finish(mut self) -> Result<(), TestFailures> {
        self.finished = true;

        let deadline = Instant::now() + self.timeout;
        loop {
            self.scheduler.run_until_idle();
            if self.store.in_flight_count() == 0 {
                break;
            }
            if tokio::time::timeout_at(deadline, self.scheduler.woken())
                .await
                .is_err()
            {
                break;
            }
        }

        self.flag_unreceived("before the test finished");
        for effect in self.store.in_flight_effects() {
            self.failures.record(Failure::InFlightEffect {
                id: effect
                    .id
                    .map_or_else(|| "<anonymous>".to_string(), |id| id.to_string()),
                started_by: effect.started_by,
            });
        }

        self.store.cancel_all_effects();
        self.scheduler.run_until_idle();

        let failures = self.failures.take();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(TestFailures(failures))
        }
    }

    /// State the next assertion starts from.
    pub fn state(&self) -> &R::State {
        &self.expected
    }

    pub fn clock(&self) -> &TestClock {
        &self.clock
    }

    pub fn dependencies(&self) -> &Dependencies {
        self.store.dependencies()
    }

    /// Failures recorded so far.
    pub fn failures(&self) -> Vec<Failure> {
        self.failures.snapshot()
    }

    async fn next_received(&mut self, description: &str) -> Option<Reduced<R::State, R::Action>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            self.scheduler.run_until_idle();
            let next = self.observed.lock().received.pop_front();
            if next.is_some() {
                return next;
            }

            if self.store.in_flight_count() == 0 {
                self.failures.record(Failure::MissingAction {
                    expected: description.to_string(),
                });
                return None;
            }

            if tokio::time::timeout_at(deadline, self.scheduler.woken())
                .await
                .is_err()
            {
                self.failures.record(Failure::ReceiveTimeout {
                    expected: description.to_string(),
                    timeout_ms: millis(self.timeout),
                });
                return None;
            }
        }
    }

    fn assert_state(&mut self, action: &str, update: impl FnOnce(&mut R::State), actual: R::State) {
        let mut expected = self.expected.clone();
        update(&mut expected);
        if expected != actual {
            self.failures.record(Failure::StateMismatch {
                action: action.to_string(),
                diff: state_diff(&expected, &actual),
            });
        }
        self.expected = actual;
    }

    fn flag_unreceived(&mut self, context: &str) {
        let pending: Vec<_> = self.observed.lock().received.drain(..).collect();
        if pending.is_empty() {
            return;
        }
        self.failures.record(Failure::UnreceivedActions {
            context: context.to_string(),
            actions: pending
                .iter()
                .map(|received| format!("{:?}", received.action))
                .collect(),
        });
        self.expected = self.store.state();
    }
}

impl<R: Reducer> Drop for TestStore<R> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Pending effects hold the runtime, which holds the scheduler.
        self.store.cancel_all_effects();
        self.scheduler.run_until_idle();
        if !std::thread::panicking() {
            tracing::warn!(
                recorded = self.failures.len(),
                "test store dropped without calling finish()"
            );
        }
    }
}

/// Handle to the effects started by one [`TestStore::send`].
///
/// Awaiting [`finish`](Self::finish) drives the test scheduler, which a
/// live [`StoreTask`] cannot do.
#[derive(Debug)]
pub struct TestStoreTask {
    task: StoreTask,
    action: String,
    scheduler: Arc<TestScheduler>,
    failures: FailureLog,
    timeout: Duration,
}

impl TestStoreTask {
    pub fn cancel(&self) {
        self.task.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Runs effects until every one the action started has ended.
    ///
    /// Gives up after the receive timeout and records
    /// [`Failure::TaskTimeout`]. Effects waiting on the [`TestClock`] only
    /// end once time is advanced.
    pub async fn finish(self) {
        let deadline = Instant::now() + self.timeout;
        loop {
            self.scheduler.run_until_idle();
            if self.task.is_finished() {
                return;
            }
            if tokio::time::timeout_at(deadline, self.scheduler.woken())
                .await
                .is_err()
            {
                self.failures.record(Failure::TaskTimeout {
                    action: self.action,
                    timeout_ms: millis(self.timeout),
                });
                return;
            }
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl<R: Reducer> fmt::Debug for TestStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestStore")
            .field("expected", &self.expected)
            .field("clock", &self.clock)
            .field("scheduler", &self.scheduler)
            .field("failures", &self.failures.len())
            .finish()
    }
}
