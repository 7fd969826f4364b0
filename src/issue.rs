//! Runtime issues reported as data.
//!
//! Problems the runtime can detect but cannot express through an action
//! (an unconverted effect error, a dependency without a test variant, a
//! failed harness assertion) are funnelled through an [`IssueReporter`].
//! Under the test store the reporter collects them into a [`FailureLog`];
//! everywhere else recoverable issues are logged and fatal ones abort.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// A single recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// State after an action differs from the expected state.
    #[error("State mismatch after {action}:\n{diff}")]
    StateMismatch { action: String, diff: String },

    /// The next effect-emitted action is not the one the test expected.
    #[error("Expected to receive {expected}, but received {actual} from {origin}")]
    UnexpectedAction {
        expected: String,
        actual: String,
        origin: String,
    },

    /// The test expected an action but no effect is left to produce one.
    #[error("Expected to receive {expected}, but no effects are in flight")]
    MissingAction { expected: String },

    /// Effects emitted actions the test never asserted.
    #[error("{} received action(s) were not asserted {context}: {actions:?}", .actions.len())]
    UnreceivedActions {
        context: String,
        actions: Vec<String>,
    },

    /// An effect was still running when the test finished.
    #[error("Effect {id} started by {started_by} is still in flight")]
    InFlightEffect { id: String, started_by: String },

    /// No action arrived within the receive timeout.
    #[error("Timed out after {timeout_ms}ms waiting to receive {expected}")]
    ReceiveTimeout { expected: String, timeout_ms: u64 },

    /// Effects started by a sent action did not end within the timeout.
    #[error("Timed out after {timeout_ms}ms waiting for the effects of {action} to finish")]
    TaskTimeout { action: String, timeout_ms: u64 },

    /// A dependency was resolved in test mode without a test variant.
    #[error("Dependency '{key}' has no test implementation; fell back to its {fallback} value")]
    MissingTestDependency { key: String, fallback: &'static str },

    /// The spawner refused an effect, so it never ran.
    #[error("Effect started by {started_by} could not be spawned: {error}")]
    SpawnFailed { started_by: String, error: String },

    /// An effect failed and nothing converted the error into an action.
    #[error("Unhandled error in {origin}: {error}")]
    UnhandledEffectError { origin: String, error: String },
}

impl Failure {
    /// Fatal failures abort the process outside the test store.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Failure::UnhandledEffectError { .. })
    }
}

/// Shared, append-only list of failures.
#[derive(Debug, Clone, Default)]
pub struct FailureLog {
    inner: Arc<Mutex<Vec<Failure>>>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, failure: Failure) {
        self.inner.lock().push(failure);
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<Failure> {
        self.inner.lock().clone()
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<Failure> {
        std::mem::take(&mut *self.inner.lock())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// Destination for runtime issues.
///
/// The default reporter logs recoverable issues and aborts on fatal ones.
/// A collecting reporter records every issue into a [`FailureLog`] instead.
#[derive(Debug, Clone, Default)]
pub struct IssueReporter {
    log: Option<FailureLog>,
}

impl IssueReporter {
    /// Reporter used outside the test store.
    pub fn aborting() -> Self {
        Self { log: None }
    }

    /// Reporter that records every issue into `log`.
    pub fn collecting(log: FailureLog) -> Self {
        Self { log: Some(log) }
    }

    pub fn is_collecting(&self) -> bool {
        self.log.is_some()
    }

    pub fn report(&self, failure: Failure) {
        match &self.log {
            Some(log) => {
                tracing::debug!(%failure, "recorded failure");
                log.record(failure);
            }
            None if failure.is_fatal() => {
                tracing::error!(%failure, "unrecoverable runtime failure");
                std::process::abort();
            }
            None => tracing::warn!(%failure, "runtime issue"),
        }
    }
}
