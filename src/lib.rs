//! Unidirectional state management.
//!
//! A [`Store`] owns one state value. Callers [`send`](Store::send) actions;
//! a [`Reducer`] mutates the state for each action and returns an
//! [`Effect`] describing asynchronous follow-up work, whose actions are fed
//! back through the same reducer. Effects carry identities so they can be
//! cancelled or replaced. Capabilities such as the clock are resolved from
//! a [`Dependencies`] context with live, preview and test variants.
//!
//! [`TestStore`] runs the same machinery on virtual time and a
//! deterministic scheduler, and requires every state change and every
//! effect-emitted action to be asserted.

pub mod config;
pub mod dependencies;
pub mod effect;
pub mod identified;
pub mod issue;
pub mod logging;
pub mod reducer;
pub mod store;
pub mod test_store;

pub use dependencies::{Dependencies, DependencyKey, DependencyOverrides, DependencyTable, ExecutionMode};
pub use effect::{Effect, EffectId, Emitter};
pub use identified::{Identifiable, IdentifiedVec};
pub use issue::{Failure, FailureLog, IssueReporter};
pub use reducer::{Action, Reduce, Reducer, ReducerExt, State};
pub use store::{Store, StoreTask, Subscription};
pub use test_store::{TestClock, TestFailures, TestStore, TestStoreTask};
