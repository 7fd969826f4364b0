//! The store: sole owner of a state value.
//!
//! # Dispatch
//!
//! ```text
//! send(a) ──→ mailbox ──→ reduce ──→ notify subscribers
//!                ↑                 └─→ start effects ──→ spawner
//!                └──────── emitted actions ←─────────────┘
//! ```
//!
//! Every action, whether sent by a caller or emitted by an effect, goes
//! through one FIFO mailbox. Whoever finds the mailbox idle drains it. A
//! `send` made on the draining thread (from a subscriber or an immediate
//! effect action) only queues and returns; a `send` from any other thread
//! queues and blocks until the draining thread has reduced it. Actions
//! emitted by running effects never block. State is therefore mutated by
//! one reducer call at a time, a nested send never observes a half-applied
//! mutation, and a caller's own `send` is visible to its next `state()`.

mod instance;
mod registry;
mod runtime;
mod spawner;
mod task;

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::dependencies::Dependencies;
use crate::effect::EffectId;
use crate::reducer::Reducer;
use instance::Instance;
use runtime::{ActionSink, EffectRuntime};
use task::TaskSlot;

pub use registry::InFlightEffect;
pub use spawner::{SpawnError, Spawner, TokioSpawner};
pub use task::StoreTask;

/// Where a dispatched action came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Origin {
    Sent,
    Effect(Option<EffectId>),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Sent => f.write_str("send"),
            Origin::Effect(Some(id)) => write!(f, "effect {id}"),
            Origin::Effect(None) => f.write_str("anonymous effect"),
        }
    }
}

/// An action together with the state it produced.
pub(crate) struct Reduced<S, A> {
    pub(crate) action: A,
    pub(crate) origin: Origin,
    pub(crate) state: S,
}

/// Hook called after every reduction.
pub(crate) type Observer<S, A> = Box<dyn Fn(Reduced<S, A>) + Send + Sync>;

type Listener<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct Envelope<A> {
    action: A,
    origin: Origin,
    gate: Option<Arc<Instance>>,
    slot: Option<Arc<TaskSlot>>,
}

struct Mailbox<A> {
    pending: VecDeque<Envelope<A>>,
    /// Thread currently draining `pending`, if any.
    drainer: Option<ThreadId>,
}

struct Subscribers<S> {
    next_id: u64,
    listeners: BTreeMap<u64, Listener<S>>,
}

struct StoreInner<R: Reducer> {
    reducer: R,
    state: Mutex<R::State>,
    mailbox: Mutex<Mailbox<R::Action>>,
    subscribers: Mutex<Subscribers<R::State>>,
    observer: Option<Observer<R::State, R::Action>>,
    runtime: Arc<EffectRuntime<R::Action>>,
    dependencies: Dependencies,
}

impl<R: Reducer> StoreInner<R> {
    fn enqueue(&self, envelope: Envelope<R::Action>) {
        let current = thread::current().id();
        {
            let mut mailbox = self.mailbox.lock();
            let drainer = mailbox.drainer;
            match drainer {
                None => {
                    mailbox.drainer = Some(current);
                    mailbox.pending.push_back(envelope);
                }
                Some(drainer) => {
                    let slot = if drainer == current {
                        None
                    } else {
                        envelope.slot.clone()
                    };
                    mailbox.pending.push_back(envelope);
                    drop(mailbox);
                    // Another thread is draining; block until it has
                    // reduced this caller's action.
                    if let Some(slot) = slot {
                        slot.wait_resolved();
                    }
                    return;
                }
            }
        }

        // A panicking reducer must not leave the mailbox claimed forever,
        // nor the senders of discarded actions waiting on them.
        let _release = scopeguard::guard_on_unwind(&self.mailbox, |mailbox| {
            let discarded = {
                let mut mailbox = mailbox.lock();
                mailbox.drainer = None;
                std::mem::take(&mut mailbox.pending)
            };
            tracing::warn!(discarded = discarded.len(), "reducer panicked, discarding queued actions");
            for envelope in discarded {
                if let Some(slot) = envelope.slot {
                    slot.resolve();
                }
            }
        });

        loop {
            let next = {
                let mut mailbox = self.mailbox.lock();
                match mailbox.pending.pop_front() {
                    Some(envelope) => envelope,
                    None => {
                        mailbox.drainer = None;
                        break;
                    }
                }
            };
            self.process(next);
        }
    }

    fn process(&self, envelope: Envelope<R::Action>) {
        let Envelope {
            action,
            origin,
            gate,
            slot,
        } = envelope;

        let slot = scopeguard::guard(slot, |slot| {
            if let Some(slot) = slot {
                slot.resolve();
            }
        });

        if gate.as_ref().is_some_and(|gate| gate.is_cancelled()) {
            tracing::trace!(?action, %origin, "dropping action from cancelled effect");
            return;
        }

        tracing::trace!(?action, %origin, "reducing action");
        let started_by = format!("{action:?}");
        let observed = self.observer.as_ref().map(|_| action.clone());

        let (effect, changed, snapshot) = {
            let mut state = self.state.lock();
            let before = state.clone();
            let effect = self.reducer.reduce(&mut state, action, &self.dependencies);
            let changed = *state != before;
            let snapshot = (changed || observed.is_some()).then(|| state.clone());
            (effect, changed, snapshot)
        };

        if let Some(state) = &snapshot {
            if changed {
                let listeners: Vec<_> = self.subscribers.lock().listeners.values().cloned().collect();
                for listener in listeners {
                    listener(state);
                }
            }
        }

        if let (Some(observer), Some(action), Some(state)) = (&self.observer, observed, snapshot) {
            observer(Reduced {
                action,
                origin,
                state,
            });
        }

        self.runtime.start(effect, &started_by, (*slot).as_ref());
    }
}

impl<R: Reducer> ActionSink<R::Action> for StoreInner<R> {
    fn deliver(&self, action: R::Action, origin: Origin, gate: Option<Arc<Instance>>) {
        self.enqueue(Envelope {
            action,
            origin,
            gate,
            slot: None,
        });
    }
}

impl<R: Reducer> Drop for StoreInner<R> {
    fn drop(&mut self) {
        self.runtime.cancel_all();
    }
}

/// Owns a state value and serializes every mutation of it.
///
/// Cloning a store yields another handle to the same state. Effects hold
/// only a weak reference, so the state and every running effect are
/// released when the last handle is dropped.
pub struct Store<R: Reducer> {
    inner: Arc<StoreInner<R>>,
}

impl<R: Reducer> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Reducer> Store<R> {
    /// Store whose effects run on the ambient tokio runtime.
    pub fn new(initial: R::State, reducer: R, dependencies: Dependencies) -> Self {
        Self::with_spawner(initial, reducer, dependencies, Arc::new(TokioSpawner::current()))
    }

    /// Store whose effects run on `spawner`.
    pub fn with_spawner(
        initial: R::State,
        reducer: R,
        dependencies: Dependencies,
        spawner: Arc<dyn Spawner>,
    ) -> Self {
        Self::build(initial, reducer, dependencies, spawner, None)
    }

    pub(crate) fn build(
        initial: R::State,
        reducer: R,
        dependencies: Dependencies,
        spawner: Arc<dyn Spawner>,
        observer: Option<Observer<R::State, R::Action>>,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<StoreInner<R>>| {
            let sink: Weak<dyn ActionSink<R::Action>> = weak.clone();
            StoreInner {
                reducer,
                state: Mutex::new(initial),
                mailbox: Mutex::new(Mailbox {
                    pending: VecDeque::new(),
                    drainer: None,
                }),
                subscribers: Mutex::new(Subscribers {
                    next_id: 0,
                    listeners: BTreeMap::new(),
                }),
                observer,
                runtime: Arc::new(EffectRuntime::new(sink, spawner, dependencies.clone())),
                dependencies,
            }
        });
        Self { inner }
    }

    /// Dispatches `action`.
    ///
    /// When no other dispatch is in progress the action, and everything
    /// queued behind it, is reduced before this returns. Otherwise it is
    /// queued and reduced by the dispatch already running.
    pub fn send(&self, action: R::Action) -> StoreTask {
        let slot = Arc::new(TaskSlot::new());
        self.inner.enqueue(Envelope {
            action,
            origin: Origin::Sent,
            gate: None,
            slot: Some(Arc::clone(&slot)),
        });
        StoreTask::new(slot)
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> R::State {
        self.inner.state.lock().clone()
    }

    /// Reads the current state without cloning it.
    ///
    /// `f` must not send to this store.
    pub fn with_state<T>(&self, f: impl FnOnce(&R::State) -> T) -> T {
        f(&self.inner.state.lock())
    }

    /// Calls `listener` with the new state after every dispatch that
    /// changes it, until the returned [`Subscription`] is dropped.
    pub fn subscribe(&self, listener: impl Fn(&R::State) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut subscribers = self.inner.subscribers.lock();
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.listeners.insert(id, Arc::new(listener));
            id
        };
        let store = Arc::downgrade(&self.inner);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(store) = store.upgrade() {
                    store.subscribers.lock().listeners.remove(&id);
                }
            })),
        }
    }

    /// Effects currently running and not cancelled.
    pub fn in_flight_effects(&self) -> Vec<InFlightEffect> {
        self.inner.runtime.in_flight()
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.inner.dependencies
    }

    pub(crate) fn in_flight_count(&self) -> usize {
        self.inner.runtime.in_flight_count()
    }

    pub(crate) fn cancel_all_effects(&self) {
        self.inner.runtime.cancel_all();
    }
}

impl<R: Reducer> fmt::Debug for Store<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.inner.state.lock())
            .field("in_flight", &self.in_flight_count())
            .finish()
    }
}

/// Keeps a state listener registered.
///
/// The listener is removed when this is dropped or
/// [`unsubscribe`](Subscription::unsubscribe) is called.
#[must_use = "dropping a Subscription removes the listener"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}
