//! Starting, supervising and cancelling effects.

use std::sync::{Arc, Weak};

use futures::future::{self, BoxFuture};
use parking_lot::Mutex;

use super::instance::Instance;
use super::registry::{EffectRegistry, InFlightEffect};
use super::spawner::Spawner;
use super::task::TaskSlot;
use super::Origin;
use crate::dependencies::Dependencies;
use crate::effect::{Effect, EffectId, Emitter, Operation};
use crate::issue::Failure;

/// Destination for actions produced by running effects.
pub(crate) trait ActionSink<A>: Send + Sync {
    /// Queues `action`. `gate` is the instance that emitted it; the action
    /// is dropped if that instance is cancelled before it is reduced.
    fn deliver(&self, action: A, origin: Origin, gate: Option<Arc<Instance>>);
}

/// Runs the effects returned by a store's reducer.
///
/// Holds the sink weakly: running effects never keep their store alive.
pub(crate) struct EffectRuntime<A> {
    sink: Weak<dyn ActionSink<A>>,
    registry: Mutex<EffectRegistry>,
    spawner: Arc<dyn Spawner>,
    dependencies: Dependencies,
}

impl<A: Send + 'static> EffectRuntime<A> {
    pub(crate) fn new(
        sink: Weak<dyn ActionSink<A>>,
        spawner: Arc<dyn Spawner>,
        dependencies: Dependencies,
    ) -> Self {
        Self {
            sink,
            registry: Mutex::new(EffectRegistry::default()),
            spawner,
            dependencies,
        }
    }

    /// Starts everything `effect` describes on behalf of the action
    /// rendered as `started_by`.
    pub(crate) fn start(self: &Arc<Self>, effect: Effect<A>, started_by: &str, slot: Option<&Arc<TaskSlot>>) {
        match effect.operation {
            Operation::None => {}
            Operation::Action(action) => {
                if let Some(sink) = self.sink.upgrade() {
                    sink.deliver(action, Origin::Effect(None), None);
                }
            }
            Operation::Cancel(id) => self.cancel(&id),
            Operation::Merge(effects) => {
                for effect in effects {
                    self.start(effect, started_by, slot);
                }
            }
            Operation::Cancellable { id, effect } => self.spawn(Some(id), *effect, started_by, slot),
            operation => self.spawn(None, Effect { operation }, started_by, slot),
        }
    }

    pub(crate) fn cancel(&self, id: &EffectId) {
        let instance = self.registry.lock().cancel(id);
        match instance {
            Some(instance) => {
                instance.cancel();
            }
            None => tracing::trace!(%id, "cancel requested for effect that is not running"),
        }
    }

    pub(crate) fn cancel_all(&self) {
        let instances = self.registry.lock().cancel_all();
        for instance in instances {
            instance.cancel();
        }
    }

    pub(crate) fn in_flight(&self) -> Vec<InFlightEffect> {
        self.registry.lock().in_flight()
    }

    pub(crate) fn in_flight_count(&self) -> usize {
        self.registry.lock().in_flight_count()
    }

    fn spawn(
        self: &Arc<Self>,
        id: Option<EffectId>,
        effect: Effect<A>,
        started_by: &str,
        slot: Option<&Arc<TaskSlot>>,
    ) {
        let instance = self.register(id, None, started_by.to_string());
        if let Some(slot) = slot {
            slot.attach(&instance);
        }
        let work = self.drive(effect, Arc::clone(&instance));
        if let Err(error) = self.spawner.spawn(self.supervise(instance, work)) {
            self.dependencies.issues().report(Failure::SpawnFailed {
                started_by: started_by.to_string(),
                error: error.to_string(),
            });
        }
    }

    /// Registers a new instance, cancelling whatever held its identity.
    fn register(
        &self,
        id: Option<EffectId>,
        parent: Option<Arc<Instance>>,
        started_by: String,
    ) -> Arc<Instance> {
        let (instance, prior) = self.registry.lock().start(id, parent, started_by);
        if let Some(prior) = prior {
            prior.cancel();
        }
        tracing::debug!(serial = instance.serial(), id = ?instance.id(), "effect started");
        instance
    }

    /// Races `work` against cancellation of `instance` and unregisters the
    /// instance when the work is dropped, whichever way that happens.
    fn supervise(self: &Arc<Self>, instance: Arc<Instance>, work: BoxFuture<'static, ()>) -> BoxFuture<'static, ()> {
        let runtime = Arc::clone(self);
        let guard = scopeguard::guard(instance, move |instance| {
            runtime.registry.lock().complete(&instance);
            instance.complete();
            tracing::debug!(
                serial = instance.serial(),
                cancelled = instance.is_cancelled(),
                "effect finished"
            );
        });
        Box::pin(async move {
            let instance = Arc::clone(&*guard);
            tokio::select! {
                biased;
                _ = instance.cancelled() => {}
                _ = work => {}
            }
            drop(guard);
        })
    }

    fn drive(self: &Arc<Self>, effect: Effect<A>, scope: Arc<Instance>) -> BoxFuture<'static, ()> {
        match effect.operation {
            Operation::None => Box::pin(future::ready(())),
            Operation::Action(action) => {
                let emitter = self.emitter(&scope);
                Box::pin(async move { emitter.send(action) })
            }
            Operation::Run { work, dependencies } => {
                let deps = dependencies.unwrap_or_else(|| self.dependencies.clone());
                work(self.emitter(&scope), deps)
            }
            Operation::Cancellable { id, effect } => {
                let started_by = scope.started_by().to_string();
                let instance = self.register(Some(id), Some(scope), started_by);
                let work = self.drive(*effect, Arc::clone(&instance));
                self.supervise(instance, work)
            }
            Operation::Cancel(id) => {
                let runtime = Arc::clone(self);
                Box::pin(async move { runtime.cancel(&id) })
            }
            Operation::Merge(effects) => {
                let running: Vec<_> = effects
                    .into_iter()
                    .map(|effect| self.drive(effect, Arc::clone(&scope)))
                    .collect();
                Box::pin(async move {
                    future::join_all(running).await;
                })
            }
            Operation::Concatenate(effects) => {
                let runtime = Arc::clone(self);
                Box::pin(async move {
                    for effect in effects {
                        runtime.drive(effect, Arc::clone(&scope)).await;
                    }
                })
            }
        }
    }

    /// Emitter that delivers into the store unless `scope` was cancelled.
    fn emitter(&self, scope: &Arc<Instance>) -> Emitter<A> {
        let sink = self.sink.clone();
        let gate = Arc::clone(scope);
        let origin = scope.identity();
        Emitter::with_origin(origin.clone(), move |action| {
            if gate.is_cancelled() {
                tracing::trace!(serial = gate.serial(), "dropping action from cancelled effect");
                return;
            }
            if let Some(sink) = sink.upgrade() {
                sink.deliver(action, Origin::Effect(origin.clone()), Some(Arc::clone(&gate)));
            }
        })
    }
}
