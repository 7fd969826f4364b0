//! Effects: inert descriptions of asynchronous work.
//!
//! An [`Effect`] is a value. Building one runs nothing; the store decides
//! when and how its units of work execute, tracks them by identity and
//! feeds the actions they emit back through the reducer.
//!
//! ```text
//! none | action(a) | run(work) | cancellable(id, e) | cancel(id)
//!      | merge([e..])         (parallel)
//!      | concatenate([e..])   (sequential)
//! ```

mod emitter;
mod id;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::{Stream, StreamExt};

use crate::dependencies::{Clock, Dependencies};
use crate::issue::Failure;

pub use emitter::Emitter;
pub use id::EffectId;

type Work<A> = Box<dyn FnOnce(Emitter<A>, Dependencies) -> BoxFuture<'static, ()> + Send>;

/// Description of zero or more units of asynchronous work.
pub struct Effect<A> {
    pub(crate) operation: Operation<A>,
}

pub(crate) enum Operation<A> {
    None,
    Action(A),
    Run {
        work: Work<A>,
        dependencies: Option<Dependencies>,
    },
    Cancellable {
        id: EffectId,
        effect: Box<Effect<A>>,
    },
    Cancel(EffectId),
    Merge(Vec<Effect<A>>),
    Concatenate(Vec<Effect<A>>),
}

impl<A: Send + 'static> Effect<A> {
    fn from_operation(operation: Operation<A>) -> Self {
        Self { operation }
    }

    /// Effect that does nothing.
    pub fn none() -> Self {
        Self::from_operation(Operation::None)
    }

    /// Feeds `action` straight back into the store once the current
    /// dispatch has finished.
    pub fn action(action: A) -> Self {
        Self::from_operation(Operation::Action(action))
    }

    /// Runs asynchronous work that may emit any number of actions.
    ///
    /// `work` receives an [`Emitter`] and the dependency context frozen for
    /// this effect. The work cannot fail; use [`Effect::task`],
    /// [`Effect::try_run_or`] or an action carrying a `Result` to surface
    /// errors.
    pub fn run<F, Fut>(work: F) -> Self
    where
        F: FnOnce(Emitter<A>, Dependencies) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::from_operation(Operation::Run {
            work: Box::new(
                move |emitter: Emitter<A>, deps: Dependencies| -> BoxFuture<'static, ()> {
                    Box::pin(work(emitter, deps))
                },
            ),
            dependencies: None,
        })
    }

    /// Runs fallible work whose errors are not converted into actions.
    ///
    /// An error escaping `work` is a programming error: the test store
    /// records it as a failure, anywhere else the process aborts.
    pub fn try_run<F, Fut>(work: F) -> Self
    where
        F: FnOnce(Emitter<A>, Dependencies) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::run(move |emitter, deps| async move {
            let origin = match emitter.origin() {
                Some(id) => format!("effect {id}"),
                None => "anonymous effect".to_string(),
            };
            if let Err(error) = work(emitter, deps.clone()).await {
                deps.issues().report(Failure::UnhandledEffectError {
                    origin,
                    error: format!("{error:#}"),
                });
            }
        })
    }

    /// Runs fallible work, converting an escaping error into an action.
    pub fn try_run_or<F, Fut, C>(work: F, on_error: C) -> Self
    where
        F: FnOnce(Emitter<A>, Dependencies) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
        C: FnOnce(anyhow::Error) -> A + Send + 'static,
    {
        Self::run(move |emitter, deps| async move {
            let sink = emitter.clone();
            if let Err(error) = work(emitter, deps).await {
                sink.send(on_error(error));
            }
        })
    }

    /// Emits the single action `future` resolves to.
    pub fn future<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = A> + Send + 'static,
    {
        Self::run(move |emitter, _| async move { emitter.send(future.await) })
    }

    /// Awaits a fallible operation and converts its outcome into an action.
    pub fn task<T, E, Fut, F>(operation: Fut, to_action: F) -> Self
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        F: FnOnce(Result<T, E>) -> A + Send + 'static,
    {
        Self::run(move |emitter, _| async move { emitter.send(to_action(operation.await)) })
    }

    /// Emits every item of `stream`, in order, until it ends.
    pub fn stream<St>(stream: St) -> Self
    where
        St: Stream<Item = A> + Send + 'static,
    {
        Self::run(move |emitter, _| async move {
            let mut stream = std::pin::pin!(stream);
            while let Some(action) = stream.next().await {
                emitter.send(action);
            }
        })
    }

    /// Cancels the running effect registered under `id`, if any.
    pub fn cancel(id: impl Into<EffectId>) -> Self {
        Self::from_operation(Operation::Cancel(id.into()))
    }

    /// Runs all effects in parallel.
    pub fn merge(effects: impl IntoIterator<Item = Effect<A>>) -> Self {
        Self::collect(effects, Operation::Merge)
    }

    /// Runs effects one after another, each starting when the previous one
    /// has finished.
    pub fn concatenate(effects: impl IntoIterator<Item = Effect<A>>) -> Self {
        Self::collect(effects, Operation::Concatenate)
    }

    fn collect(
        effects: impl IntoIterator<Item = Effect<A>>,
        wrap: fn(Vec<Effect<A>>) -> Operation<A>,
    ) -> Self {
        let mut effects: Vec<_> = effects.into_iter().filter(|e| !e.is_none()).collect();
        match effects.len() {
            0 => Self::none(),
            1 => effects.remove(0),
            _ => Self::from_operation(wrap(effects)),
        }
    }

    /// Registers this effect under `id`. Starting it cancels any effect
    /// already running under the same id.
    pub fn cancellable(self, id: impl Into<EffectId>) -> Self {
        if self.is_none() {
            return self;
        }
        Self::from_operation(Operation::Cancellable {
            id: id.into(),
            effect: Box::new(self),
        })
    }

    pub fn merge_with(self, other: Effect<A>) -> Self {
        Self::merge([self, other])
    }

    pub fn concat_with(self, other: Effect<A>) -> Self {
        Self::concatenate([self, other])
    }

    /// Delays this effect by `duration` on `clock`, restarting the delay
    /// whenever another effect with the same id starts.
    pub fn debounce(self, id: impl Into<EffectId>, clock: Arc<dyn Clock>, duration: Duration) -> Self {
        if self.is_none() {
            return self;
        }
        Self::concatenate([
            Self::run(move |_, _| async move { clock.sleep(duration).await }),
            self,
        ])
        .cancellable(id)
    }

    pub fn is_none(&self) -> bool {
        matches!(self.operation, Operation::None)
    }

    /// Transforms every action this effect emits.
    pub fn map<B, F>(self, f: F) -> Effect<B>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.map_shared(Arc::new(f))
    }

    fn map_shared<B: Send + 'static>(self, f: Arc<dyn Fn(A) -> B + Send + Sync>) -> Effect<B> {
        let operation = match self.operation {
            Operation::None => Operation::None,
            Operation::Action(action) => Operation::Action(f(action)),
            Operation::Run { work, dependencies } => Operation::Run {
                work: Box::new(move |emitter: Emitter<B>, deps: Dependencies| {
                    work(emitter.adapt(f), deps)
                }),
                dependencies,
            },
            Operation::Cancellable { id, effect } => Operation::Cancellable {
                id,
                effect: Box::new(effect.map_shared(f)),
            },
            Operation::Cancel(id) => Operation::Cancel(id),
            Operation::Merge(effects) => Operation::Merge(
                effects
                    .into_iter()
                    .map(|effect| effect.map_shared(Arc::clone(&f)))
                    .collect(),
            ),
            Operation::Concatenate(effects) => Operation::Concatenate(
                effects
                    .into_iter()
                    .map(|effect| effect.map_shared(Arc::clone(&f)))
                    .collect(),
            ),
        };
        Effect { operation }
    }

    /// Freezes `deps` into every unit of work that has no context yet.
    pub(crate) fn with_dependencies(self, deps: &Dependencies) -> Self {
        let operation = match self.operation {
            Operation::Run {
                work,
                dependencies: None,
            } => Operation::Run {
                work,
                dependencies: Some(deps.clone()),
            },
            Operation::Cancellable { id, effect } => Operation::Cancellable {
                id,
                effect: Box::new(effect.with_dependencies(deps)),
            },
            Operation::Merge(effects) => Operation::Merge(
                effects
                    .into_iter()
                    .map(|effect| effect.with_dependencies(deps))
                    .collect(),
            ),
            Operation::Concatenate(effects) => Operation::Concatenate(
                effects
                    .into_iter()
                    .map(|effect| effect.with_dependencies(deps))
                    .collect(),
            ),
            other => other,
        };
        Effect { operation }
    }
}

impl<A: fmt::Debug> fmt::Debug for Effect<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operation {
            Operation::None => f.write_str("None"),
            Operation::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Operation::Run { dependencies, .. } => f
                .debug_struct("Run")
                .field("frozen_dependencies", &dependencies.is_some())
                .finish_non_exhaustive(),
            Operation::Cancellable { id, effect } => f
                .debug_struct("Cancellable")
                .field("id", id)
                .field("effect", effect)
                .finish(),
            Operation::Cancel(id) => f.debug_tuple("Cancel").field(id).finish(),
            Operation::Merge(effects) => f.debug_tuple("Merge").field(effects).finish(),
            Operation::Concatenate(effects) => f.debug_tuple("Concatenate").field(effects).finish(),
        }
    }
}
