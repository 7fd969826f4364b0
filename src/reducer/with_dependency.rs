//! Overriding a dependency for one reducer subtree.

use std::marker::PhantomData;

use super::reducer::Reducer;
use crate::dependencies::{Dependencies, DependencyKey};
use crate::effect::Effect;

/// Runs the wrapped reducer with one dependency overridden.
///
/// The override applies to the reducer itself and is frozen into every
/// effect it returns, so those effects keep seeing it for their whole life.
pub struct WithDependency<R, K: DependencyKey> {
    inner: R,
    value: K::Value,
    _key: PhantomData<fn() -> K>,
}

impl<R: Reducer, K: DependencyKey> WithDependency<R, K> {
    pub fn new(inner: R, value: K::Value) -> Self {
        Self {
            inner,
            value,
            _key: PhantomData,
        }
    }
}

impl<R: Reducer, K: DependencyKey> Reducer for WithDependency<R, K> {
    type State = R::State;
    type Action = R::Action;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        deps: &Dependencies,
    ) -> Effect<Self::Action> {
        let deps = deps.with_override::<K>(self.value.clone());
        self.inner
            .reduce(state, action, &deps)
            .with_dependencies(&deps)
    }
}
