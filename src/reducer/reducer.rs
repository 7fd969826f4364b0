//! Reducer trait.

use std::marker::PhantomData;
use std::sync::Arc;

use super::action::Action;
use super::combine::Combine;
use super::state::State;
use super::with_dependency::WithDependency;
use crate::dependencies::{Dependencies, DependencyKey};
use crate::effect::Effect;

/// Reducer evolves state for an action and describes follow-up work.
///
/// The reducer is the only place where state transitions happen. It runs
/// synchronously and must never block; anything asynchronous goes into the
/// returned [`Effect`], whose actions come back through the store later.
pub trait Reducer: Send + Sync + 'static {
    /// The state type this reducer operates on.
    type State: State;

    /// The action type this reducer handles.
    type Action: Action;

    /// Mutate `state` for `action` and return the work to run afterwards.
    ///
    /// `deps` is the dependency context active for this dispatch. Values
    /// resolved from it and captured by returned effects stay fixed for the
    /// lifetime of those effects.
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        deps: &Dependencies,
    ) -> Effect<Self::Action>;
}

impl<R: Reducer + ?Sized> Reducer for Box<R> {
    type State = R::State;
    type Action = R::Action;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        deps: &Dependencies,
    ) -> Effect<Self::Action> {
        (**self).reduce(state, action, deps)
    }
}

impl<R: Reducer + ?Sized> Reducer for Arc<R> {
    type State = R::State;
    type Action = R::Action;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        deps: &Dependencies,
    ) -> Effect<Self::Action> {
        (**self).reduce(state, action, deps)
    }
}

/// Reducer backed by a closure.
pub struct Reduce<S, A, F> {
    f: F,
    _marker: PhantomData<fn(&mut S, A)>,
}

impl<S, A, F> Reduce<S, A, F>
where
    S: State,
    A: Action,
    F: Fn(&mut S, A, &Dependencies) -> Effect<A> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<S, A, F> Reducer for Reduce<S, A, F>
where
    S: State,
    A: Action,
    F: Fn(&mut S, A, &Dependencies) -> Effect<A> + Send + Sync + 'static,
{
    type State = S;
    type Action = A;

    fn reduce(&self, state: &mut S, action: A, deps: &Dependencies) -> Effect<A> {
        (self.f)(state, action, deps)
    }
}

/// Builder-style modifiers available on every reducer.
pub trait ReducerExt: Reducer + Sized {
    /// Run this reducer with `value` overriding dependency `K`.
    fn dependency<K: DependencyKey>(self, value: K::Value) -> WithDependency<Self, K> {
        WithDependency::new(self, value)
    }

    /// Run `other` after this reducer against the same action.
    fn combine<R>(self, other: R) -> Combine<Self::State, Self::Action>
    where
        R: Reducer<State = Self::State, Action = Self::Action>,
    {
        Combine::new().with(self).with(other)
    }
}

impl<R: Reducer> ReducerExt for R {}
