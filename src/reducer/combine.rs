//! Sequential composition of reducers over the same state.

use super::action::Action;
use super::reducer::Reducer;
use super::state::State;
use crate::dependencies::Dependencies;
use crate::effect::Effect;

/// Runs a fixed list of reducers, in order, against every action.
///
/// Each reducer observes the state as already mutated by the reducers
/// before it in the same dispatch. Their effects are merged and run in
/// parallel.
pub struct Combine<S, A> {
    reducers: Vec<Box<dyn Reducer<State = S, Action = A>>>,
}

impl<S: State, A: Action> Combine<S, A> {
    pub fn new() -> Self {
        Self {
            reducers: Vec::new(),
        }
    }

    /// Append a reducer to the end of the sequence.
    pub fn with(mut self, reducer: impl Reducer<State = S, Action = A>) -> Self {
        self.reducers.push(Box::new(reducer));
        self
    }

    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

impl<S: State, A: Action> Default for Combine<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State, A: Action> Reducer for Combine<S, A> {
    type State = S;
    type Action = A;

    fn reduce(&self, state: &mut S, action: A, deps: &Dependencies) -> Effect<A> {
        let Some((last, rest)) = self.reducers.split_last() else {
            return Effect::none();
        };
        let mut effects = Vec::with_capacity(self.reducers.len());
        for reducer in rest {
            effects.push(reducer.reduce(state, action.clone(), deps));
        }
        effects.push(last.reduce(state, action, deps));
        Effect::merge(effects)
    }
}
