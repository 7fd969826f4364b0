//! Running a child reducer only while its state is present.

use super::action::Action;
use super::reducer::Reducer;
use super::state::State;
use crate::dependencies::Dependencies;
use crate::effect::Effect;

/// Applies a child reducer to an optional or enum-case slice of the parent.
///
/// `state` returns the child state when the parent currently holds it (an
/// `Option` that is `Some`, or an enum in the matching case). While the
/// slice is absent the reducer is a no-op and actions addressed to the
/// child are dropped with a warning.
pub struct IfLet<PS, PA, R: Reducer> {
    state: fn(&mut PS) -> Option<&mut R::State>,
    extract: fn(PA) -> Option<R::Action>,
    embed: fn(R::Action) -> PA,
    child: R,
}

impl<PS, PA, R: Reducer> IfLet<PS, PA, R> {
    pub fn new(
        state: fn(&mut PS) -> Option<&mut R::State>,
        extract: fn(PA) -> Option<R::Action>,
        embed: fn(R::Action) -> PA,
        child: R,
    ) -> Self {
        Self {
            state,
            extract,
            embed,
            child,
        }
    }
}

impl<PS: State, PA: Action, R: Reducer> Reducer for IfLet<PS, PA, R> {
    type State = PS;
    type Action = PA;

    fn reduce(&self, state: &mut PS, action: PA, deps: &Dependencies) -> Effect<PA> {
        let Some(child_action) = (self.extract)(action) else {
            return Effect::none();
        };
        let Some(child_state) = (self.state)(state) else {
            tracing::warn!(
                action = ?child_action,
                "action addressed to absent child state; dropping it"
            );
            return Effect::none();
        };
        self.child
            .reduce(child_state, child_action, deps)
            .map(self.embed)
    }
}
