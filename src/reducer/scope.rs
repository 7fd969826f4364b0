//! Lifting a child reducer into a parent domain.

use super::action::Action;
use super::reducer::Reducer;
use super::state::State;
use crate::dependencies::Dependencies;
use crate::effect::Effect;

/// Embeds a child reducer in a parent state and action.
///
/// `state` focuses the parent state on the child's slice, `extract` picks
/// the child action out of a parent action and `embed` wraps the child's
/// effect actions back into the parent. Parent actions that do not address
/// the child pass through untouched.
pub struct Scope<PS, PA, R: Reducer> {
    state: fn(&mut PS) -> &mut R::State,
    extract: fn(PA) -> Option<R::Action>,
    embed: fn(R::Action) -> PA,
    child: R,
}

impl<PS, PA, R: Reducer> Scope<PS, PA, R> {
    pub fn new(
        state: fn(&mut PS) -> &mut R::State,
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

impl<PS: State, PA: Action, R: Reducer> Reducer for Scope<PS, PA, R> {
    type State = PS;
    type Action = PA;

    fn reduce(&self, state: &mut PS, action: PA, deps: &Dependencies) -> Effect<PA> {
        let Some(child_action) = (self.extract)(action) else {
            return Effect::none();
        };
        self.child
            .reduce((self.state)(state), child_action, deps)
            .map(self.embed)
    }
}
