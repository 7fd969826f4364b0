//! Routing element actions into an identified collection.

use super::action::Action;
use super::reducer::Reducer;
use super::state::State;
use crate::dependencies::Dependencies;
use crate::effect::Effect;
use crate::identified::{Identifiable, IdentifiedVec};

type ElementId<R> = <<R as Reducer>::State as Identifiable>::Id;

/// Runs a per-element reducer on the element an action addresses.
///
/// `extract` yields the element id and the element action; only that
/// element's state is mutated. Effects produced by the element are tagged
/// with the same id on the way back through `embed`. Actions addressed to
/// an id that is not in the collection are dropped with a warning.
pub struct ForEach<PS, PA, R>
where
    R: Reducer,
    R::State: Identifiable,
{
    elements: fn(&mut PS) -> &mut IdentifiedVec<R::State>,
    extract: fn(PA) -> Option<(ElementId<R>, R::Action)>,
    embed: fn(ElementId<R>, R::Action) -> PA,
    child: R,
}

impl<PS, PA, R> ForEach<PS, PA, R>
where
    R: Reducer,
    R::State: Identifiable,
{
    pub fn new(
        elements: fn(&mut PS) -> &mut IdentifiedVec<R::State>,
        extract: fn(PA) -> Option<(ElementId<R>, R::Action)>,
        embed: fn(ElementId<R>, R::Action) -> PA,
        child: R,
    ) -> Self {
        Self {
            elements,
            extract,
            embed,
            child,
        }
    }
}

impl<PS, PA, R> Reducer for ForEach<PS, PA, R>
where
    PS: State,
    PA: Action,
    R: Reducer,
    R::State: Identifiable,
{
    type State = PS;
    type Action = PA;

    fn reduce(&self, state: &mut PS, action: PA, deps: &Dependencies) -> Effect<PA> {
        let Some((id, child_action)) = (self.extract)(action) else {
            return Effect::none();
        };
        let Some(element) = (self.elements)(state).get_mut(&id) else {
            tracing::warn!(
                ?id,
                action = ?child_action,
                "action addressed to a missing collection element; dropping it"
            );
            return Effect::none();
        };
        let embed = self.embed;
        self.child
            .reduce(element, child_action, deps)
            .map(move |action| embed(id.clone(), action))
    }
}
