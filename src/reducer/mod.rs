//! Reducers and the combinators that compose them.
//!
//! # Architecture
//!
//! ```text
//! Action ──→ Reducer ──→ State
//!    ↑          │
//!    │          └──→ Effect ──→ (async work)
//!    └──────────────────────────────┘
//! ```
//!
//! - **State**: value owned by a store, mutated only inside reducers
//! - **Action**: user intents or events fed back by effects
//! - **Reducer**: synchronous transition `(&mut State, Action) -> Effect`
//!
//! Larger features are built from smaller reducers with [`Scope`],
//! [`Combine`], [`ForEach`] and [`IfLet`].

mod action;
mod combine;
mod for_each;
mod if_let;
#[allow(clippy::module_inception)]
mod reducer;
mod scope;
mod state;
mod with_dependency;

pub use action::Action;
pub use combine::Combine;
pub use for_each::ForEach;
pub use if_let::IfLet;
pub use reducer::{Reduce, Reducer, ReducerExt};
pub use scope::Scope;
pub use state::State;
pub use with_dependency::WithDependency;
