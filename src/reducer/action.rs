//! Base trait for actions dispatched to a store.

use std::fmt::Debug;

/// Marker trait for action values.
///
/// Actions represent:
/// - User intents (button presses, text input)
/// - Events from the outside world (responses, timer ticks)
/// - Results delivered back by effects
///
/// Actions are inert. Reducers interpret them.
pub trait Action: Clone + Debug + Send + 'static {}
