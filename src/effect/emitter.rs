//! Channel from a running effect back into its store.

use std::fmt;
use std::sync::Arc;

use super::id::EffectId;

/// Sends actions from a running effect back to the store.
///
/// Actions sent after the effect has been cancelled are discarded.
pub struct Emitter<A> {
    emit: Arc<dyn Fn(A) + Send + Sync>,
    origin: Option<EffectId>,
}

impl<A> Clone for Emitter<A> {
    fn clone(&self) -> Self {
        Self {
            emit: Arc::clone(&self.emit),
            origin: self.origin.clone(),
        }
    }
}

impl<A: 'static> Emitter<A> {
    /// Emitter that hands every action to `emit`.
    pub fn new(emit: impl Fn(A) + Send + Sync + 'static) -> Self {
        Self {
            emit: Arc::new(emit),
            origin: None,
        }
    }

    pub(crate) fn with_origin(
        origin: Option<EffectId>,
        emit: impl Fn(A) + Send + Sync + 'static,
    ) -> Self {
        Self {
            emit: Arc::new(emit),
            origin,
        }
    }

    pub fn send(&self, action: A) {
        (self.emit)(action);
    }

    /// Identity of the nearest cancellable effect this emitter belongs to.
    pub fn origin(&self) -> Option<&EffectId> {
        self.origin.as_ref()
    }

    /// Emitter for a narrower action type that converts with `f` first.
    pub(crate) fn adapt<C: 'static>(self, f: Arc<dyn Fn(C) -> A + Send + Sync>) -> Emitter<C> {
        let emit = self.emit;
        Emitter {
            emit: Arc::new(move |action| emit(f(action))),
            origin: self.origin,
        }
    }
}

impl<A> fmt::Debug for Emitter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
