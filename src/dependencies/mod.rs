//! Scoped dependency resolution.
//!
//! Dependencies are declared once per key in a [`DependencyTable`] with a
//! live, preview and test variant. A [`Dependencies`] context resolves keys
//! against that table in a given [`ExecutionMode`], after consulting its
//! own stack of overrides (innermost first).
//!
//! Contexts are immutable. Overriding returns a new context layered on top
//! of the old one, so leaving a scope never needs to undo anything, even
//! when the work that held the scope is cancelled.

mod clock;
mod context;
mod key;
mod table;
mod uuid;

pub use clock::{timer, Clock, ClockKey, TokioClock};
pub use context::{Dependencies, DependencyError, DependencyOverrides};
pub use key::{DependencyKey, ExecutionMode};
pub use table::{DependencyRecord, DependencyTable};
pub use self::uuid::{UuidGenerator, UuidKey};
