//! Base trait for state owned by a store.

use std::fmt::Debug;

/// Marker trait for store state.
///
/// States should be:
/// - Cloneable (subscribers and tests receive snapshots)
/// - Comparable (PartialEq for detecting changes)
/// - Self-contained (everything a feature needs to render or decide)
pub trait State: Clone + PartialEq + Debug + Send + 'static {}
