//! Identifier generation as a dependency.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use super::key::DependencyKey;

/// Produces UUIDs on demand.
#[derive(Clone)]
pub struct UuidGenerator {
    generate: Arc<dyn Fn() -> Uuid + Send + Sync>,
}

impl UuidGenerator {
    pub fn new(generate: impl Fn() -> Uuid + Send + Sync + 'static) -> Self {
        Self {
            generate: Arc::new(generate),
        }
    }

    /// Random version 4 identifiers.
    pub fn random() -> Self {
        Self::new(Uuid::new_v4)
    }

    /// `00000000-0000-0000-0000-000000000000`, then `...0001`, and so on.
    ///
    /// Clones share the counter.
    pub fn incrementing() -> Self {
        let next = AtomicU64::new(0);
        Self::new(move || Uuid::from_u128(u128::from(next.fetch_add(1, Ordering::Relaxed))))
    }

    /// Always the same identifier.
    pub fn constant(value: Uuid) -> Self {
        Self::new(move || value)
    }

    pub fn generate(&self) -> Uuid {
        (self.generate)()
    }
}

impl fmt::Debug for UuidGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UuidGenerator").finish_non_exhaustive()
    }
}

/// Dependency key for the UUID generator.
pub struct UuidKey;

impl DependencyKey for UuidKey {
    type Value = UuidGenerator;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incrementing_counts_from_zero_across_clones() {
        let generator = UuidGenerator::incrementing();
        let clone = generator.clone();
        assert_eq!(generator.generate(), Uuid::from_u128(0));
        assert_eq!(clone.generate(), Uuid::from_u128(1));
        assert_eq!(
            generator.generate().to_string(),
            "00000000-0000-0000-0000-000000000002"
        );
    }

    #[test]
    fn random_values_differ() {
        let generator = UuidGenerator::random();
        assert_ne!(generator.generate(), generator.generate());
    }

    #[test]
    fn constant_repeats() {
        let value = Uuid::from_u128(42);
        let generator = UuidGenerator::constant(value);
        assert_eq!(generator.generate(), value);
        assert_eq!(generator.generate(), value);
    }
}
