//! Effect identities used for cancellation and exclusivity.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

trait IdValue: fmt::Debug + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn eq_dyn(&self, other: &dyn IdValue) -> bool;
    fn hash_dyn(&self, state: &mut dyn Hasher);
}

impl<T> IdValue for T
where
    T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_dyn(&self, other: &dyn IdValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn hash_dyn(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {}", self.name)
    }
}

/// Hashable token identifying a running effect.
///
/// Any `Hash + Eq + Debug` value can serve as an identity. Two ids are equal
/// only when they wrap values of the same type that compare equal, so
/// `EffectId::new(1u8)` and `EffectId::new(1u16)` are distinct.
#[derive(Clone)]
pub struct EffectId(Arc<dyn IdValue>);

impl EffectId {
    pub fn new<T>(value: T) -> Self
    where
        T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
    {
        Self(Arc::new(value))
    }

    /// Identity derived from a type, for features with a single effect of
    /// their kind.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        })
    }
}

impl PartialEq for EffectId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_dyn(&*other.0)
    }
}

impl Eq for EffectId {}

impl Hash for EffectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash_dyn(state);
    }
}

impl fmt::Debug for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EffectId({:?})", self.0)
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<&'static str> for EffectId {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EffectId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Search;

    #[test]
    fn equality_requires_same_type_and_value() {
        assert_eq!(EffectId::new(1u8), EffectId::new(1u8));
        assert_ne!(EffectId::new(1u8), EffectId::new(2u8));
        assert_ne!(EffectId::new(1u8), EffectId::new(1u16));
    }

    #[test]
    fn str_and_string_ids_are_distinct_types() {
        assert_eq!(EffectId::from("timer"), EffectId::from("timer"));
        assert_ne!(EffectId::from("timer"), EffectId::from("timer".to_string()));
    }

    #[test]
    fn ids_work_as_hash_keys() {
        let mut set = HashSet::new();
        set.insert(EffectId::from("timer"));
        set.insert(EffectId::of::<Search>());
        set.insert(EffectId::of::<Search>());
        assert_eq!(set.len(), 2);
        assert!(set.contains(&EffectId::from("timer")));
    }

    #[test]
    fn display_shows_wrapped_value() {
        assert_eq!(EffectId::from("timer").to_string(), "\"timer\"");
        assert!(EffectId::of::<Search>().to_string().contains("Search"));
    }
}
