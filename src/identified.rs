//! Ordered collection of uniquely identified elements.

use std::fmt::Debug;
use std::hash::Hash;

use serde::Serialize;

/// Values that carry a stable identity.
pub trait Identifiable {
    type Id: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
}

/// Ordered collection where no two elements share an id.
///
/// Insertion order is preserved. Operations that would introduce a
/// duplicate id are rejected rather than silently replacing an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IdentifiedVec<T> {
    elements: Vec<T>,
}

impl<T> Default for IdentifiedVec<T> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
        }
    }
}

impl<T: Identifiable> IdentifiedVec<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `element`. Returns false (and leaves the collection
    /// unchanged) when its id is already present.
    pub fn push(&mut self, element: T) -> bool {
        if self.contains(&element.id()) {
            return false;
        }
        self.elements.push(element);
        true
    }

    /// Inserts `element` at `index` (clamped to the length). Returns false
    /// when its id is already present.
    pub fn insert(&mut self, index: usize, element: T) -> bool {
        if self.contains(&element.id()) {
            return false;
        }
        let index = index.min(self.elements.len());
        self.elements.insert(index, element);
        true
    }

    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        let index = self.index_of(id)?;
        Some(self.elements.remove(index))
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.elements.iter().find(|element| &element.id() == id)
    }

    /// Mutable access to one element. The element's id must not change.
    pub fn get_mut(&mut self, id: &T::Id) -> Option<&mut T> {
        self.elements.iter_mut().find(|element| &element.id() == id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.index_of(id).is_some()
    }

    pub fn index_of(&self, id: &T::Id) -> Option<usize> {
        self.elements.iter().position(|element| &element.id() == id)
    }

    pub fn ids(&self) -> Vec<T::Id> {
        self.elements.iter().map(Identifiable::id).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Collects elements, keeping the first occurrence of each id.
impl<T: Identifiable> FromIterator<T> for IdentifiedVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = Self::new();
        for element in iter {
            collection.push(element);
        }
        collection
    }
}

impl<'a, T> IntoIterator for &'a IdentifiedVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
