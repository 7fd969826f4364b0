use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use super::clock::{Clock, ClockKey, TokioClock};
use super::key::DependencyKey;
use super::uuid::{UuidGenerator, UuidKey};

/// The three implementations declared for one dependency key.
///
/// `preview` falls back to `live` when not declared. `test` has no silent
/// fallback: resolving an undeclared test variant in test mode is reported
/// as a failure before the preview/live value is used.
#[derive(Debug, Clone)]
pub struct DependencyRecord<V> {
    live: V,
    preview: Option<V>,
    test: Option<V>,
}

impl<V: Clone> DependencyRecord<V> {
    pub fn new(live: V) -> Self {
        Self {
            live,
            preview: None,
            test: None,
        }
    }

    pub fn with_preview(mut self, preview: V) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn with_test(mut self, test: V) -> Self {
        self.test = Some(test);
        self
    }

    pub fn live(&self) -> &V {
        &self.live
    }

    pub fn preview(&self) -> &V {
        self.preview.as_ref().unwrap_or(&self.live)
    }

    pub fn test(&self) -> Option<&V> {
        self.test.as_ref()
    }

    pub fn has_preview(&self) -> bool {
        self.preview.is_some()
    }
}

/// Process-wide defaults, one [`DependencyRecord`] per key type.
#[derive(Default)]
pub struct DependencyTable {
    records: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl DependencyTable {
    /// Table with no declarations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in clock and uuid dependencies declared.
    ///
    /// Neither declares a test variant; tests override them explicitly.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table
            .declare::<ClockKey>(DependencyRecord::new(
                Arc::new(TokioClock::new()) as Arc<dyn Clock>
            ))
            .declare::<UuidKey>(DependencyRecord::new(UuidGenerator::random()));
        table
    }

    /// Declares (or replaces) the record for `K`.
    pub fn declare<K: DependencyKey>(&mut self, record: DependencyRecord<K::Value>) -> &mut Self {
        self.records.insert(TypeId::of::<K>(), Arc::new(record));
        self
    }

    pub fn record<K: DependencyKey>(&self) -> Option<&DependencyRecord<K::Value>> {
        self.records.get(&TypeId::of::<K>())?.downcast_ref()
    }

    pub fn contains<K: DependencyKey>(&self) -> bool {
        self.records.contains_key(&TypeId::of::<K>())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl std::fmt::Debug for DependencyTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyTable")
            .field("declared", &self.records.len())
            .finish()
    }
}
