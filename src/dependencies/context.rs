use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::key::{DependencyKey, ExecutionMode};
use super::table::DependencyTable;
use crate::config::RuntimeConfig;
use crate::issue::{Failure, IssueReporter};

/// Errors that can occur when resolving a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("Dependency '{key}' is not declared and not overridden")]
    Undeclared { key: &'static str },
}

struct OverrideLayer {
    key: TypeId,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<OverrideLayer>>,
}

/// Resolution context threaded through reducers and effects.
///
/// Cloning is cheap. A context never changes after construction; every
/// override produces a new context whose lookups see the override first.
#[derive(Clone)]
pub struct Dependencies {
    table: Arc<DependencyTable>,
    mode: ExecutionMode,
    overrides: Option<Arc<OverrideLayer>>,
    issues: IssueReporter,
}

impl Dependencies {
    pub fn new(table: Arc<DependencyTable>, mode: ExecutionMode) -> Self {
        Self {
            table,
            mode,
            overrides: None,
            issues: IssueReporter::default(),
        }
    }

    /// Live context over `table`.
    pub fn live(table: Arc<DependencyTable>) -> Self {
        Self::new(table, ExecutionMode::Live)
    }

    /// Context in the mode selected by the runtime configuration.
    pub fn from_config(table: Arc<DependencyTable>, config: &RuntimeConfig) -> Self {
        Self::new(table, config.mode)
    }

    /// Replaces the issue reporter, keeping table, mode and overrides.
    pub fn with_reporter(mut self, issues: IssueReporter) -> Self {
        self.issues = issues;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn issues(&self) -> &IssueReporter {
        &self.issues
    }

    /// Resolves `K`: innermost override first, then the variant the
    /// execution mode selects.
    ///
    /// In test mode a key without a test variant is reported as
    /// [`Failure::MissingTestDependency`] and resolves to its preview (or
    /// live) value so the run can continue.
    pub fn resolve<K: DependencyKey>(&self) -> Result<K::Value, DependencyError> {
        if let Some(value) = self.find_override::<K>() {
            return Ok(value);
        }
        let record = self
            .table
            .record::<K>()
            .ok_or(DependencyError::Undeclared {
                key: type_name::<K>(),
            })?;
        let value = match self.mode {
            ExecutionMode::Live => record.live().clone(),
            ExecutionMode::Preview => record.preview().clone(),
            ExecutionMode::Test => match record.test() {
                Some(value) => value.clone(),
                None => {
                    let fallback = if record.has_preview() { "preview" } else { "live" };
                    self.issues.report(Failure::MissingTestDependency {
                        key: type_name::<K>().to_string(),
                        fallback,
                    });
                    record.preview().clone()
                }
            },
        };
        Ok(value)
    }

    /// New context in which `K` resolves to `value`.
    pub fn with_override<K: DependencyKey>(&self, value: K::Value) -> Self {
        let mut scoped = self.clone();
        scoped.push::<K>(Arc::new(value));
        scoped
    }

    /// Runs `f` in a context where `K` resolves to `value`.
    ///
    /// The override is visible only inside `f`; `self` is untouched.
    pub fn scope<K: DependencyKey, R>(&self, value: K::Value, f: impl FnOnce(&Dependencies) -> R) -> R {
        f(&self.with_override::<K>(value))
    }

    /// New context with every override in `overrides` applied in order.
    pub fn apply(&self, overrides: &DependencyOverrides) -> Self {
        let mut scoped = self.clone();
        for (key, value) in &overrides.entries {
            scoped.push_raw(*key, Arc::clone(value));
        }
        scoped
    }

    fn push<K: DependencyKey>(&mut self, value: Arc<dyn Any + Send + Sync>) {
        self.push_raw(TypeId::of::<K>(), value);
    }

    fn push_raw(&mut self, key: TypeId, value: Arc<dyn Any + Send + Sync>) {
        self.overrides = Some(Arc::new(OverrideLayer {
            key,
            value,
            parent: self.overrides.take(),
        }));
    }

    fn find_override<K: DependencyKey>(&self) -> Option<K::Value> {
        let key = TypeId::of::<K>();
        let mut layer = self.overrides.as_deref();
        while let Some(current) = layer {
            if current.key == key {
                return current.value.downcast_ref::<K::Value>().cloned();
            }
            layer = current.parent.as_deref();
        }
        None
    }

    fn override_depth(&self) -> usize {
        let mut depth = 0;
        let mut layer = self.overrides.as_deref();
        while let Some(current) = layer {
            depth += 1;
            layer = current.parent.as_deref();
        }
        depth
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependencies")
            .field("mode", &self.mode)
            .field("overrides", &self.override_depth())
            .field("table", &self.table)
            .finish()
    }
}

/// Ordered set of overrides to apply to a context in one go.
#[derive(Clone, Default)]
pub struct DependencyOverrides {
    entries: Vec<(TypeId, Arc<dyn Any + Send + Sync>)>,
}

impl DependencyOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an override for `K`. Later overrides of the same key win.
    pub fn set<K: DependencyKey>(mut self, value: K::Value) -> Self {
        self.entries.push((TypeId::of::<K>(), Arc::new(value)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for DependencyOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyOverrides")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::DependencyRecord;
    use crate::issue::FailureLog;

    struct Endpoint;

    impl DependencyKey for Endpoint {
        type Value = &'static str;
    }

    struct Retries;

    impl DependencyKey for Retries {
        type Value = u32;
    }

    fn table() -> Arc<DependencyTable> {
        let mut table = DependencyTable::new();
        table
            .declare::<Endpoint>(
                DependencyRecord::new("https://live")
                    .with_preview("https://preview")
                    .with_test("https://test"),
            )
            .declare::<Retries>(DependencyRecord::new(3));
        Arc::new(table)
    }

    #[test]
    fn mode_selects_variant() {
        let table = table();
        let live = Dependencies::new(table.clone(), ExecutionMode::Live);
        let preview = Dependencies::new(table.clone(), ExecutionMode::Preview);
        let test = Dependencies::new(table, ExecutionMode::Test);

        assert_eq!(live.resolve::<Endpoint>(), Ok("https://live"));
        assert_eq!(preview.resolve::<Endpoint>(), Ok("https://preview"));
        assert_eq!(test.resolve::<Endpoint>(), Ok("https://test"));
    }

    #[test]
    fn preview_falls_back_to_live() {
        let preview = Dependencies::new(table(), ExecutionMode::Preview);
        assert_eq!(preview.resolve::<Retries>(), Ok(3));
    }

    #[test]
    fn innermost_override_wins_and_parent_is_untouched() {
        let base = Dependencies::live(table());
        let outer = base.with_override::<Retries>(5);
        let inner = outer.with_override::<Retries>(7);

        assert_eq!(inner.resolve::<Retries>(), Ok(7));
        assert_eq!(outer.resolve::<Retries>(), Ok(5));
        assert_eq!(base.resolve::<Retries>(), Ok(3));
    }

    #[test]
    fn scope_restores_after_closure() {
        let base = Dependencies::live(table());
        let seen = base.scope::<Retries, _>(9, |deps| deps.resolve::<Retries>());
        assert_eq!(seen, Ok(9));
        assert_eq!(base.resolve::<Retries>(), Ok(3));
    }

    #[test]
    fn missing_test_variant_is_recorded_and_falls_back() {
        let log = FailureLog::new();
        let deps = Dependencies::new(table(), ExecutionMode::Test)
            .with_reporter(IssueReporter::collecting(log.clone()));

        assert_eq!(deps.resolve::<Retries>(), Ok(3));
        let failures = log.snapshot();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            &failures[0],
            Failure::MissingTestDependency { key, fallback: "live" } if key.contains("Retries")
        ));
    }

    #[test]
    fn override_satisfies_test_mode_without_failure() {
        let log = FailureLog::new();
        let deps = Dependencies::new(table(), ExecutionMode::Test)
            .with_reporter(IssueReporter::collecting(log.clone()))
            .apply(&DependencyOverrides::new().set::<Retries>(0));

        assert_eq!(deps.resolve::<Retries>(), Ok(0));
        assert!(log.is_empty());
    }

    #[test]
    fn undeclared_key_is_an_error() {
        let deps = Dependencies::live(Arc::new(DependencyTable::new()));
        assert!(matches!(
            deps.resolve::<Retries>(),
            Err(DependencyError::Undeclared { .. })
        ));
    }
}
