//! Where effect work runs.

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::runtime::{Handle, TryCurrentError};

/// Why a spawner could not take an effect.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("no tokio runtime available")]
    NoRuntime(#[source] TryCurrentError),

    #[error("spawner rejected the effect: {reason}")]
    Rejected { reason: String },
}

/// Executes the supervised future of each started effect.
///
/// The store never polls effect work itself; it hands every unit to a
/// spawner. The live store uses [`TokioSpawner`], the test store a
/// deterministic single-threaded scheduler. A rejected unit is dropped and
/// reported through the store's issue reporter.
pub trait Spawner: Send + Sync + 'static {
    fn spawn(&self, task: BoxFuture<'static, ()>) -> Result<(), SpawnError>;
}

/// Spawns effects onto a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct TokioSpawner {
    handle: Option<Handle>,
}

impl TokioSpawner {
    /// Spawner bound to `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Spawner bound to the runtime of the calling context, if any.
    ///
    /// Without one, the runtime current at each spawn is used instead.
    pub fn current() -> Self {
        Self {
            handle: Handle::try_current().ok(),
        }
    }
}

impl Spawner for TokioSpawner {
    fn spawn(&self, task: BoxFuture<'static, ()>) -> Result<(), SpawnError> {
        let handle = match &self.handle {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(SpawnError::NoRuntime)?,
        };
        handle.spawn(task);
        Ok(())
    }
}
