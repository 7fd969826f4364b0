//! Time as a dependency.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::Stream;
use tokio::time::Instant;

use super::key::DependencyKey;

/// Source of time for effects.
///
/// Effects that sleep must go through a resolved clock rather than calling
/// the runtime directly, so that tests can substitute a virtual one.
pub trait Clock: Send + Sync + 'static {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;

    /// Completes once `duration` has elapsed on this clock.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Wall clock backed by the tokio timer.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(async move { tokio::time::sleep(duration).await })
    }
}

/// Dependency key for the clock effects sleep on.
pub struct ClockKey;

impl DependencyKey for ClockKey {
    type Value = Arc<dyn Clock>;
}

/// Stream yielding the clock's time every `period`.
///
/// The first item arrives one full period after the stream is first polled.
pub fn timer(clock: Arc<dyn Clock>, period: Duration) -> impl Stream<Item = Duration> + Send + 'static {
    futures::stream::unfold(clock, move |clock| async move {
        clock.sleep(period).await;
        let now = clock.now();
        Some((now, clock))
    })
}
