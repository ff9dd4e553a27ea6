//! Observers that mirror session state ("reflect" targets).
//!
//! A page may host several independent controls for the same session (the
//! main panel plus any number of mini controls). None of them is assumed to
//! exist. Each pass pushes the same [`SessionView`] to every registered
//! observer; a failing or panicking observer is logged and skipped.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::runtime::TaskSpawner;
use crate::state::SessionView;

/// Error returned by an observer that could not render.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReflectError {
    /// The render target is not mounted.
    #[error("render target not mounted: {0}")]
    Unmounted(String),

    /// Any other render failure.
    #[error("render failed: {0}")]
    Failed(String),
}

/// A render target that mirrors the session.
///
/// Implementations must be idempotent: the same view may arrive many times.
/// A panic inside `reflect` is caught and counted as a failed render.
pub trait Reflector: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn reflect(&self, view: &SessionView) -> Result<(), ReflectError>;
}

/// Handle returned by [`ObserverRegistry::register`].
pub type ObserverId = u64;

/// Set of registered observers.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: DashMap<ObserverId, Arc<dyn Reflector>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn Reflector>) -> ObserverId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("[Reflect] Registered observer {} ({})", id, observer.name());
        self.observers.insert(id, observer);
        id
    }

    pub fn unregister(&self, id: ObserverId) -> bool {
        self.observers.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Pushes `view` to every observer. Returns the number that failed.
    pub fn reflect_all(&self, view: &SessionView) -> usize {
        // Snapshot first so observers may (un)register from inside `reflect`.
        let observers: Vec<Arc<dyn Reflector>> =
            self.observers.iter().map(|r| Arc::clone(r.value())).collect();

        let mut failures = 0;
        for observer in observers {
            match catch_unwind(AssertUnwindSafe(|| observer.reflect(view))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    log::debug!("[Reflect] Observer {} skipped: {}", observer.name(), e);
                }
                Err(_) => {
                    failures += 1;
                    log::error!("[Reflect] Observer {} panicked", observer.name());
                }
            }
        }
        failures
    }
}

/// Starts the periodic re-reflect loop.
///
/// Calls `tick` every `interval` until `cancel` fires. Missed ticks are
/// skipped rather than bursted.
pub fn start_ticker<S, F>(spawner: &S, interval: Duration, cancel: CancellationToken, tick: F)
where
    S: TaskSpawner,
    F: Fn() + Send + Sync + 'static,
{
    spawner.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("[Reflect] Ticker stopped");
                    break;
                }
                _ = ticker.tick() => tick(),
            }
        }
    });
}
