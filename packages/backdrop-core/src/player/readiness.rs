//! Single-fire readiness signal for the external player API.
//!
//! The player API announces itself through a global one-shot callback, but
//! that callback never fires for us when another consumer on the page already
//! claimed it. Readiness is therefore detected by two independent producers:
//!
//! 1. the ready callback (if we managed to register it), and
//! 2. bounded polling of [`PlayerBackend::is_available`].
//!
//! Both feed the same [`ReadinessGate`]. Whichever fires first opens it;
//! later signals are ignored, so nothing initializes twice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::retry::{poll_until, PollOutcome};
use super::traits::PlayerBackend;

/// Which producer opened the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadySource {
    /// The API was already loaded when first checked.
    AlreadyLoaded,
    /// The global ready callback fired.
    Callback,
    /// Polling observed the API.
    Poll,
}

/// Result of [`ReadinessGate::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready(ReadySource),
    /// Polling hit its ceiling and the callback never fired.
    TimedOut { attempts: u32 },
    Cancelled,
}

/// Latch that opens exactly once.
#[derive(Clone)]
pub struct ReadinessGate {
    tx: Arc<watch::Sender<Option<ReadySource>>>,
    callback_registered: Arc<AtomicBool>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            callback_registered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn source(&self) -> Option<ReadySource> {
        *self.tx.borrow()
    }

    /// Opens the gate. Returns `true` only for the call that opened it.
    pub fn mark_ready(&self, source: ReadySource) -> bool {
        let opened = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(source);
            true
        });
        if opened {
            log::info!("[Readiness] Player API ready (via {:?})", source);
        } else {
            log::debug!("[Readiness] Ignoring duplicate ready signal from {:?}", source);
        }
        opened
    }

    /// Waits until the gate opens.
    pub async fn wait(&self) -> ReadySource {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(source) = *rx.borrow_and_update() {
                return source;
            }
            // The sender lives as long as `self`, so this only errors if the
            // gate is torn down mid-wait.
            if rx.changed().await.is_err() {
                return ReadySource::Poll;
            }
        }
    }

    /// Drives both readiness producers until the gate opens, polling runs out,
    /// or `cancel` fires.
    ///
    /// Safe to call repeatedly: the ready callback is registered at most once
    /// per gate and an open gate returns immediately.
    pub async fn acquire(
        &self,
        backend: &dyn PlayerBackend,
        poll_interval: Duration,
        max_attempts: u32,
        cancel: &CancellationToken,
    ) -> Readiness {
        if let Some(source) = self.source() {
            return Readiness::Ready(source);
        }
        if backend.is_available() {
            self.mark_ready(ReadySource::AlreadyLoaded);
            return Readiness::Ready(self.source().unwrap_or(ReadySource::AlreadyLoaded));
        }

        if !self.callback_registered.swap(true, Ordering::SeqCst) {
            let gate = self.clone();
            let registered = backend.register_ready_callback(Box::new(move || {
                gate.mark_ready(ReadySource::Callback);
            }));
            if !registered {
                log::debug!("[Readiness] Ready callback already claimed; relying on polling");
            }
        }
        backend.request_load();

        let outcome = tokio::select! {
            source = self.wait() => return Readiness::Ready(source),
            outcome = poll_until("player API", poll_interval, max_attempts, cancel, || {
                if self.is_ready() {
                    return true;
                }
                if backend.is_available() {
                    self.mark_ready(ReadySource::Poll);
                    return true;
                }
                false
            }) => outcome,
        };

        match outcome {
            PollOutcome::Ready { .. } => {
                Readiness::Ready(self.source().unwrap_or(ReadySource::Poll))
            }
            PollOutcome::Exhausted { attempts } => Readiness::TimedOut { attempts },
            PollOutcome::Cancelled => Readiness::Cancelled,
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}
