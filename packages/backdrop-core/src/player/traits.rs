//! Trait abstractions for the external embeddable player.
//!
//! These traits enable dependency injection for testability and modularity.
//! The session manager depends on traits rather than a concrete embed API.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{PlayerEvent, PlayerOptions, PlayerResult, PlayerState};

/// One-shot callback fired when the player API finishes loading.
pub type ReadyCallback = Box<dyn FnOnce() + Send + 'static>;

/// A player notification tagged with the binding that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundPlayerEvent {
    pub binding: u64,
    pub event: PlayerEvent,
}

/// Delivery channel handed to each player instance at creation.
///
/// Every event is tagged with the binding id so notifications from a
/// released instance can be told apart and ignored.
#[derive(Clone, Debug)]
pub struct PlayerEventSink {
    binding: u64,
    tx: mpsc::UnboundedSender<BoundPlayerEvent>,
}

impl PlayerEventSink {
    pub fn new(binding: u64, tx: mpsc::UnboundedSender<BoundPlayerEvent>) -> Self {
        Self { binding, tx }
    }

    pub fn binding(&self) -> u64 {
        self.binding
    }

    pub fn emit(&self, event: PlayerEvent) {
        let bound = BoundPlayerEvent {
            binding: self.binding,
            event,
        };
        if self.tx.send(bound).is_err() {
            log::trace!("[Player] Event loop gone, dropping {:?}", event);
        }
    }

    pub fn ready(&self) {
        self.emit(PlayerEvent::Ready);
    }

    pub fn state_changed(&self, state: PlayerState) {
        self.emit(PlayerEvent::StateChanged(state));
    }

    pub fn error(&self, code: i32) {
        self.emit(PlayerEvent::Error(code));
    }
}

/// Commands accepted by a live player instance.
///
/// Instructions are fire-and-forget from the session's point of view: the
/// outcome is verified by later state queries or notifications.
#[async_trait]
pub trait PlayerHandle: Send + Sync {
    /// Starts or resumes playback.
    async fn play(&self) -> PlayerResult<()>;

    /// Pauses playback.
    async fn pause(&self) -> PlayerResult<()>;

    /// Stops playback and unloads the video.
    async fn stop(&self) -> PlayerResult<()>;

    /// Sets the output volume (0-100).
    async fn set_volume(&self, volume: u8) -> PlayerResult<()>;

    /// Whether the instance is muted. Embeds may come up muted under
    /// autoplay policies.
    async fn is_muted(&self) -> PlayerResult<bool>;

    /// Unmutes the instance without changing its volume.
    async fn unmute(&self) -> PlayerResult<()>;

    /// Returns the instance's output volume (0-100).
    async fn volume(&self) -> PlayerResult<u8>;

    /// Enables or disables looping of the current video.
    async fn set_loop(&self, enabled: bool) -> PlayerResult<()>;

    /// Returns the instance's current playback state.
    async fn query_state(&self) -> PlayerResult<PlayerState>;

    /// Tears the instance down. Further commands fail with `Destroyed`.
    async fn destroy(&self) -> PlayerResult<()>;
}

/// Entry point to the external player API.
#[async_trait]
pub trait PlayerBackend: Send + Sync {
    /// Whether the player API is loaded. Must not block.
    fn is_available(&self) -> bool;

    /// Starts loading the player API if it is not already loading.
    fn request_load(&self);

    /// Registers the global one-shot ready callback.
    ///
    /// Returns `false` if another consumer already owns the callback slot, in
    /// which case the callback will never fire and readiness must be polled.
    fn register_ready_callback(&self, callback: ReadyCallback) -> bool;

    /// Creates a player instance bound to `options.source_id`.
    ///
    /// The instance reports `Ready`, state changes and errors through `events`.
    ///
    /// # Arguments
    /// * `options` - Video id, autoplay, looping and initial volume
    /// * `events` - Sink tagged with the binding id for this instance
    async fn create(
        &self,
        options: PlayerOptions,
        events: PlayerEventSink,
    ) -> PlayerResult<Arc<dyn PlayerHandle>>;
}
