//! Event system for session observers and tooling.
//!
//! This module provides:
//! - [`EventEmitter`] trait for the session manager to emit events
//! - [`BroadcastEventBridge`] for fan-out over a broadcast channel
//! - Event types for the session lifecycle and transient notices

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

#[cfg(test)]
pub(crate) use emitter::tests::RecordingEventEmitter;

use serde::Serialize;

use crate::player::{PlayerState, ReadySource};
use crate::state::SessionPhase;

/// Events broadcast to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Session lifecycle and player reconciliation.
    Session(SessionEvent),

    /// Transient user-visible notices.
    Notice(NoticeEvent),
}

/// Events related to the playback session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A track was selected (intent set to playing).
    TrackSelected {
        #[serde(rename = "trackId")]
        track_id: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The play/pause intent changed.
    IntentChanged {
        #[serde(rename = "isPlaying")]
        is_playing: bool,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Stored volume changed.
    VolumeChanged {
        volume: u8,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The session moved between phases.
    PhaseChanged {
        from: SessionPhase,
        to: SessionPhase,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The session was stopped and cleared.
    Stopped {
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The player API became available.
    PlayerApiReady {
        source: ReadySource,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A player instance was created for a track.
    PlayerBound {
        binding: u64,
        #[serde(rename = "trackId")]
        track_id: String,
        #[serde(rename = "sourceId")]
        source_id: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A player instance was destroyed.
    PlayerReleased {
        binding: u64,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The player confirmed a playback state.
    PlayerStateConfirmed {
        state: PlayerState,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// An error was surfaced to the user.
    ErrorSurfaced {
        code: String,
        message: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Events related to transient notices.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NoticeEvent {
    /// A notice became visible (replacing any previous one).
    Posted {
        message: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The visible notice expired.
    Cleared {
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}
