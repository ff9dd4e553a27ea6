//! Core session state types.
//!
//! This module provides the flat [`SessionState`] owned by the session
//! manager, the [`SessionPhase`] state machine, the read-only [`SessionView`]
//! handed to observers, and the tunable [`Config`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::Track;
use crate::protocol_constants::SESSION_STORAGE_KEY;

/// What is (or should be) playing.
///
/// Invariants: `volume` is within 0-100 and `is_playing` implies
/// `current_track.is_some()`. Only the session manager mutates this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub current_track: Option<Track>,
    pub is_playing: bool,
    pub volume: u8,
}

impl SessionState {
    pub fn new(default_volume: u8) -> Self {
        Self {
            current_track: None,
            is_playing: false,
            volume: default_volume.min(100),
        }
    }

    /// Re-establishes the invariants after an external mutation.
    pub(crate) fn normalize(&mut self) {
        self.volume = self.volume.min(100);
        if self.current_track.is_none() {
            self.is_playing = false;
        }
    }

    pub fn current_track_id(&self) -> Option<&str> {
        self.current_track.as_ref().map(|t| t.id.as_str())
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(Config::default().default_volume)
    }
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    /// No track selected.
    #[default]
    Idle,
    /// Track selected; the player capability is being acquired or created.
    Binding,
    /// Player ready and confirmed not playing.
    ReadyPaused,
    /// Player ready and confirmed playing.
    ReadyPlaying,
    /// A play instruction was issued but the player stayed cued or unstarted.
    ///
    /// Intent is left as playing so the next user gesture (or page load)
    /// resumes. Usually an autoplay restriction in the host page.
    Cued,
    /// A surfaced failure. The session is still usable.
    ///
    /// Lasts as long as its notice, then returns to `Binding` (track
    /// selected) or `Idle`.
    Error,
}

/// Snapshot of the session pushed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub track: Option<Track>,
    /// Persisted intent.
    pub intent_playing: bool,
    /// Whether the player has confirmed it is playing.
    pub playing: bool,
    pub volume: u8,
    pub phase: SessionPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub player_ready: bool,
}

impl SessionView {
    /// Text for the "now playing" label.
    pub fn headline(&self) -> String {
        if let Some(notice) = &self.notice {
            return format!("⚠️ {notice}");
        }
        match &self.track {
            Some(track) => track.label(),
            None => "No music playing".to_string(),
        }
    }

    /// Glyph for the play/pause button.
    pub fn play_glyph(&self) -> &'static str {
        if self.playing {
            "⏸️"
        } else {
            "▶️"
        }
    }

    /// Whether the launcher button should render as active.
    pub fn is_active(&self) -> bool {
        self.playing && self.track.is_some()
    }
}

/// Configuration for readiness polling and playback verification timing.
///
/// All fields have sensible defaults matching the embed widget's behaviour.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Interval between readiness polls (milliseconds).
    pub readiness_poll_interval_ms: u64,

    /// Maximum number of readiness polls before giving up.
    pub readiness_max_attempts: u32,

    /// Delay between the API becoming ready and creating the player (milliseconds).
    pub bind_delay_ms: u64,

    /// Delay between the player reporting ready and issuing play (milliseconds).
    pub play_delay_ms: u64,

    /// Wait after a play instruction before verifying the state (milliseconds).
    pub settle_delay_ms: u64,

    /// Extra wait when verification finds the player buffering (milliseconds).
    pub buffering_recheck_ms: u64,

    /// Delay before recreating the player after a configuration error (milliseconds).
    pub config_retry_delay_ms: u64,

    /// How long a notice stays visible (milliseconds).
    pub notice_duration_ms: u64,

    /// Interval of the periodic observer refresh (milliseconds).
    pub reflect_interval_ms: u64,

    /// Volume used when nothing has been persisted yet.
    pub default_volume: u8,

    /// Storage key for the persisted session.
    pub storage_key: String,

    /// Capacity of the event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.readiness_poll_interval_ms == 0 {
            return Err("readiness_poll_interval_ms must be >= 1".to_string());
        }
        if self.readiness_max_attempts == 0 {
            return Err("readiness_max_attempts must be >= 1".to_string());
        }
        if self.reflect_interval_ms == 0 {
            return Err("reflect_interval_ms must be >= 1 (interval panics on 0)".to_string());
        }
        if self.default_volume > 100 {
            return Err("default_volume must be within 0-100".to_string());
        }
        if self.storage_key.trim().is_empty() {
            return Err("storage_key must not be empty".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        Ok(())
    }

    pub fn readiness_poll_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_interval_ms)
    }

    pub fn bind_delay(&self) -> Duration {
        Duration::from_millis(self.bind_delay_ms)
    }

    pub fn play_delay(&self) -> Duration {
        Duration::from_millis(self.play_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn buffering_recheck(&self) -> Duration {
        Duration::from_millis(self.buffering_recheck_ms)
    }

    pub fn config_retry_delay(&self) -> Duration {
        Duration::from_millis(self.config_retry_delay_ms)
    }

    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.notice_duration_ms)
    }

    pub fn reflect_interval(&self) -> Duration {
        Duration::from_millis(self.reflect_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            readiness_poll_interval_ms: 100,
            readiness_max_attempts: 100,
            bind_delay_ms: 300,
            play_delay_ms: 500,
            settle_delay_ms: 2000,
            buffering_recheck_ms: 2000,
            config_retry_delay_ms: 1000,
            notice_duration_ms: 5000,
            reflect_interval_ms: 1000,
            default_volume: 50,
            storage_key: SESSION_STORAGE_KEY.to_string(),
            event_channel_capacity: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_attempt_ceiling_is_rejected() {
        let config = Config {
            readiness_max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_yaml_style_config_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"default_volume": 30}"#).unwrap();
        assert_eq!(config.default_volume, 30);
        assert_eq!(config.readiness_max_attempts, 100);
        assert_eq!(config.storage_key, "bgMusicState");
    }

    #[test]
    fn normalize_drops_intent_without_track() {
        let mut state = SessionState {
            current_track: None,
            is_playing: true,
            volume: 200,
        };
        state.normalize();
        assert!(!state.is_playing);
        assert_eq!(state.volume, 100);
    }

    #[test]
    fn headline_prefers_notice_then_track() {
        let track = Track::new("a", "Gentle Rain", "https://youtu.be/x", "🌧️");
        let mut view = SessionView {
            track: Some(track),
            intent_playing: true,
            playing: true,
            volume: 50,
            phase: SessionPhase::ReadyPlaying,
            notice: Some("Invalid video URL".into()),
            player_ready: true,
        };
        assert_eq!(view.headline(), "⚠️ Invalid video URL");
        view.notice = None;
        assert_eq!(view.headline(), "🌧️ Gentle Rain");
        assert_eq!(view.play_glyph(), "⏸️");
        view.track = None;
        assert_eq!(view.headline(), "No music playing");
    }
}
