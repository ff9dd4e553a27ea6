//! Domain types for the external embeddable player.

use serde::Serialize;
use thiserror::Error;

use crate::catalog::SourceId;
use crate::protocol_constants::{
    PLAYER_ERROR_CONFIGURATION, PLAYER_ERROR_HTML5, PLAYER_ERROR_INVALID_ID,
    PLAYER_ERROR_NOT_EMBEDDABLE, PLAYER_ERROR_NOT_EMBEDDABLE_ALT, PLAYER_ERROR_NOT_FOUND,
    PLAYER_STATE_BUFFERING, PLAYER_STATE_CUED, PLAYER_STATE_ENDED, PLAYER_STATE_PAUSED,
    PLAYER_STATE_PLAYING, PLAYER_STATE_UNSTARTED,
};

/// Playback state reported by the external player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl PlayerState {
    /// Maps a raw state code; unknown codes yield `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            PLAYER_STATE_UNSTARTED => Some(Self::Unstarted),
            PLAYER_STATE_ENDED => Some(Self::Ended),
            PLAYER_STATE_PLAYING => Some(Self::Playing),
            PLAYER_STATE_PAUSED => Some(Self::Paused),
            PLAYER_STATE_BUFFERING => Some(Self::Buffering),
            PLAYER_STATE_CUED => Some(Self::Cued),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Unstarted => PLAYER_STATE_UNSTARTED,
            Self::Ended => PLAYER_STATE_ENDED,
            Self::Playing => PLAYER_STATE_PLAYING,
            Self::Paused => PLAYER_STATE_PAUSED,
            Self::Buffering => PLAYER_STATE_BUFFERING,
            Self::Cued => PLAYER_STATE_CUED,
        }
    }

    /// Cued or unstarted: loaded but never started.
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Cued | Self::Unstarted)
    }
}

/// Errors raised by the external player or its backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    /// The player API or instance is not ready for commands.
    #[error("player is not ready")]
    NotReady,

    /// The instance was already destroyed.
    #[error("player has been destroyed")]
    Destroyed,

    /// The player rejected its embed configuration.
    #[error("player rejected its configuration (code {0})")]
    Configuration(i32),

    /// Any other error code reported by the player.
    #[error("player reported error code {0}")]
    Playback(i32),

    /// Backend failure outside the player's own error codes.
    #[error("player backend failure: {0}")]
    Backend(String),
}

impl PlayerError {
    /// Classifies a raw error code from an error notification.
    pub fn from_code(code: i32) -> Self {
        if code == PLAYER_ERROR_CONFIGURATION {
            Self::Configuration(code)
        } else {
            Self::Playback(code)
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type PlayerResult<T> = Result<T, PlayerError>;

/// Human-readable description of a player error code.
pub fn describe_player_error(code: i32) -> String {
    match code {
        PLAYER_ERROR_INVALID_ID => "Invalid video ID.".to_string(),
        PLAYER_ERROR_HTML5 => "HTML5 player error.".to_string(),
        PLAYER_ERROR_NOT_FOUND => "Video not found.".to_string(),
        PLAYER_ERROR_NOT_EMBEDDABLE | PLAYER_ERROR_NOT_EMBEDDABLE_ALT => {
            "Playback not allowed.".to_string()
        }
        PLAYER_ERROR_CONFIGURATION => "Configuration error.".to_string(),
        other => format!("Error code: {other}"),
    }
}

/// Parameters for creating a player instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerOptions {
    pub source_id: SourceId,
    /// Start playing as soon as the video loads.
    pub autoplay: bool,
    /// Restart from the beginning when the video ends.
    pub looping: bool,
    pub volume: u8,
}

/// Asynchronous notifications delivered by a player instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The instance finished initializing and accepts commands.
    Ready,
    /// Playback state changed.
    StateChanged(PlayerState),
    /// The instance reported an error code.
    Error(i32),
}
