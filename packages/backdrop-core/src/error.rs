//! Centralized error types for the Backdrop core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to machine-readable codes for events and logs
//! - Converts collaborator errors (player, storage) into session errors
//!
//! None of these errors halt a session. The manager turns every surfaced
//! error into a transient notice and stays usable afterwards.

use serde::Serialize;
use thiserror::Error;

use crate::player::{describe_player_error, PlayerError};
use crate::storage::StorageError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for PlayerError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotReady => "player_not_ready",
            Self::Destroyed => "player_destroyed",
            Self::Configuration(_) => "player_configuration",
            Self::Playback(_) => "player_playback",
            Self::Backend(_) => "player_backend",
        }
    }
}

impl ErrorCode for StorageError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "storage_io",
            Self::Serialization(_) => "storage_serialization",
        }
    }
}

/// Session-level error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum SessionError {
    /// The track's source URL does not contain a resolvable video id.
    ///
    /// Non-fatal: only the offending track is unplayable.
    #[error("Invalid source URL: {0}")]
    InvalidSource(String),

    /// A playback action was requested with no track selected.
    #[error("No track selected")]
    NoTrackSelected,

    /// A track id was not found in the catalog.
    #[error("Unknown track: {0}")]
    UnknownTrack(String),

    /// The external player capability could not be acquired or used.
    #[error("Player unavailable: {0}")]
    CapabilityUnavailable(String),

    /// The external player rejected its configuration.
    #[error("Player configuration error (code {0})")]
    ExternalConfiguration(i32),

    /// The external player reported a playback error.
    #[error("Error loading video. {message}")]
    ExternalPlayback {
        /// Raw error code reported by the player.
        code: i32,
        /// Human-readable description of the code.
        message: String,
    },

    /// Persisting or loading session state failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Session configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ErrorCode for SessionError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidSource(_) => "invalid_source",
            Self::NoTrackSelected => "no_track_selected",
            Self::UnknownTrack(_) => "unknown_track",
            Self::CapabilityUnavailable(_) => "capability_unavailable",
            Self::ExternalConfiguration(_) => "external_configuration_error",
            Self::ExternalPlayback { .. } => "external_playback_error",
            Self::Storage(_) => "storage_error",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl SessionError {
    /// Returns the short user-visible message shown as a notice.
    pub fn notice(&self) -> String {
        match self {
            Self::InvalidSource(_) => "Invalid video URL".to_string(),
            Self::NoTrackSelected => "Please select a track first".to_string(),
            Self::UnknownTrack(id) => format!("Unknown track: {id}"),
            Self::CapabilityUnavailable(_) => {
                "Player API failed to load. Please refresh.".to_string()
            }
            Self::ExternalConfiguration(_) => {
                "Error loading video. Configuration error.".to_string()
            }
            Self::ExternalPlayback { .. } => self.to_string(),
            Self::Storage(_) => "Could not save music settings".to_string(),
            Self::InvalidConfig(_) => self.to_string(),
        }
    }
}

impl From<PlayerError> for SessionError {
    fn from(err: PlayerError) -> Self {
        match err {
            PlayerError::Configuration(code) => Self::ExternalConfiguration(code),
            PlayerError::Playback(code) => Self::ExternalPlayback {
                code,
                message: describe_player_error(code),
            },
            other => Self::CapabilityUnavailable(other.to_string()),
        }
    }
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Convenient Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_player_error_maps_to_configuration_session_error() {
        let err: SessionError = PlayerError::Configuration(153).into();
        assert_eq!(err, SessionError::ExternalConfiguration(153));
        assert_eq!(err.code(), "external_configuration_error");
    }

    #[test]
    fn playback_player_error_carries_description() {
        let err: SessionError = PlayerError::Playback(100).into();
        assert_eq!(err.code(), "external_playback_error");
        assert_eq!(err.notice(), "Error loading video. Video not found.");
    }

    #[test]
    fn not_ready_maps_to_capability_unavailable() {
        let err: SessionError = PlayerError::NotReady.into();
        assert_eq!(err.code(), "capability_unavailable");
    }

    #[test]
    fn session_error_serializes_with_tag() {
        let json = serde_json::to_value(SessionError::NoTrackSelected).unwrap();
        assert_eq!(json["type"], "NoTrackSelected");
    }
}
