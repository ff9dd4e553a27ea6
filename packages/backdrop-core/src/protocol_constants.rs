//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the external embeddable player and by the
//! persisted layout already written to users' storage. Changing them would
//! break compatibility with the player API or with previously saved sessions.

// ─────────────────────────────────────────────────────────────────────────────
// Player State Codes
// ─────────────────────────────────────────────────────────────────────────────

/// Player has not started playback yet.
pub const PLAYER_STATE_UNSTARTED: i32 = -1;

/// Playback reached the end of the video.
pub const PLAYER_STATE_ENDED: i32 = 0;

/// Player is playing.
pub const PLAYER_STATE_PLAYING: i32 = 1;

/// Player is paused.
pub const PLAYER_STATE_PAUSED: i32 = 2;

/// Player is buffering.
pub const PLAYER_STATE_BUFFERING: i32 = 3;

/// Video is cued and waiting for a play instruction.
pub const PLAYER_STATE_CUED: i32 = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Player Error Codes
// ─────────────────────────────────────────────────────────────────────────────

/// The request contains an invalid video id.
pub const PLAYER_ERROR_INVALID_ID: i32 = 2;

/// The content cannot be played in the HTML5 player.
pub const PLAYER_ERROR_HTML5: i32 = 5;

/// The requested video was not found (removed or private).
pub const PLAYER_ERROR_NOT_FOUND: i32 = 100;

/// The owner does not allow embedded playback.
pub const PLAYER_ERROR_NOT_EMBEDDABLE: i32 = 101;

/// Same as [`PLAYER_ERROR_NOT_EMBEDDABLE`], reported under a different code.
pub const PLAYER_ERROR_NOT_EMBEDDABLE_ALT: i32 = 150;

/// Embed configuration rejected by the player (e.g. origin mismatch).
///
/// This is the only code treated as a configuration error and retried with a
/// fresh player instance.
pub const PLAYER_ERROR_CONFIGURATION: i32 = 153;

// ─────────────────────────────────────────────────────────────────────────────
// Source Identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Maximum length of a video identifier. Longer matches are truncated.
pub const SOURCE_ID_MAX_LEN: usize = 11;

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

/// Storage key holding the persisted session layout.
pub const SESSION_STORAGE_KEY: &str = "bgMusicState";
