//! External embeddable player integration.
//!
//! The player itself (decoding, streaming, rendering) is hosted elsewhere.
//! This module defines the capability the session manager talks to and the
//! machinery for acquiring it reliably.
//!
//! # Module Structure
//!
//! - `types` - Player states, error codes, creation options, notifications
//! - `traits` - `PlayerBackend` / `PlayerHandle` abstractions and the event sink
//! - `readiness` - Single-fire readiness gate fed by callback and polling
//! - `retry` - Bounded polling and attempt budgets

pub mod readiness;
pub mod retry;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use readiness::{Readiness, ReadinessGate, ReadySource};
pub use retry::{poll_until, PollOutcome, RetryBudget};
pub use traits::{BoundPlayerEvent, PlayerBackend, PlayerEventSink, PlayerHandle, ReadyCallback};
pub use types::{
    describe_player_error, PlayerError, PlayerEvent, PlayerOptions, PlayerResult, PlayerState,
};
