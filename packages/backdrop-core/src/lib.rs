//! Backdrop Core - shared library for Backdrop.
//!
//! Backdrop keeps an ambient background track playing across page loads
//! through an embeddable video player. This crate holds everything except
//! the platform glue: the session state machine, persistence, readiness
//! detection for the player API and the observer fan-out.
//!
//! # Architecture
//!
//! - [`catalog`]: Tracks and video-id extraction
//! - [`state`]: Session state, phases, observer views and configuration
//! - [`storage`]: Key-value storage and the persisted session layout
//! - [`player`]: External player traits, readiness gate and retry helpers
//! - [`services`]: Session manager, notices and observers
//! - [`events`]: Event system for tooling and subscribers
//! - [`runtime`]: Task spawning abstraction
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`PlayerBackend`](player::PlayerBackend) / [`PlayerHandle`](player::PlayerHandle): The embed API
//! - [`KeyValueStore`](storage::KeyValueStore): Durable storage
//! - [`Reflector`](services::Reflector): Render targets mirroring the session
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod catalog;
pub mod error;
pub mod events;
pub mod player;
pub mod protocol_constants;
pub mod runtime;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

// Re-export commonly used types at the crate root
pub use bootstrap::{bootstrap_session, BootstrappedSession};
pub use catalog::{Catalog, SourceId, Track};
pub use error::{ErrorCode, SessionError, SessionResult};
pub use events::{
    BroadcastEvent, BroadcastEventBridge, EventEmitter, LoggingEventEmitter, NoopEventEmitter,
    NoticeEvent, SessionEvent,
};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::{Config, SessionPhase, SessionState, SessionView};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use utils::{clamp_volume, now_millis};

// Re-export player types
pub use player::{
    PlayerBackend, PlayerError, PlayerEvent, PlayerEventSink, PlayerHandle, PlayerOptions,
    PlayerResult, PlayerState, ReadyCallback,
};

// Re-export service types
pub use services::{ObserverId, ReflectError, Reflector, SessionManager};
