//! Session bootstrap and dependency wiring.
//!
//! This module is the composition root: the one place where the session
//! manager, event bridge and refresh ticker are created and wired together.
//! Embedders supply the platform pieces (player backend, storage, catalog).

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::catalog::Catalog;
use crate::error::{SessionError, SessionResult};
use crate::events::{BroadcastEvent, BroadcastEventBridge, EventEmitter, LoggingEventEmitter};
use crate::player::PlayerBackend;
use crate::runtime::TokioSpawner;
use crate::services::{start_ticker, SessionManager};
use crate::state::Config;
use crate::storage::KeyValueStore;

/// Container for a wired session.
#[derive(Clone)]
pub struct BootstrappedSession {
    /// The playback session.
    pub manager: Arc<SessionManager>,
    /// Broadcast channel sender for session and notice events.
    pub broadcast_tx: broadcast::Sender<BroadcastEvent>,
    /// Event bridge the manager emits into.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedSession {
    /// Returns a receiver for all session and notice events.
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Stops background work and releases the player.
    ///
    /// The persisted session is left as is.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");
        self.cancel_token.cancel();
        self.manager.release().await;
        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps a playback session.
///
/// Wiring order:
///
/// 1. Validate configuration
/// 2. Shared infrastructure (spawner, broadcast channel, cancellation token)
/// 3. Session manager (loads persisted state, starts its event loop)
/// 4. Periodic observer refresh
///
/// The session is not resumed; call [`SessionManager::resume`] once
/// observers are registered.
///
/// # Errors
///
/// Returns [`SessionError::InvalidConfig`] if `config` fails validation.
pub fn bootstrap_session(
    config: &Config,
    catalog: Catalog,
    backend: Arc<dyn PlayerBackend>,
    store: Arc<dyn KeyValueStore>,
) -> SessionResult<BootstrappedSession> {
    config.validate().map_err(SessionError::InvalidConfig)?;

    let spawner = TokioSpawner::current();

    let (broadcast_tx, _) = broadcast::channel::<BroadcastEvent>(config.event_channel_capacity);
    let event_bridge = Arc::new(BroadcastEventBridge::with_sender(broadcast_tx.clone()));
    event_bridge.set_external_emitter(Arc::new(LoggingEventEmitter));

    let cancel_token = CancellationToken::new();

    let manager = SessionManager::new(
        config.clone(),
        catalog,
        backend,
        store,
        Arc::clone(&event_bridge) as Arc<dyn EventEmitter>,
        spawner.clone(),
        cancel_token.clone(),
    );

    let weak = Arc::downgrade(&manager);
    start_ticker(
        &spawner,
        config.reflect_interval(),
        cancel_token.child_token(),
        move || {
            if let Some(manager) = weak.upgrade() {
                manager.reflect_now();
            }
        },
    );

    log::info!(
        "[Bootstrap] Session ready ({} tracks, refresh every {}ms)",
        manager.catalog().len(),
        config.reflect_interval_ms
    );

    Ok(BootstrappedSession {
        manager,
        broadcast_tx,
        event_bridge,
        spawner,
        cancel_token,
    })
}
