//! Playback session manager.
//!
//! Responsibilities:
//! - Own the single "what is / should be playing" truth and persist it
//! - Acquire the external player capability (callback-or-poll readiness)
//! - Keep at most one live player instance, bound to the current track
//! - Reconcile intent against confirmed player notifications
//! - Surface failures as transient notices and reflect state to observers
//!
//! # Concurrency
//!
//! State lives behind a `parking_lot::Mutex` that is never held across an
//! `.await`. Player notifications arrive on one channel and are handled one
//! at a time by a single event-loop task. Creating and releasing player
//! instances is serialized by `bind_lock`, so no two instances are ever live.
//! Every select/stop bumps `epoch`; work started under an older epoch
//! discards its result instead of applying it.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::catalog::{Catalog, Track};
use crate::error::{ErrorCode, SessionError, SessionResult};
use crate::events::{EventEmitter, SessionEvent};
use crate::player::{
    BoundPlayerEvent, PlayerBackend, PlayerError, PlayerEvent, PlayerEventSink, PlayerHandle,
    PlayerOptions, PlayerState, Readiness, ReadinessGate, ReadySource, RetryBudget,
};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::notice::NoticeBoard;
use crate::services::reflect::{ObserverId, ObserverRegistry, Reflector};
use crate::state::{Config, SessionPhase, SessionState, SessionView};
use crate::storage::{KeyValueStore, SessionPersistence};
use crate::utils::{clamp_volume, now_millis};

/// Corrective instructions allowed before the player's state is accepted.
const MAX_DIVERGENCE_CORRECTIONS: u32 = 1;

/// Automatic recreate attempts after a configuration error.
const MAX_CONFIGURATION_RETRIES: u32 = 1;

/// The live player instance.
struct Binding {
    id: u64,
    track_id: String,
    handle: Arc<dyn PlayerHandle>,
    /// Set once the instance reported `Ready`.
    ready: bool,
    /// Set once a play instruction was sent to this instance.
    play_issued: bool,
}

struct Inner {
    state: SessionState,
    phase: SessionPhase,
    /// Last state confirmed by the player.
    confirmed: Option<PlayerState>,
    binding: Option<Binding>,
    next_binding_id: u64,
    epoch: u64,
    /// Pending readiness acquisition: (id, token).
    acquisition: Option<(u64, CancellationToken)>,
    next_acquisition_id: u64,
    corrections: RetryBudget,
    configuration_retries: RetryBudget,
}

/// What `toggle_playback` does after recording the new intent.
enum ToggleAction {
    Play(u64, Arc<dyn PlayerHandle>),
    Pause(Arc<dyn PlayerHandle>),
    /// An instance or acquisition is on its way and will apply the intent.
    Wait,
    Rebind,
    Nothing,
}

/// Coordinates one playback session.
pub struct SessionManager {
    config: Config,
    catalog: Catalog,
    backend: Arc<dyn PlayerBackend>,
    persistence: SessionPersistence,
    emitter: Arc<dyn EventEmitter>,
    observers: ObserverRegistry,
    notices: NoticeBoard,
    readiness: ReadinessGate,
    spawner: TokioSpawner,
    shutdown: CancellationToken,
    events_tx: mpsc::UnboundedSender<BoundPlayerEvent>,
    inner: Mutex<Inner>,
    bind_lock: tokio::sync::Mutex<()>,
}

impl SessionManager {
    /// Creates the manager, loads persisted state and starts the event loop.
    ///
    /// # Arguments
    /// * `config` - Timing and storage configuration
    /// * `catalog` - Tracks that persisted ids are resolved against
    /// * `backend` - External player API
    /// * `store` - Durable key-value storage
    /// * `emitter` - Destination for session and notice events
    /// * `spawner` - Runs timers and the event loop
    /// * `shutdown` - Cancels every background task of this session
    pub fn new(
        config: Config,
        catalog: Catalog,
        backend: Arc<dyn PlayerBackend>,
        store: Arc<dyn KeyValueStore>,
        emitter: Arc<dyn EventEmitter>,
        spawner: TokioSpawner,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        let persistence = SessionPersistence::new(store, config.storage_key.clone());
        let state = persistence.load(&catalog, config.default_volume);
        log::info!(
            "[Session] Loaded state: track={:?}, playing={}, volume={}",
            state.current_track_id(),
            state.is_playing,
            state.volume
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let manager = Arc::new(Self {
            notices: NoticeBoard::new(Arc::clone(&emitter)),
            config,
            catalog,
            backend,
            persistence,
            emitter,
            observers: ObserverRegistry::new(),
            readiness: ReadinessGate::new(),
            spawner,
            shutdown,
            events_tx,
            inner: Mutex::new(Inner {
                state,
                phase: SessionPhase::Idle,
                confirmed: None,
                binding: None,
                next_binding_id: 0,
                epoch: 0,
                acquisition: None,
                next_acquisition_id: 0,
                corrections: RetryBudget::new(MAX_DIVERGENCE_CORRECTIONS),
                configuration_retries: RetryBudget::new(MAX_CONFIGURATION_RETRIES),
            }),
            bind_lock: tokio::sync::Mutex::new(()),
        });
        manager.start_event_loop(events_rx);
        manager
    }

    fn start_event_loop(self: &Arc<Self>, mut rx: mpsc::UnboundedReceiver<BoundPlayerEvent>) {
        let weak = Arc::downgrade(self);
        self.spawner
            .spawn_cancellable(self.shutdown.clone(), async move {
                while let Some(event) = rx.recv().await {
                    let Some(manager) = weak.upgrade() else {
                        break;
                    };
                    manager.handle_player_event(event).await;
                }
                log::debug!("[Session] Event loop finished");
            });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Public operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Selects `track`, sets the intent to playing and (re)binds the player.
    ///
    /// Any track value is accepted. A track whose URL has no resolvable video
    /// id releases the current player, leaves the session in
    /// [`SessionPhase::Error`] until the notice clears and returns
    /// [`SessionError::InvalidSource`].
    pub async fn select_track(self: &Arc<Self>, track: Track) -> SessionResult<()> {
        log::info!("[Session] Selecting track {} ({})", track.name, track.id);
        let epoch = {
            let mut inner = self.inner.lock();
            inner.state.current_track = Some(track.clone());
            inner.state.is_playing = true;
            inner.confirmed = None;
            inner.corrections.reset();
            inner.configuration_retries.reset();
            inner.epoch += 1;
            self.persist(&inner.state);
            inner.epoch
        };
        self.emitter.emit_session(SessionEvent::TrackSelected {
            track_id: track.id.clone(),
            timestamp: now_millis(),
        });

        if track.source_id().is_none() {
            log::error!("[Session] Could not extract a video id from {}", track.source_url);
            self.release_binding().await;
            self.set_phase(SessionPhase::Error);
            let err = SessionError::InvalidSource(track.source_url);
            self.surface(&err);
            return Err(err);
        }

        self.set_phase(SessionPhase::Binding);
        self.reflect_now();
        self.bind(epoch).await;
        Ok(())
    }

    /// Looks `id` up in the catalog and selects it.
    pub async fn select_track_by_id(self: &Arc<Self>, id: &str) -> SessionResult<()> {
        let track = self
            .catalog
            .find(id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownTrack(id.to_string()))?;
        self.select_track(track).await
    }

    /// Flips the play/pause intent and instructs the player.
    ///
    /// The new intent is persisted before the player is told anything. If no
    /// usable player exists (or it rejects `play`), the track is rebound as
    /// if freshly selected. Returns the new intent.
    pub async fn toggle_playback(self: &Arc<Self>) -> SessionResult<bool> {
        let (playing, action) = {
            let mut inner = self.inner.lock();
            if inner.state.current_track.is_none() {
                drop(inner);
                let err = SessionError::NoTrackSelected;
                self.surface(&err);
                return Err(err);
            }

            inner.state.is_playing = !inner.state.is_playing;
            inner.corrections.reset();
            self.persist(&inner.state);

            let playing = inner.state.is_playing;
            let action = match (&inner.binding, playing) {
                (Some(b), true) if b.ready => ToggleAction::Play(b.id, Arc::clone(&b.handle)),
                (Some(b), false) if b.ready => ToggleAction::Pause(Arc::clone(&b.handle)),
                (Some(_), _) => ToggleAction::Wait,
                (None, true) if inner.acquisition.is_some() => ToggleAction::Wait,
                (None, true) => ToggleAction::Rebind,
                (None, false) => ToggleAction::Nothing,
            };
            if let (ToggleAction::Play(..), Some(b)) = (&action, inner.binding.as_mut()) {
                b.play_issued = true;
            }
            (playing, action)
        };
        log::info!("[Session] Toggled intent to {}", if playing { "play" } else { "pause" });
        self.emitter.emit_session(SessionEvent::IntentChanged {
            is_playing: playing,
            timestamp: now_millis(),
        });

        match action {
            ToggleAction::Play(binding, handle) => match handle.play().await {
                Ok(()) => self.spawn_verification(binding, handle),
                Err(e) => {
                    log::warn!("[Session] Play instruction failed ({}), rebinding", e);
                    self.rebind().await;
                }
            },
            ToggleAction::Pause(handle) => {
                if let Err(e) = handle.pause().await {
                    log::warn!("[Session] Pause instruction failed: {}", e);
                }
            }
            ToggleAction::Rebind => self.rebind().await,
            ToggleAction::Wait | ToggleAction::Nothing => {}
        }

        self.reflect_now();
        Ok(playing)
    }

    /// Clears the track and intent and releases the player. Idempotent.
    ///
    /// Also cancels a pending readiness acquisition.
    pub async fn stop(&self) {
        log::info!("[Session] Stopping playback");
        let acquisition = {
            let mut inner = self.inner.lock();
            inner.epoch += 1;
            inner.state.current_track = None;
            inner.state.is_playing = false;
            inner.confirmed = None;
            inner.corrections.reset();
            inner.configuration_retries.reset();
            self.persist(&inner.state);
            inner.acquisition.take()
        };
        if let Some((_, token)) = acquisition {
            token.cancel();
        }

        self.release_binding().await;
        self.set_phase(SessionPhase::Idle);
        self.emitter.emit_session(SessionEvent::Stopped {
            timestamp: now_millis(),
        });
        self.reflect_now();
    }

    /// Stores `volume` clamped to 0-100 and forwards it to a ready player.
    ///
    /// Forwarding failures are logged and otherwise ignored.
    pub async fn set_volume(&self, volume: i64) -> u8 {
        let volume = clamp_volume(volume);
        let handle = {
            let mut inner = self.inner.lock();
            inner.state.volume = volume;
            self.persist(&inner.state);
            inner
                .binding
                .as_ref()
                .filter(|b| b.ready)
                .map(|b| Arc::clone(&b.handle))
        };
        self.emitter.emit_session(SessionEvent::VolumeChanged {
            volume,
            timestamp: now_millis(),
        });

        if let Some(handle) = handle {
            if let Err(e) = handle.set_volume(volume).await {
                log::warn!("[Session] Failed to forward volume {}: {}", volume, e);
            }
        }
        self.reflect_now();
        volume
    }

    /// Whether the player API is available. Never blocks.
    pub fn query_readiness(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Restores the persisted session after a page load.
    ///
    /// A persisted track is rebound with its persisted intent (autoplay only
    /// if it was playing). Without a track the player API is still warmed up.
    pub async fn resume(self: &Arc<Self>) {
        let resumed = {
            let mut inner = self.inner.lock();
            inner.state.current_track.clone().map(|track| {
                inner.epoch += 1;
                (track, inner.epoch, inner.state.is_playing)
            })
        };

        match resumed {
            Some((track, epoch, playing)) => {
                log::info!(
                    "[Session] Resuming {} ({})",
                    track.name,
                    if playing { "playing" } else { "paused" }
                );
                if track.source_id().is_none() {
                    self.set_phase(SessionPhase::Error);
                    self.surface(&SessionError::InvalidSource(track.source_url));
                    return;
                }
                self.set_phase(SessionPhase::Binding);
                self.bind(epoch).await;
            }
            None => self.ensure_acquisition(),
        }
        self.reflect_now();
    }

    /// Returns the session to defaults: stopped, default volume, no notice.
    pub async fn reset(&self) {
        self.stop().await;
        {
            let mut inner = self.inner.lock();
            inner.state = SessionState::new(self.config.default_volume);
            self.persist(&inner.state);
        }
        self.notices.clear();
        self.reflect_now();
    }

    /// Releases the player without touching the persisted session, so the
    /// next start resumes where this one left off.
    pub async fn release(&self) {
        let acquisition = self.inner.lock().acquisition.take();
        if let Some((_, token)) = acquisition {
            token.cancel();
        }
        self.release_binding().await;
    }

    /// Current snapshot for observers.
    pub fn view(&self) -> SessionView {
        let notice = self.notices.current();
        let player_ready = self.readiness.is_ready();
        let inner = self.inner.lock();
        SessionView {
            track: inner.state.current_track.clone(),
            intent_playing: inner.state.is_playing,
            playing: inner.state.current_track.is_some()
                && inner.confirmed == Some(PlayerState::Playing),
            volume: inner.state.volume,
            phase: inner.phase,
            notice,
            player_ready,
        }
    }

    /// Copy of the session state.
    pub fn state(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.lock().phase
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn register_observer(&self, observer: Arc<dyn Reflector>) -> ObserverId {
        let id = self.observers.register(observer);
        self.reflect_now();
        id
    }

    pub fn unregister_observer(&self, id: ObserverId) -> bool {
        self.observers.unregister(id)
    }

    /// Pushes the current view to every observer.
    pub fn reflect_now(&self) {
        if self.observers.is_empty() {
            return;
        }
        let view = self.view();
        self.observers.reflect_all(&view);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding
    // ─────────────────────────────────────────────────────────────────────────

    async fn bind(self: &Arc<Self>, epoch: u64) {
        if !self.readiness.is_ready()
            && self.backend.is_available()
            && self.readiness.mark_ready(ReadySource::AlreadyLoaded)
        {
            self.emitter.emit_session(SessionEvent::PlayerApiReady {
                source: ReadySource::AlreadyLoaded,
                timestamp: now_millis(),
            });
        }

        if self.readiness.is_ready() {
            self.create_player(epoch).await;
        } else {
            self.ensure_acquisition();
        }
    }

    async fn rebind(self: &Arc<Self>) {
        let track = self.inner.lock().state.current_track.clone();
        if let Some(track) = track {
            // Errors are already surfaced by `select_track`.
            let _ = self.select_track(track).await;
        }
    }

    /// Starts readiness acquisition unless one is already running.
    fn ensure_acquisition(self: &Arc<Self>) {
        let (id, token) = {
            let mut inner = self.inner.lock();
            if inner.acquisition.is_some() {
                return;
            }
            inner.next_acquisition_id += 1;
            let id = inner.next_acquisition_id;
            let token = self.shutdown.child_token();
            inner.acquisition = Some((id, token.clone()));
            (id, token)
        };

        let this = Arc::clone(self);
        self.spawner.spawn(async move {
            let result = this
                .readiness
                .acquire(
                    this.backend.as_ref(),
                    this.config.readiness_poll_interval(),
                    this.config.readiness_max_attempts,
                    &token,
                )
                .await;

            {
                let mut inner = this.inner.lock();
                if matches!(inner.acquisition, Some((current, _)) if current == id) {
                    inner.acquisition = None;
                }
            }

            match result {
                Readiness::Ready(source) => this.on_api_ready(source, &token).await,
                Readiness::TimedOut { attempts } => this.on_api_timeout(attempts),
                Readiness::Cancelled => log::debug!("[Session] Readiness acquisition cancelled"),
            }
        });
    }

    async fn on_api_ready(self: &Arc<Self>, source: ReadySource, token: &CancellationToken) {
        self.emitter.emit_session(SessionEvent::PlayerApiReady {
            source,
            timestamp: now_millis(),
        });

        if source != ReadySource::AlreadyLoaded {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(self.config.bind_delay()) => {}
            }
        }

        let epoch = {
            let inner = self.inner.lock();
            if inner.state.current_track.is_none() {
                None
            } else {
                Some(inner.epoch)
            }
        };
        match epoch {
            Some(epoch) => self.create_player(epoch).await,
            None => self.reflect_now(),
        }
    }

    fn on_api_timeout(self: &Arc<Self>, attempts: u32) {
        let has_track = self.inner.lock().state.current_track.is_some();
        if !has_track {
            log::warn!("[Session] Player API did not load after {} checks", attempts);
            return;
        }
        self.set_phase(SessionPhase::Error);
        self.surface(&SessionError::CapabilityUnavailable(format!(
            "player API not available after {attempts} checks"
        )));
    }

    /// Releases any live instance and creates one for the current track.
    async fn create_player(self: &Arc<Self>, epoch: u64) {
        let _guard = self.bind_lock.lock().await;

        let prepared = {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                log::debug!("[Session] Skipping superseded bind (epoch {})", epoch);
                return;
            }
            let Some(track) = inner.state.current_track.clone() else {
                return;
            };
            let Some(source_id) = track.source_id() else {
                return;
            };
            inner.next_binding_id += 1;
            inner.confirmed = None;
            let options = PlayerOptions {
                source_id,
                autoplay: inner.state.is_playing,
                looping: true,
                volume: inner.state.volume,
            };
            (options, track.id, inner.next_binding_id, inner.binding.take())
        };
        let (options, track_id, binding_id, previous) = prepared;

        if let Some(previous) = previous {
            self.destroy_binding(previous).await;
        }

        log::info!(
            "[Session] Creating player {} for {} (video {})",
            binding_id,
            track_id,
            options.source_id
        );
        let source_id = options.source_id.to_string();
        let sink = PlayerEventSink::new(binding_id, self.events_tx.clone());

        match self.backend.create(options, sink).await {
            Ok(handle) => {
                let superseded = {
                    let mut inner = self.inner.lock();
                    if inner.epoch == epoch {
                        inner.binding = Some(Binding {
                            id: binding_id,
                            track_id: track_id.clone(),
                            handle: Arc::clone(&handle),
                            ready: false,
                            play_issued: false,
                        });
                        false
                    } else {
                        true
                    }
                };
                if superseded {
                    log::debug!("[Session] Discarding player {} created for an old selection", binding_id);
                    if let Err(e) = handle.destroy().await {
                        log::warn!("[Session] Failed to destroy discarded player: {}", e);
                    }
                    return;
                }
                self.emitter.emit_session(SessionEvent::PlayerBound {
                    binding: binding_id,
                    track_id,
                    source_id,
                    timestamp: now_millis(),
                });
                self.set_phase(SessionPhase::Binding);
            }
            Err(e) => self.on_create_failed(epoch, e),
        }
    }

    fn on_create_failed(self: &Arc<Self>, epoch: u64, error: PlayerError) {
        log::error!("[Session] Failed to create player: {}", error);
        if error.is_configuration() && self.inner.lock().configuration_retries.try_consume() {
            self.schedule_recreate(epoch);
            return;
        }
        self.set_phase(SessionPhase::Error);
        self.surface(&SessionError::from(error));
    }

    /// Destroys and recreates the player after the configuration retry delay.
    fn schedule_recreate(self: &Arc<Self>, epoch: u64) {
        log::info!(
            "[Session] Configuration error, recreating player in {}ms",
            self.config.config_retry_delay_ms
        );
        let this = Arc::clone(self);
        self.spawner
            .spawn_cancellable(self.shutdown.clone(), async move {
                tokio::time::sleep(this.config.config_retry_delay()).await;
                this.create_player(epoch).await;
            });
    }

    /// Takes the live instance (if any) and destroys it.
    async fn release_binding(&self) {
        let _guard = self.bind_lock.lock().await;
        let binding = self.inner.lock().binding.take();
        if let Some(binding) = binding {
            self.destroy_binding(binding).await;
        }
    }

    async fn destroy_binding(&self, binding: Binding) {
        log::info!("[Session] Releasing player {} ({})", binding.id, binding.track_id);
        if let Err(e) = binding.handle.stop().await {
            log::debug!("[Session] Stop before destroy failed: {}", e);
        }
        if let Err(e) = binding.handle.destroy().await {
            log::warn!("[Session] Failed to destroy player {}: {}", binding.id, e);
        }
        self.emitter.emit_session(SessionEvent::PlayerReleased {
            binding: binding.id,
            timestamp: now_millis(),
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Player notifications
    // ─────────────────────────────────────────────────────────────────────────

    async fn handle_player_event(self: &Arc<Self>, bound: BoundPlayerEvent) {
        let handle = {
            let inner = self.inner.lock();
            match &inner.binding {
                Some(b) if b.id == bound.binding => Arc::clone(&b.handle),
                _ => {
                    log::debug!(
                        "[Session] Ignoring {:?} from released player {}",
                        bound.event,
                        bound.binding
                    );
                    return;
                }
            }
        };

        match bound.event {
            PlayerEvent::Ready => self.on_player_ready(bound.binding, handle).await,
            PlayerEvent::StateChanged(state) => self.on_state_changed(handle, state).await,
            PlayerEvent::Error(code) => self.on_player_error(bound.binding, code),
        }
        self.reflect_now();
    }

    async fn on_player_ready(self: &Arc<Self>, binding: u64, handle: Arc<dyn PlayerHandle>) {
        let (volume, playing) = {
            let mut inner = self.inner.lock();
            if let Some(b) = inner.binding.as_mut() {
                b.ready = true;
            }
            (inner.state.volume, inner.state.is_playing)
        };
        log::info!("[Session] Player {} ready", binding);

        if let Err(e) = handle.set_volume(volume).await {
            log::warn!("[Session] Failed to apply volume on ready: {}", e);
        }
        unmute(handle.as_ref()).await;
        if let Err(e) = handle.set_loop(true).await {
            log::warn!("[Session] Failed to enable looping: {}", e);
        }

        if playing {
            self.spawn_play_attempt(binding, handle);
        } else {
            self.set_phase(SessionPhase::ReadyPaused);
        }
    }

    /// Issues play after the play delay, then verifies the outcome.
    fn spawn_play_attempt(self: &Arc<Self>, binding: u64, handle: Arc<dyn PlayerHandle>) {
        let this = Arc::clone(self);
        self.spawner
            .spawn_cancellable(self.shutdown.clone(), async move {
                tokio::time::sleep(this.config.play_delay()).await;
                if !this.is_current(binding) || !this.intent_playing() {
                    return;
                }
                this.mark_play_issued(binding);
                unmute(handle.as_ref()).await;
                if let Err(e) = handle.play().await {
                    log::warn!("[Session] Play instruction failed: {}", e);
                    return;
                }
                tokio::time::sleep(this.config.settle_delay()).await;
                this.verify_playback(binding, handle).await;
            });
    }

    fn spawn_verification(self: &Arc<Self>, binding: u64, handle: Arc<dyn PlayerHandle>) {
        let this = Arc::clone(self);
        self.spawner
            .spawn_cancellable(self.shutdown.clone(), async move {
                tokio::time::sleep(this.config.settle_delay()).await;
                this.verify_playback(binding, handle).await;
            });
    }

    /// Checks the player's state some time after a play instruction.
    async fn verify_playback(self: &Arc<Self>, binding: u64, handle: Arc<dyn PlayerHandle>) {
        if !self.is_current(binding) {
            return;
        }
        let state = match handle.query_state().await {
            Ok(state) => state,
            Err(e) => {
                log::warn!("[Session] Could not verify playback: {}", e);
                return;
            }
        };
        log::debug!("[Session] Player {} state after play: {:?}", binding, state);
        match handle.is_muted().await {
            Ok(true) => {
                log::info!("[Session] Player {} is muted, unmuting", binding);
                unmute(handle.as_ref()).await;
            }
            Ok(false) => {}
            Err(e) => log::warn!("[Session] Could not check mute status: {}", e),
        }

        match state {
            PlayerState::Playing => self.confirm_playing(),
            PlayerState::Buffering => {
                tokio::time::sleep(self.config.buffering_recheck()).await;
                if !self.is_current(binding) {
                    return;
                }
                if let Ok(PlayerState::Playing) = handle.query_state().await {
                    unmute(handle.as_ref()).await;
                    self.confirm_playing();
                }
            }
            s if s.is_idle() => {
                let mark_cued = {
                    let inner = self.inner.lock();
                    inner.state.is_playing && inner.confirmed != Some(PlayerState::Playing)
                };
                if mark_cued {
                    log::info!("[Session] Player cued but not playing; waiting for a user gesture");
                    self.set_phase(SessionPhase::Cued);
                }
            }
            _ => {}
        }
        self.reflect_now();
    }

    fn confirm_playing(&self) {
        self.inner.lock().confirmed = Some(PlayerState::Playing);
        self.emitter.emit_session(SessionEvent::PlayerStateConfirmed {
            state: PlayerState::Playing,
            timestamp: now_millis(),
        });
        self.set_phase(SessionPhase::ReadyPlaying);
    }

    /// Reconciles a confirmed player state against the intent.
    ///
    /// On divergence the intended instruction is re-issued once; if the
    /// player confirms the same divergent state again, it is accepted and the
    /// intent follows it.
    async fn on_state_changed(self: &Arc<Self>, handle: Arc<dyn PlayerHandle>, state: PlayerState) {
        log::debug!("[Session] Player state changed: {:?}", state);
        self.emitter.emit_session(SessionEvent::PlayerStateConfirmed {
            state,
            timestamp: now_millis(),
        });

        match state {
            PlayerState::Ended => {
                log::info!("[Session] Track ended, looping");
                self.inner.lock().confirmed = Some(state);
                if let Err(e) = handle.play().await {
                    log::warn!("[Session] Failed to restart track: {}", e);
                }
            }
            PlayerState::Buffering => {
                self.inner.lock().confirmed = Some(state);
            }
            PlayerState::Unstarted | PlayerState::Cued => {
                // Fresh instances report unstarted before any play was sent.
                let phase = {
                    let mut inner = self.inner.lock();
                    inner.confirmed = Some(state);
                    let play_issued = inner.binding.as_ref().is_some_and(|b| b.play_issued);
                    match (inner.state.is_playing, play_issued) {
                        (true, true) => Some(SessionPhase::Cued),
                        (true, false) => None,
                        (false, _) => Some(SessionPhase::ReadyPaused),
                    }
                };
                if let Some(phase) = phase {
                    self.set_phase(phase);
                }
            }
            PlayerState::Playing | PlayerState::Paused => {
                self.reconcile(handle, state == PlayerState::Playing).await;
            }
        }
    }

    async fn reconcile(self: &Arc<Self>, handle: Arc<dyn PlayerHandle>, external_playing: bool) {
        let confirmed = if external_playing {
            PlayerState::Playing
        } else {
            PlayerState::Paused
        };
        let (correct, accepted) = {
            let mut inner = self.inner.lock();
            inner.confirmed = Some(confirmed);
            if inner.state.is_playing == external_playing {
                inner.corrections.reset();
                (false, false)
            } else if inner.corrections.try_consume() {
                if !external_playing {
                    if let Some(b) = inner.binding.as_mut() {
                        b.play_issued = true;
                    }
                }
                (true, false)
            } else {
                inner.state.is_playing = external_playing && inner.state.current_track.is_some();
                inner.corrections.reset();
                self.persist(&inner.state);
                (false, true)
            }
        };

        if correct {
            log::info!(
                "[Session] Player reports {:?} against intent, re-issuing once",
                confirmed
            );
            let result = if external_playing {
                handle.pause().await
            } else {
                handle.play().await
            };
            if let Err(e) = result {
                log::warn!("[Session] Corrective instruction failed: {}", e);
            }
            return;
        }

        if accepted {
            log::info!("[Session] Accepting player state {:?} as authoritative", confirmed);
            self.emitter.emit_session(SessionEvent::IntentChanged {
                is_playing: external_playing,
                timestamp: now_millis(),
            });
        }
        if external_playing {
            self.ensure_audible(handle.as_ref()).await;
            self.set_phase(SessionPhase::ReadyPlaying);
        } else {
            self.set_phase(SessionPhase::ReadyPaused);
        }
    }

    /// Unmutes a playing instance and restores the session volume if the
    /// player dropped to zero.
    async fn ensure_audible(&self, handle: &dyn PlayerHandle) {
        match handle.is_muted().await {
            Ok(true) => {
                log::info!("[Session] Playing but muted, unmuting");
                unmute(handle).await;
            }
            Ok(false) => {}
            Err(e) => log::warn!("[Session] Could not check mute status: {}", e),
        }

        match handle.volume().await {
            Ok(0) => {
                let volume = self.inner.lock().state.volume;
                if volume > 0 {
                    log::info!("[Session] Player volume was 0, restoring {}", volume);
                    if let Err(e) = handle.set_volume(volume).await {
                        log::warn!("[Session] Failed to restore volume: {}", e);
                    }
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!("[Session] Could not read player volume: {}", e),
        }
    }

    fn on_player_error(self: &Arc<Self>, binding: u64, code: i32) {
        let error = PlayerError::from_code(code);
        log::error!("[Session] Player {} reported error {}", binding, code);

        if error.is_configuration() {
            let retry = {
                let mut inner = self.inner.lock();
                inner.configuration_retries.try_consume().then_some(inner.epoch)
            };
            if let Some(epoch) = retry {
                self.schedule_recreate(epoch);
                return;
            }
        }

        self.set_phase(SessionPhase::Error);
        self.surface(&SessionError::from(error));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn is_current(&self, binding: u64) -> bool {
        self.inner.lock().binding.as_ref().map(|b| b.id) == Some(binding)
    }

    fn mark_play_issued(&self, binding: u64) {
        let mut inner = self.inner.lock();
        if let Some(b) = inner.binding.as_mut().filter(|b| b.id == binding) {
            b.play_issued = true;
        }
    }

    fn intent_playing(&self) -> bool {
        self.inner.lock().state.is_playing
    }

    fn persist(&self, state: &SessionState) {
        if let Err(e) = self.persistence.save(state) {
            log::warn!("[Storage] Failed to save session state: {}", e);
        }
    }

    fn set_phase(&self, phase: SessionPhase) {
        let previous = {
            let mut inner = self.inner.lock();
            std::mem::replace(&mut inner.phase, phase)
        };
        self.phase_changed(previous, phase);
    }

    /// Ends an `Error` phase: back to `Binding` while a track is selected,
    /// otherwise `Idle`.
    fn leave_error(&self) {
        let next = {
            let mut inner = self.inner.lock();
            if inner.phase != SessionPhase::Error {
                return;
            }
            inner.phase = if inner.state.current_track.is_some() {
                SessionPhase::Binding
            } else {
                SessionPhase::Idle
            };
            inner.phase
        };
        self.phase_changed(SessionPhase::Error, next);
    }

    fn phase_changed(&self, previous: SessionPhase, phase: SessionPhase) {
        if previous != phase {
            log::debug!("[Session] Phase {:?} -> {:?}", previous, phase);
            self.emitter.emit_session(SessionEvent::PhaseChanged {
                from: previous,
                to: phase,
                timestamp: now_millis(),
            });
        }
    }

    /// Shows `error` as a self-clearing notice.
    fn surface(self: &Arc<Self>, error: &SessionError) {
        log::warn!("[Session] {} ({})", error, error.code());
        let message = error.notice();
        self.emitter.emit_session(SessionEvent::ErrorSurfaced {
            code: error.code().to_string(),
            message: message.clone(),
            timestamp: now_millis(),
        });

        let id = self.notices.post(message);
        let this = Arc::clone(self);
        self.spawner
            .spawn_cancellable(self.shutdown.clone(), async move {
                tokio::time::sleep(this.config.notice_duration()).await;
                if this.notices.clear_if_current(id) {
                    this.leave_error();
                    this.reflect_now();
                }
            });
        self.reflect_now();
    }
}

/// Unmutes `handle`, logging failures.
async fn unmute(handle: &dyn PlayerHandle) {
    if let Err(e) = handle.unmute().await {
        log::warn!("[Session] Failed to unmute player: {}", e);
    }
}
