//! In-process stand-in for the embeddable player API.
//!
//! The API "loads" some time after the first load request and each player
//! reports ready shortly after creation. Instructions take effect at once
//! and are echoed back as state notifications, the way the real embed does.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backdrop_core::{
    PlayerBackend, PlayerError, PlayerEventSink, PlayerHandle, PlayerOptions, PlayerResult,
    PlayerState, ReadyCallback,
};
use parking_lot::Mutex;

struct ApiState {
    load_delay: Duration,
    ready_delay: Duration,
    available: AtomicBool,
    loading: AtomicBool,
    callback: Mutex<Option<ReadyCallback>>,
}

#[derive(Clone)]
pub struct SimulatedBackend {
    api: Arc<ApiState>,
}

impl SimulatedBackend {
    pub fn new(load_delay: Duration, ready_delay: Duration) -> Self {
        Self {
            api: Arc::new(ApiState {
                load_delay,
                ready_delay,
                available: AtomicBool::new(false),
                loading: AtomicBool::new(false),
                callback: Mutex::new(None),
            }),
        }
    }
}

#[async_trait]
impl PlayerBackend for SimulatedBackend {
    fn is_available(&self) -> bool {
        self.api.available.load(Ordering::SeqCst)
    }

    fn request_load(&self) {
        if self.api.loading.swap(true, Ordering::SeqCst) {
            return;
        }
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            tokio::time::sleep(api.load_delay).await;
            api.available.store(true, Ordering::SeqCst);
            log::info!("[Simulated] Player API loaded");
            let callback = api.callback.lock().take();
            if let Some(callback) = callback {
                callback();
            }
        });
    }

    fn register_ready_callback(&self, callback: ReadyCallback) -> bool {
        let mut slot = self.api.callback.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(callback);
        true
    }

    async fn create(
        &self,
        options: PlayerOptions,
        events: PlayerEventSink,
    ) -> PlayerResult<Arc<dyn PlayerHandle>> {
        if !self.is_available() {
            return Err(PlayerError::NotReady);
        }
        log::debug!("[Simulated] Creating player for {}", options.source_id);

        let handle = Arc::new(SimulatedPlayer {
            state: Mutex::new(PlayerState::Unstarted),
            volume: AtomicU8::new(options.volume),
            // Autoplaying embeds start muted until told otherwise.
            muted: AtomicBool::new(options.autoplay),
            looping: AtomicBool::new(options.looping),
            destroyed: AtomicBool::new(false),
            events: events.clone(),
        });

        let ready_delay = self.api.ready_delay;
        tokio::spawn(async move {
            tokio::time::sleep(ready_delay).await;
            events.ready();
        });

        Ok(handle as Arc<dyn PlayerHandle>)
    }
}

pub struct SimulatedPlayer {
    state: Mutex<PlayerState>,
    volume: AtomicU8,
    muted: AtomicBool,
    looping: AtomicBool,
    destroyed: AtomicBool,
    events: PlayerEventSink,
}

impl SimulatedPlayer {
    fn transition(&self, state: PlayerState) -> PlayerResult<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(PlayerError::Destroyed);
        }
        let changed = {
            let mut current = self.state.lock();
            std::mem::replace(&mut *current, state) != state
        };
        if changed {
            self.events.state_changed(state);
        }
        Ok(())
    }

    fn ensure_live(&self) -> PlayerResult<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(PlayerError::Destroyed);
        }
        Ok(())
    }
}

#[async_trait]
impl PlayerHandle for SimulatedPlayer {
    async fn play(&self) -> PlayerResult<()> {
        self.transition(PlayerState::Playing)
    }

    async fn pause(&self) -> PlayerResult<()> {
        self.transition(PlayerState::Paused)
    }

    async fn stop(&self) -> PlayerResult<()> {
        self.ensure_live()?;
        *self.state.lock() = PlayerState::Unstarted;
        Ok(())
    }

    async fn set_volume(&self, volume: u8) -> PlayerResult<()> {
        self.ensure_live()?;
        self.volume.store(volume, Ordering::SeqCst);
        Ok(())
    }

    async fn is_muted(&self) -> PlayerResult<bool> {
        self.ensure_live()?;
        Ok(self.muted.load(Ordering::SeqCst))
    }

    async fn unmute(&self) -> PlayerResult<()> {
        self.ensure_live()?;
        self.muted.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn volume(&self) -> PlayerResult<u8> {
        self.ensure_live()?;
        Ok(self.volume.load(Ordering::SeqCst))
    }

    async fn set_loop(&self, enabled: bool) -> PlayerResult<()> {
        self.ensure_live()?;
        self.looping.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    async fn query_state(&self) -> PlayerResult<PlayerState> {
        self.ensure_live()?;
        Ok(*self.state.lock())
    }

    async fn destroy(&self) -> PlayerResult<()> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Err(PlayerError::Destroyed);
        }
        log::debug!(
            "[Simulated] Player destroyed (volume {}, muted {}, loop {})",
            self.volume.load(Ordering::SeqCst),
            self.muted.load(Ordering::SeqCst),
            self.looping.load(Ordering::SeqCst)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdrop_core::{bootstrap_session, Catalog, Config, MemoryStore, SessionPhase};

    #[tokio::test(start_paused = true)]
    async fn api_loads_after_delay_and_fires_callback() {
        let backend = SimulatedBackend::new(Duration::from_millis(500), Duration::ZERO);
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        assert!(backend.register_ready_callback(Box::new(move || flag.store(true, Ordering::SeqCst))));
        assert!(!backend.register_ready_callback(Box::new(|| {})));

        backend.request_load();
        backend.request_load();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!backend.is_available());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(backend.is_available());
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn autoplaying_player_starts_muted() {
        let backend = SimulatedBackend::new(Duration::ZERO, Duration::ZERO);
        backend.request_load();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let options = PlayerOptions {
            source_id: backdrop_core::SourceId::from_url("https://youtu.be/q76bMs-NwRk").unwrap(),
            autoplay: true,
            looping: true,
            volume: 40,
        };
        let player = backend.create(options, PlayerEventSink::new(1, tx)).await.unwrap();

        assert!(player.is_muted().await.unwrap());
        player.unmute().await.unwrap();
        assert!(!player.is_muted().await.unwrap());
        assert_eq!(player.volume().await.unwrap(), 40);
    }

    #[tokio::test(start_paused = true)]
    async fn session_reaches_playing_against_simulated_player() {
        let backend = SimulatedBackend::new(Duration::from_millis(750), Duration::from_millis(200));
        let session = bootstrap_session(
            &Config::default(),
            Catalog::builtin(),
            Arc::new(backend),
            MemoryStore::arc(),
        )
        .unwrap();

        session.manager.select_track_by_id("gentle-rain").await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        let view = session.manager.view();
        assert_eq!(view.phase, SessionPhase::ReadyPlaying);
        assert!(view.playing);
        assert_eq!(view.headline(), "🌧️ Gentle Rain");

        session.manager.toggle_playback().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(session.manager.phase(), SessionPhase::ReadyPaused);

        session.shutdown().await;
    }
}
