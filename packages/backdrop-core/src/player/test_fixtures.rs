//! Scriptable player backend shared by test modules.
//!
//! Nothing happens on its own: tests decide when the API loads and which
//! notifications each instance reports.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::traits::{PlayerBackend, PlayerEventSink, PlayerHandle, ReadyCallback};
use super::types::{PlayerError, PlayerOptions, PlayerResult, PlayerState};

/// A command received by a [`MockHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    SetVolume(u8),
    Unmute,
    SetLoop(bool),
    Destroy,
}

pub struct MockHandle {
    pub options: PlayerOptions,
    sink: PlayerEventSink,
    state: Mutex<PlayerState>,
    /// State adopted (silently) when `play` is called.
    play_response: Mutex<Option<PlayerState>>,
    fail_play: AtomicBool,
    fail_volume: AtomicBool,
    muted: AtomicBool,
    volume: AtomicU8,
    destroyed: AtomicBool,
    commands: Mutex<Vec<Command>>,
}

impl MockHandle {
    fn new(options: PlayerOptions, sink: PlayerEventSink, play_response: Option<PlayerState>) -> Self {
        Self {
            sink,
            state: Mutex::new(PlayerState::Unstarted),
            play_response: Mutex::new(play_response),
            fail_play: AtomicBool::new(false),
            fail_volume: AtomicBool::new(false),
            muted: AtomicBool::new(false),
            volume: AtomicU8::new(options.volume),
            destroyed: AtomicBool::new(false),
            commands: Mutex::new(Vec::new()),
            options,
        }
    }

    pub fn binding(&self) -> u64 {
        self.sink.binding()
    }

    pub fn source_id(&self) -> &str {
        self.options.source_id.as_str()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().clone()
    }

    pub fn count(&self, command: Command) -> usize {
        self.commands.lock().iter().filter(|c| **c == command).count()
    }

    pub fn set_state(&self, state: PlayerState) {
        *self.state.lock() = state;
    }

    pub fn set_play_response(&self, state: Option<PlayerState>) {
        *self.play_response.lock() = state;
    }

    pub fn fail_play(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }

    pub fn fail_volume(&self, fail: bool) {
        self.fail_volume.store(fail, Ordering::SeqCst);
    }

    /// Mutes the instance behind the session's back.
    pub fn mute(&self) {
        self.muted.store(true, Ordering::SeqCst);
    }

    pub fn muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Changes the output volume without recording a command.
    pub fn set_output_volume(&self, volume: u8) {
        self.volume.store(volume, Ordering::SeqCst);
    }

    pub fn output_volume(&self) -> u8 {
        self.volume.load(Ordering::SeqCst)
    }

    /// Reports `Ready` to the session.
    pub fn emit_ready(&self) {
        self.sink.ready();
    }

    /// Adopts `state` and notifies the session.
    pub fn report(&self, state: PlayerState) {
        self.set_state(state);
        self.sink.state_changed(state);
    }

    pub fn report_error(&self, code: i32) {
        self.sink.error(code);
    }

    fn record(&self, command: Command) -> PlayerResult<()> {
        if self.is_destroyed() {
            return Err(PlayerError::Destroyed);
        }
        self.commands.lock().push(command);
        Ok(())
    }
}

#[async_trait]
impl PlayerHandle for MockHandle {
    async fn play(&self) -> PlayerResult<()> {
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(PlayerError::Backend("play rejected".into()));
        }
        self.record(Command::Play)?;
        if let Some(state) = *self.play_response.lock() {
            self.set_state(state);
        }
        Ok(())
    }

    async fn pause(&self) -> PlayerResult<()> {
        self.record(Command::Pause)?;
        self.set_state(PlayerState::Paused);
        Ok(())
    }

    async fn stop(&self) -> PlayerResult<()> {
        self.record(Command::Stop)?;
        self.set_state(PlayerState::Unstarted);
        Ok(())
    }

    async fn set_volume(&self, volume: u8) -> PlayerResult<()> {
        if self.fail_volume.load(Ordering::SeqCst) {
            return Err(PlayerError::Backend("volume rejected".into()));
        }
        self.record(Command::SetVolume(volume))?;
        self.volume.store(volume, Ordering::SeqCst);
        Ok(())
    }

    async fn is_muted(&self) -> PlayerResult<bool> {
        if self.is_destroyed() {
            return Err(PlayerError::Destroyed);
        }
        Ok(self.muted())
    }

    async fn unmute(&self) -> PlayerResult<()> {
        self.record(Command::Unmute)?;
        self.muted.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn volume(&self) -> PlayerResult<u8> {
        if self.is_destroyed() {
            return Err(PlayerError::Destroyed);
        }
        Ok(self.output_volume())
    }

    async fn set_loop(&self, enabled: bool) -> PlayerResult<()> {
        self.record(Command::SetLoop(enabled))
    }

    async fn query_state(&self) -> PlayerResult<PlayerState> {
        if self.is_destroyed() {
            return Err(PlayerError::Destroyed);
        }
        Ok(*self.state.lock())
    }

    async fn destroy(&self) -> PlayerResult<()> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Err(PlayerError::Destroyed);
        }
        self.commands.lock().push(Command::Destroy);
        Ok(())
    }
}

#[derive(Default)]
struct BackendInner {
    available: AtomicBool,
    slot_claimed: AtomicBool,
    callback: Mutex<Option<ReadyCallback>>,
    load_requests: AtomicUsize,
    callback_registrations: AtomicUsize,
    create_failures: Mutex<Vec<PlayerError>>,
    play_response: Mutex<Option<PlayerState>>,
    handles: Mutex<Vec<Arc<MockHandle>>>,
}

/// Scriptable [`PlayerBackend`].
#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<BackendInner>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose API is already loaded.
    pub fn loaded() -> Self {
        let backend = Self::new();
        backend.set_available(true);
        backend
    }

    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Simulates the API script finishing: marks it available and fires the
    /// ready callback if we own it.
    pub fn load_api(&self) {
        self.set_available(true);
        let callback = self.inner.callback.lock().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Simulates another page script owning the global ready callback.
    pub fn claim_callback_slot(&self) {
        self.inner.slot_claimed.store(true, Ordering::SeqCst);
    }

    pub fn load_requests(&self) -> usize {
        self.inner.load_requests.load(Ordering::SeqCst)
    }

    pub fn callback_registrations(&self) -> usize {
        self.inner.callback_registrations.load(Ordering::SeqCst)
    }

    /// Queues an error for the next `create` call.
    pub fn fail_next_create(&self, error: PlayerError) {
        self.inner.create_failures.lock().push(error);
    }

    /// State every new instance silently adopts when told to play.
    pub fn set_play_response(&self, state: Option<PlayerState>) {
        *self.inner.play_response.lock() = state;
    }

    pub fn handles(&self) -> Vec<Arc<MockHandle>> {
        self.inner.handles.lock().clone()
    }

    pub fn live_handles(&self) -> Vec<Arc<MockHandle>> {
        self.handles()
            .into_iter()
            .filter(|h| !h.is_destroyed())
            .collect()
    }

    pub fn last_handle(&self) -> Option<Arc<MockHandle>> {
        self.inner.handles.lock().last().cloned()
    }

    pub fn created(&self) -> usize {
        self.inner.handles.lock().len()
    }
}

#[async_trait]
impl PlayerBackend for MockBackend {
    fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::SeqCst)
    }

    fn request_load(&self) {
        self.inner.load_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn register_ready_callback(&self, callback: ReadyCallback) -> bool {
        self.inner
            .callback_registrations
            .fetch_add(1, Ordering::SeqCst);
        if self.inner.slot_claimed.load(Ordering::SeqCst) {
            return false;
        }
        *self.inner.callback.lock() = Some(callback);
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
        let failure = {
            let mut failures = self.inner.create_failures.lock();
            (!failures.is_empty()).then(|| failures.remove(0))
        };
        if let Some(error) = failure {
            return Err(error);
        }
        let play_response = *self.inner.play_response.lock();
        let handle = Arc::new(MockHandle::new(options, events, play_response));
        self.inner.handles.lock().push(Arc::clone(&handle));
        Ok(handle as Arc<dyn PlayerHandle>)
    }
}
