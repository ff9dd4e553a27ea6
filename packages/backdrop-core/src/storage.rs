//! Durable key-value persistence for session state.
//!
//! The session is stored under a single key as JSON:
//!
//! ```json
//! {"currentTrackId": "gentle-rain", "isPlaying": true, "volume": 50}
//! ```
//!
//! Loading never fails the caller: unreadable or corrupt content falls back
//! to defaults with a warning, mirroring how the widget treats storage.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Catalog;
use crate::state::SessionState;
use crate::utils::clamp_volume;

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Content could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Minimal string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// In-memory store for tests and sessions without a data directory.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<dyn KeyValueStore> {
        Arc::new(Self::new())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// File-backed store: one `<key>.json` file per key inside a data directory.
///
/// Writes go to a temporary sibling first and are renamed into place so a
/// crash never leaves a half-written file.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates the store, creating `dir` if needed.
    pub fn new(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// On-disk layout of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub current_track_id: Option<String>,
    #[serde(default)]
    pub is_playing: bool,
    pub volume: i64,
}

impl From<&SessionState> for PersistedSession {
    fn from(state: &SessionState) -> Self {
        Self {
            current_track_id: state.current_track_id().map(str::to_string),
            is_playing: state.is_playing,
            volume: i64::from(state.volume),
        }
    }
}

/// Loads and saves [`SessionState`] through a [`KeyValueStore`].
pub struct SessionPersistence {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl SessionPersistence {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Reads the persisted session, resolving the track against `catalog`.
    ///
    /// Returns defaults when nothing is stored or the content is unusable.
    /// A track id missing from the catalog yields no track and no intent.
    pub fn load(&self, catalog: &Catalog, default_volume: u8) -> SessionState {
        let mut state = SessionState::new(default_volume);

        let stored = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return state,
            Err(e) => {
                log::warn!("[Storage] Failed to read session state: {}", e);
                return state;
            }
        };

        let persisted: PersistedSession = match serde_json::from_str(&stored) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("[Storage] Ignoring corrupt session state: {}", e);
                return state;
            }
        };

        state.volume = clamp_volume(persisted.volume);
        state.current_track = persisted.current_track_id.as_deref().and_then(|id| {
            let track = catalog.find(id).cloned();
            if track.is_none() {
                log::warn!("[Storage] Persisted track {} is not in the catalog", id);
            }
            track
        });
        state.is_playing = persisted.is_playing;
        state.normalize();
        state
    }

    /// Writes the session.
    pub fn save(&self, state: &SessionState) -> StorageResult<()> {
        let json = serde_json::to_string(&PersistedSession::from(state))?;
        self.store.set(&self.key, &json)
    }

    /// Raw stored content, for diagnostics and tests.
    pub fn raw(&self) -> StorageResult<Option<String>> {
        self.store.get(&self.key)
    }
}
