//! Transient user-visible notices.
//!
//! At most one notice is visible. Posting replaces the current one; each
//! notice is cleared by id so an expiring timer never removes a newer notice.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::events::{EventEmitter, NoticeEvent};
use crate::utils::now_millis;

/// Identifies a posted notice.
pub type NoticeId = u64;

#[derive(Debug, Default)]
struct Slot {
    next_id: NoticeId,
    current: Option<(NoticeId, String)>,
}

pub struct NoticeBoard {
    slot: Mutex<Slot>,
    emitter: Arc<dyn EventEmitter>,
}

impl NoticeBoard {
    pub fn new(emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            emitter,
        }
    }

    /// Shows `message`, replacing any visible notice.
    pub fn post(&self, message: impl Into<String>) -> NoticeId {
        let message = message.into();
        let id = {
            let mut slot = self.slot.lock();
            slot.next_id += 1;
            let id = slot.next_id;
            slot.current = Some((id, message.clone()));
            id
        };
        log::info!("[Notice] {}", message);
        self.emitter.emit_notice(NoticeEvent::Posted {
            message,
            timestamp: now_millis(),
        });
        id
    }

    /// Clears the notice if `id` is still the visible one.
    pub fn clear_if_current(&self, id: NoticeId) -> bool {
        let cleared = {
            let mut slot = self.slot.lock();
            match slot.current {
                Some((current, _)) if current == id => {
                    slot.current = None;
                    true
                }
                _ => false,
            }
        };
        if cleared {
            self.emitter.emit_notice(NoticeEvent::Cleared {
                timestamp: now_millis(),
            });
        }
        cleared
    }

    /// Clears whatever is visible.
    pub fn clear(&self) {
        let had_notice = self.slot.lock().current.take().is_some();
        if had_notice {
            self.emitter.emit_notice(NoticeEvent::Cleared {
                timestamp: now_millis(),
            });
        }
    }

    pub fn current(&self) -> Option<String> {
        self.slot.lock().current.as_ref().map(|(_, m)| m.clone())
    }
}
