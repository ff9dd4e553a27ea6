//! Session services.
//!
//! The session manager orchestrates the player, persistence and observers;
//! notices and reflection are small supporting services it owns.

pub mod notice;
pub mod reflect;
pub mod session_manager;

pub use notice::{NoticeBoard, NoticeId};
pub use reflect::{start_ticker, ObserverId, ObserverRegistry, ReflectError, Reflector};
pub use session_manager::SessionManager;
