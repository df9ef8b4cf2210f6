//! Notification menu: a pure reducer plus the async driver that feeds it
//! from the open-menu fetch, the unread-count poll and the push stream.

mod state;
mod sync;

pub use state::NotificationState;
pub use sync::{NotificationSync, SyncOptions, MIN_POLL_INTERVAL};
