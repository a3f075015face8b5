//! Shared application state for the web server.
//!
//! [`AppState`] is wrapped in an `Arc` and shared across all request
//! handlers. It holds the coordinator, the per-user link sessions, and the
//! one-shot flash message waiting for each user's next home page view.

use banklink_link::{Flash, LinkCoordinator, LinkSessionStore};
use dashmap::DashMap;

/// Shared state accessible from every Axum handler.
pub struct AppState {
    /// Drives the linking flow.
    pub coordinator: LinkCoordinator,

    /// One link session per browser, keyed by session cookie.
    pub sessions: LinkSessionStore,

    /// Pending flash message per browser.
    flashes: DashMap<String, Flash>,
}

impl AppState {
    pub fn new(coordinator: LinkCoordinator) -> Self {
        Self {
            coordinator,
            sessions: LinkSessionStore::new(),
            flashes: DashMap::new(),
        }
    }

    /// Queue `flash` for the user's next page view, replacing any older one.
    pub fn set_flash(&self, user: &str, flash: Flash) {
        self.flashes.insert(user.to_string(), flash);
    }

    /// Take the pending flash, if any.
    pub fn take_flash(&self, user: &str) -> Option<Flash> {
        self.flashes.remove(user).map(|(_, flash)| flash)
    }
}
