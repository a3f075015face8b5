//! Coordinator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RecoveryTarget;

/// Paths and limits the coordinator uses when building outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// The application's home surface.
    pub home_path: String,
    /// Entry point that resets the whole link.
    pub reset_path: String,
    /// Entry point that lists accounts for the user to choose from.
    pub choose_account_path: String,
    /// Require the callback `state` to equal the nonce issued by
    /// `begin_link`. When `false`, only its presence is checked.
    pub verify_state: bool,
    /// Upper bound on each collaborator network call, in seconds.
    pub call_timeout_secs: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            home_path: "/".to_string(),
            reset_path: "/monzo/reset".to_string(),
            choose_account_path: "/monzo/choose-account".to_string(),
            verify_state: true,
            call_timeout_secs: 10,
        }
    }
}

impl LinkConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Resolve a recovery target to a path.
    pub fn path_for(&self, target: RecoveryTarget) -> &str {
        match target {
            RecoveryTarget::Reset => &self.reset_path,
            RecoveryTarget::Home => &self.home_path,
        }
    }
}
