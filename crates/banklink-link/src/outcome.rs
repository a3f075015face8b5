//! Results of coordinator operations.
//!
//! The coordinator never performs host I/O; it returns a [`LinkOutcome`] and
//! the host decides how to express it (HTTP redirect, rendered list, ...).

use banklink_adapters::Account;
use serde::{Deserialize, Serialize};

use crate::error::LinkError;

/// Severity of a one-shot user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Warning,
}

/// A one-shot message for the user's next page view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Warning,
            message: message.into(),
        }
    }
}

/// What the host should do after a coordinator operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Send the user to `target`, optionally with a message.
    Redirect {
        target: String,
        flash: Option<Flash>,
    },
    /// Show the listed accounts so the user can pick one.
    PresentAccounts { accounts: Vec<Account> },
    /// The operation failed and was recovered; send the user to `target`.
    Failed {
        error: LinkError,
        target: String,
        flash: Flash,
    },
}

impl LinkOutcome {
    pub(crate) fn redirect(target: impl Into<String>) -> Self {
        Self::Redirect {
            target: target.into(),
            flash: None,
        }
    }

    /// The recovered error, if this outcome is a failure.
    pub fn error(&self) -> Option<&LinkError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// The redirect target, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Redirect { target, .. } | Self::Failed { target, .. } => Some(target),
            Self::PresentAccounts { .. } => None,
        }
    }

    pub fn flash(&self) -> Option<&Flash> {
        match self {
            Self::Redirect { flash, .. } => flash.as_ref(),
            Self::Failed { flash, .. } => Some(flash),
            Self::PresentAccounts { .. } => None,
        }
    }
}
