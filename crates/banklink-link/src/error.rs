//! Error kinds of the linking flow.
//!
//! Every kind except the fatal ones is recovered inside the coordinator and
//! turned into a [`LinkOutcome::Failed`](crate::outcome::LinkOutcome::Failed)
//! carrying a redirect target and a user-facing message. Only
//! [`LinkError::is_fatal`] kinds escape as `Err`.

use serde::{Deserialize, Serialize};

/// Where the user is sent after a recovered failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryTarget {
    /// The dedicated reset entry point, which clears the whole link.
    Reset,
    /// The application's home surface.
    Home,
}

/// Errors produced by [`LinkCoordinator`](crate::coordinator::LinkCoordinator).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// The callback carried no (or an empty) `state` parameter.
    #[error("callback is missing the state parameter")]
    MissingState,

    /// The callback carried no (or an empty) authorization code.
    #[error("callback is missing the authorization code")]
    MissingCode,

    /// The callback `state` differs from the nonce issued by `begin_link`.
    #[error("callback state does not match the pending state")]
    StateMismatch,

    /// The identity provider rejected the code, or the exchange failed.
    #[error("code exchange failed: {message}")]
    ExchangeFailed { message: String },

    /// The stored access token is missing or past its expiry.
    #[error("access token has expired")]
    TokenExpired,

    /// The accounts API call failed.
    #[error("failed to fetch accounts: {message}")]
    AccountFetchFailed { message: String },

    /// The accounts API succeeded but returned no accounts.
    #[error("no accounts were returned")]
    NoAccountsFound,

    /// `choose_account` was called before any accounts were listed.
    #[error("no accounts are pending a choice")]
    NoAccountsPending,

    /// The chosen id is not among the listed accounts.
    #[error("account {account_id} is not one of the available accounts")]
    InvalidAccountChoice { account_id: String },

    /// The OAuth collaborator could not produce a state nonce.
    #[error("failed to generate state nonce: {message}")]
    NonceGenerationFailed { message: String },

    /// The OAuth collaborator could not build the authorization URL.
    #[error("failed to build authorization url: {message}")]
    AuthorizationUrlFailed { message: String },
}

impl LinkError {
    /// Fatal errors are not recovered; they propagate to the host.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NonceGenerationFailed { .. } | Self::AuthorizationUrlFailed { .. }
        )
    }

    /// Whether recovering from this error clears the whole session.
    pub fn resets_session(&self) -> bool {
        matches!(
            self,
            Self::MissingState | Self::MissingCode | Self::StateMismatch | Self::ExchangeFailed { .. }
        )
    }

    /// Where the user goes next.
    ///
    /// Account fetch failures go home rather than to the reset surface,
    /// unlike every other failure.
    pub fn recovery_target(&self) -> RecoveryTarget {
        match self {
            Self::AccountFetchFailed { .. }
            | Self::NoAccountsFound
            | Self::InvalidAccountChoice { .. } => RecoveryTarget::Home,
            _ => RecoveryTarget::Reset,
        }
    }

    /// The message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingState | Self::MissingCode | Self::StateMismatch => {
                "Something went wrong with your state, please try again.".to_string()
            }
            Self::ExchangeFailed { message } => {
                format!("Something went horrible wrong linking Monzo, please try again - {message}")
            }
            Self::TokenExpired => "Access token is invalid, cannot choose account".to_string(),
            Self::AccountFetchFailed { .. } | Self::NoAccountsFound => {
                "Failed to retrieve accounts, please try again".to_string()
            }
            Self::NoAccountsPending => {
                "You aren't ready to choose a Monzo account, please try again".to_string()
            }
            Self::InvalidAccountChoice { .. } => {
                "Invalid Monzo account chosen, please try again".to_string()
            }
            Self::NonceGenerationFailed { .. } | Self::AuthorizationUrlFailed { .. } => {
                "Unable to start linking Monzo right now".to_string()
            }
        }
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_nonce_and_url_failures_are_fatal() {
        assert!(
            LinkError::NonceGenerationFailed {
                message: "rng".into()
            }
            .is_fatal()
        );
        assert!(
            LinkError::AuthorizationUrlFailed {
                message: "url".into()
            }
            .is_fatal()
        );
        assert!(!LinkError::MissingState.is_fatal());
        assert!(!LinkError::TokenExpired.is_fatal());
    }

    #[test]
    fn callback_failures_reset_the_session() {
        assert!(LinkError::MissingState.resets_session());
        assert!(LinkError::MissingCode.resets_session());
        assert!(LinkError::StateMismatch.resets_session());
        assert!(
            LinkError::ExchangeFailed {
                message: "x".into()
            }
            .resets_session()
        );
    }

    #[test]
    fn listing_and_choice_failures_keep_the_session() {
        assert!(!LinkError::TokenExpired.resets_session());
        assert!(
            !LinkError::AccountFetchFailed {
                message: "x".into()
            }
            .resets_session()
        );
        assert!(!LinkError::NoAccountsFound.resets_session());
        assert!(!LinkError::NoAccountsPending.resets_session());
        assert!(
            !LinkError::InvalidAccountChoice {
                account_id: "zz".into()
            }
            .resets_session()
        );
    }

    #[test]
    fn account_fetch_failure_goes_home() {
        let err = LinkError::AccountFetchFailed {
            message: "x".into(),
        };
        assert_eq!(err.recovery_target(), RecoveryTarget::Home);
        assert_eq!(LinkError::TokenExpired.recovery_target(), RecoveryTarget::Reset);
        assert_eq!(
            LinkError::NoAccountsPending.recovery_target(),
            RecoveryTarget::Reset
        );
    }

    #[test]
    fn exchange_message_includes_provider_reason() {
        let err = LinkError::ExchangeFailed {
            message: "Authorization code has been used".into(),
        };
        assert_eq!(
            err.user_message(),
            "Something went horrible wrong linking Monzo, please try again - Authorization code has been used"
        );
    }

    #[test]
    fn error_display() {
        let err = LinkError::InvalidAccountChoice {
            account_id: "zz".into(),
        };
        assert_eq!(
            err.to_string(),
            "account zz is not one of the available accounts"
        );
    }
}
