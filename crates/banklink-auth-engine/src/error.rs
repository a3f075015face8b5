//! Error types for the auth engine crate.
//!
//! [`AuthEngineError`] separates rejections the bank made on purpose
//! ([`IdentityProvider`](AuthEngineError::IdentityProvider)) from transport
//! and local failures, so callers can show the bank's own wording.

/// Failures while talking OAuth to the bank.
#[derive(Debug, thiserror::Error)]
pub enum AuthEngineError {
    /// No state nonce could be drawn from the system random source.
    #[error("state nonce unavailable: {reason}")]
    StateGeneration { reason: String },

    /// The bank refused the request: a used or expired code, a revoked
    /// client, or a whoami reporting `authenticated: false`.
    #[error("rejected by bank: {reason}")]
    IdentityProvider {
        /// The bank's `error_description`, `message` or `error`, in that
        /// order of preference.
        reason: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("request to bank failed: {0}")]
    Network(#[from] reqwest::Error),

    /// `OAuthConfig` is incomplete.
    #[error("oauth config: {reason}")]
    InvalidConfig { reason: String },

    /// One of the configured endpoint URLs is malformed.
    #[error("bad endpoint url: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, AuthEngineError>;
