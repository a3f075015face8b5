//! OAuth client for BankLink.
//!
//! This crate talks to the bank's identity provider on behalf of the linking
//! flow:
//!
//! - **State nonces** from the system CSPRNG
//! - **Authorization URL** construction bound to a nonce
//! - **Authorization code exchange** for access and refresh tokens
//! - **Resource-owner lookup** via `/ping/whoami`
//!
//! The [`OAuthProvider`] trait is the seam the linking coordinator depends
//! on; [`OAuthFlow`] is the HTTP implementation.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use banklink_auth_engine::{OAuthConfig, OAuthFlow, OAuthProvider};
//!
//! # async fn example() -> banklink_auth_engine::error::Result<()> {
//! let config = OAuthConfig {
//!     client_id: "oauth2client_00009abc".to_string(),
//!     client_secret: Some("mnzconf.secret".to_string()),
//!     redirect_uri: "http://localhost:8000/monzo/redirect".to_string(),
//!     ..OAuthConfig::default()
//! };
//!
//! let flow = OAuthFlow::new(config)?;
//! let state = flow.generate_state()?;
//! let url = flow.authorization_url(&state)?;
//! println!("visit {url}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod oauth;

pub use error::{AuthEngineError, Result};
pub use oauth::{OAuthConfig, OAuthFlow, OAuthProvider, OAuthTokens, ResourceOwner};
