//! Account linking for BankLink.
//!
//! Links a user's bank account through the OAuth 2.0 authorization code
//! flow, then settles which of the user's accounts is used downstream.
//!
//! # Architecture
//!
//! ```text
//! LinkCoordinator
//! ├── OAuthProvider     (state nonce, authorization URL, code exchange, whoami)
//! ├── AccountsProvider  (account listing)
//! └── LinkSession       (per-user progress, passed into every operation)
//! ```
//!
//! The coordinator performs no host I/O: each operation returns a
//! [`LinkOutcome`] that the host turns into a redirect, a rendered account
//! list, or an error page. [`LinkSessionStore`] is an in-memory store a host
//! can use to keep one session per user.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod outcome;
pub mod session;
pub mod store;

pub use config::LinkConfig;
pub use coordinator::LinkCoordinator;
pub use error::{LinkError, RecoveryTarget, Result};
pub use outcome::{Flash, FlashLevel, LinkOutcome};
pub use session::{ChosenAccount, LinkSession, LinkState, TokenGrant};
pub use store::{LinkSessionStore, SessionHandle};

pub use banklink_adapters::Account;
pub use banklink_auth_engine::ResourceOwner;
