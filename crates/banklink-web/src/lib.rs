//! HTTP surface for BankLink.
//!
//! Maps the linking flow onto browser routes:
//!
//! | Route                         | Operation                  |
//! |-------------------------------|----------------------------|
//! | `GET /monzo/auth`             | begin linking              |
//! | `GET /monzo/redirect`         | complete linking           |
//! | `GET /monzo/choose-account`   | list accounts              |
//! | `GET /monzo/chosen/{id}`      | choose an account          |
//! | `GET /monzo/reset`            | reset the link             |
//! | `GET /monzo/reset-account`    | reset the account choice   |
//!
//! `GET /` reports progress as JSON and delivers the pending flash message.

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use config::{AppConfig, DEFAULT_CONFIG_PATH, ServerConfig};
pub use error::{Result, WebError};
pub use handlers::{HomeResponse, SESSION_COOKIE};
pub use server::WebServer;
pub use state::AppState;
