//! Bank API adapters for BankLink.
//!
//! Currently a single adapter: [`accounts`], which lists the accounts behind
//! an access token.

pub mod accounts;
pub mod error;

pub use accounts::{Account, AccountsClient, AccountsConfig, AccountsProvider};
pub use error::{AdapterError, Result};
