//! Accounts API adapter.
//!
//! Lists the accounts a user holds at the bank so the linking flow can pick
//! one.  The [`AccountsProvider`] trait is the seam the coordinator depends
//! on; [`AccountsClient`] implements it over the Monzo REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AdapterError, Result};

/// Default Monzo API base URL.
const DEFAULT_BASE_URL: &str = "https://api.monzo.com";

/// Default per-request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Configuration for the accounts API client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Base URL of the bank API.
    pub api_base_url: String,
    /// Timeout applied to every request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// A bank account as returned by the accounts API.
///
/// The API returns more fields (`created`, `type`, ...); only the ones the
/// linking flow needs are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Opaque account identifier, e.g. `acc_00009237aqC8c5umZmrRdh`.
    pub id: String,
    /// Human-readable account description.
    pub description: String,
}

/// Envelope of `GET /accounts`.
#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Vec<Account>,
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Source of the accounts belonging to an access token's owner.
#[async_trait]
pub trait AccountsProvider: Send + Sync {
    /// List the owner's accounts, in the order the bank returns them.
    async fn list_accounts(&self, access_token: &str) -> Result<Vec<Account>>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Accounts API client over HTTP.
pub struct AccountsClient {
    base_url: String,
    client: reqwest::Client,
}

impl AccountsClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Network`] if the HTTP client cannot be built.
    pub fn new(config: &AccountsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("banklink/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// The API base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AccountsProvider for AccountsClient {
    async fn list_accounts(&self, access_token: &str) -> Result<Vec<Account>> {
        if access_token.is_empty() {
            return Err(AdapterError::AuthRequired("empty access token".to_string()));
        }

        let url = format!("{}/accounts", self.base_url);
        debug!(url = %url, "listing accounts");

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AdapterError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: AccountsResponse = serde_json::from_str(&body)?;
        debug!(count = parsed.accounts.len(), "accounts listed");
        Ok(parsed.accounts)
    }
}
