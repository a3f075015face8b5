//! Per-user record of linking progress.
//!
//! A [`LinkSession`] is created empty when a user starts linking and filled
//! in step by step by the coordinator. Its fields are private: the only
//! mutations are the ones the state machine performs, which keeps the
//! invariants below in one place.
//!
//! - Token material and owner identity live in a single [`TokenGrant`], so
//!   they are always set together.
//! - A successful exchange replaces the whole record, which consumes the
//!   pending state nonce.
//! - `chosen_account` is only ever copied from `available_accounts`.

use std::fmt;

use banklink_adapters::Account;
use banklink_auth_engine::ResourceOwner;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// Tokens and the identity they belong to, stored as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    /// Bearer token for the bank API.
    pub access_token: String,
    /// Refresh token, if the provider issued one.
    pub refresh_token: Option<String>,
    /// When `access_token` stops being valid.
    pub expires_at: Option<DateTime<Utc>>,
    /// Who the token was issued for.
    pub owner: ResourceOwner,
}

impl TokenGrant {
    /// Whether the access token had expired at `now`.
    ///
    /// A grant without a known expiry counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at < now)
    }
}

/// The account selected for downstream use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenAccount {
    /// Account identifier.
    pub id: String,
    /// Display name, taken from the account description.
    pub name: String,
}

impl From<&Account> for ChosenAccount {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: account.description.clone(),
        }
    }
}

/// Where a session is in the linking flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkState {
    /// Nothing has happened yet, or the link was reset.
    Unlinked,
    /// A state nonce was issued; waiting for the provider's redirect.
    AwaitingCallback,
    /// Tokens are stored; accounts have not been listed.
    AwaitingAccountListing,
    /// Several accounts were listed; waiting for the user to pick one.
    AwaitingChoice,
    /// An account is chosen.
    Linked,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlinked => write!(f, "unlinked"),
            Self::AwaitingCallback => write!(f, "awaiting-callback"),
            Self::AwaitingAccountListing => write!(f, "awaiting-account-listing"),
            Self::AwaitingChoice => write!(f, "awaiting-choice"),
            Self::Linked => write!(f, "linked"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  LinkSession
// ═══════════════════════════════════════════════════════════════════════

/// Server-held linking progress for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSession {
    pending_state: Option<String>,
    grant: Option<TokenGrant>,
    available_accounts: Option<Vec<Account>>,
    chosen_account: Option<ChosenAccount>,
}

impl LinkSession {
    /// An empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current position in the flow, derived from which fields are set.
    pub fn state(&self) -> LinkState {
        if self.chosen_account.is_some() {
            LinkState::Linked
        } else if self.available_accounts.is_some() {
            LinkState::AwaitingChoice
        } else if self.grant.is_some() {
            LinkState::AwaitingAccountListing
        } else if self.pending_state.is_some() {
            LinkState::AwaitingCallback
        } else {
            LinkState::Unlinked
        }
    }

    /// Whether nothing at all is stored.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn pending_state(&self) -> Option<&str> {
        self.pending_state.as_deref()
    }

    pub fn grant(&self) -> Option<&TokenGrant> {
        self.grant.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.grant.as_ref().map(|g| g.access_token.as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.grant.as_ref().and_then(|g| g.refresh_token.as_deref())
    }

    pub fn token_expiry(&self) -> Option<DateTime<Utc>> {
        self.grant.as_ref().and_then(|g| g.expires_at)
    }

    pub fn owner_identity(&self) -> Option<&ResourceOwner> {
        self.grant.as_ref().map(|g| &g.owner)
    }

    pub fn available_accounts(&self) -> Option<&[Account]> {
        self.available_accounts.as_deref()
    }

    pub fn chosen_account(&self) -> Option<&ChosenAccount> {
        self.chosen_account.as_ref()
    }

    /// Look up a listed account by exact id.
    pub fn find_account(&self, account_id: &str) -> Option<&Account> {
        self.available_accounts
            .as_deref()?
            .iter()
            .find(|account| account.id == account_id)
    }

    /// Clear everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Clear only the chosen account; listed accounts are kept.
    pub fn reset_account_choice(&mut self) {
        self.chosen_account = None;
    }

    // -- Transitions used by the coordinator --------------------------------

    /// Start over with a freshly issued nonce.
    pub(crate) fn begin(&mut self, state: String) {
        *self = Self {
            pending_state: Some(state),
            ..Self::default()
        };
    }

    /// Replace the record with a fresh grant, consuming the pending nonce.
    pub(crate) fn store_grant(&mut self, grant: TokenGrant) {
        *self = Self {
            grant: Some(grant),
            ..Self::default()
        };
    }

    /// Record a new account listing. A previous choice survives only if the
    /// chosen id is still listed.
    pub(crate) fn store_accounts(&mut self, accounts: Vec<Account>) {
        if let Some(chosen) = &self.chosen_account
            && !accounts.iter().any(|account| account.id == chosen.id)
        {
            self.chosen_account = None;
        }
        self.available_accounts = Some(accounts);
    }

    /// Choose a listed account. Returns `false` (and changes nothing) when
    /// the id is not listed.
    pub(crate) fn choose(&mut self, account_id: &str) -> bool {
        match self.find_account(account_id).map(ChosenAccount::from) {
            Some(chosen) => {
                self.chosen_account = Some(chosen);
                true
            }
            None => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
