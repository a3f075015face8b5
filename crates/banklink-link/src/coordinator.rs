//! The linking state machine.
//!
//! [`LinkCoordinator`] drives one user through
//!
//! ```text
//!  [unlinked] --begin_link--> [awaiting-callback]
//!  [awaiting-callback] --complete_link(ok)--> [awaiting-account-listing]
//!  [awaiting-callback] --complete_link(fail)--> [unlinked]
//!  [awaiting-account-listing] --list_accounts(1)--> [linked]
//!  [awaiting-account-listing] --list_accounts(N)--> [awaiting-choice]
//!  [awaiting-choice] --choose_account(valid)--> [linked]
//!  [awaiting-choice] --choose_account(invalid)--> [awaiting-choice]
//!  [linked] --reset_account_choice--> [awaiting-choice]
//!  [any] --reset_link--> [unlinked]
//! ```
//!
//! Each operation takes the user's [`LinkSession`] explicitly and returns a
//! [`LinkOutcome`]. Recoverable failures come back as
//! [`LinkOutcome::Failed`]; only fatal errors are returned as `Err`.

use std::future::Future;
use std::sync::Arc;

use banklink_adapters::AccountsProvider;
use banklink_auth_engine::{AuthEngineError, OAuthProvider};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::outcome::{Flash, LinkOutcome};
use crate::session::{LinkSession, TokenGrant};

/// Shown after the user picks an account.
const ACCOUNT_CHOSEN_MESSAGE: &str = "Monzo account successfully chosen, YNAB now?";

/// Drives the OAuth linking and account selection flow.
///
/// Cheap to share: the collaborators are behind `Arc`s and the coordinator
/// itself holds no per-user state.
#[derive(Clone)]
pub struct LinkCoordinator {
    oauth: Arc<dyn OAuthProvider>,
    accounts: Arc<dyn AccountsProvider>,
    config: LinkConfig,
}

impl LinkCoordinator {
    /// Create a coordinator over the given collaborators.
    pub fn new(
        oauth: Arc<dyn OAuthProvider>,
        accounts: Arc<dyn AccountsProvider>,
        config: LinkConfig,
    ) -> Self {
        Self {
            oauth,
            accounts,
            config,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Start linking: issue a state nonce and point the user at the
    /// provider's authorization page.
    ///
    /// Any prior progress in `session` is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::NonceGenerationFailed`] if no nonce could be
    /// generated and [`LinkError::AuthorizationUrlFailed`] if the URL could
    /// not be built. The session is left untouched in both cases.
    pub fn begin_link(&self, session: &mut LinkSession) -> Result<LinkOutcome> {
        let state =
            self.oauth
                .generate_state()
                .map_err(|e| LinkError::NonceGenerationFailed {
                    message: e.to_string(),
                })?;

        let url = self.oauth.authorization_url(&state).map_err(|e| {
            LinkError::AuthorizationUrlFailed {
                message: e.to_string(),
            }
        })?;

        session.begin(state);
        info!("link started, redirecting to authorization server");
        Ok(LinkOutcome::redirect(url))
    }

    /// Finish the authorization step with the `state` and `code` the
    /// provider redirected back with.
    ///
    /// On success the tokens and owner identity are stored together and the
    /// user is sent to the account choice entry point. Any failure resets
    /// the session.
    ///
    /// # Errors
    ///
    /// None in practice: every failure here is recoverable.
    pub async fn complete_link(
        &self,
        session: &mut LinkSession,
        returned_state: Option<&str>,
        code: Option<&str>,
    ) -> Result<LinkOutcome> {
        match self.try_complete_link(session, returned_state, code).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => self.recover(session, error),
        }
    }

    async fn try_complete_link(
        &self,
        session: &mut LinkSession,
        returned_state: Option<&str>,
        code: Option<&str>,
    ) -> Result<LinkOutcome> {
        let returned_state = returned_state
            .filter(|s| !s.is_empty())
            .ok_or(LinkError::MissingState)?;
        let code = code
            .filter(|c| !c.is_empty())
            .ok_or(LinkError::MissingCode)?;

        if self.config.verify_state && session.pending_state() != Some(returned_state) {
            return Err(LinkError::StateMismatch);
        }

        debug!("callback parameters accepted, exchanging code");

        let tokens = self
            .bounded(self.oauth.exchange_code(code))
            .await
            .map_err(|message| LinkError::ExchangeFailed { message })?;

        let owner = self
            .bounded(self.oauth.fetch_owner_identity(&tokens.access_token))
            .await
            .map_err(|message| LinkError::ExchangeFailed { message })?;

        info!(user_id = %owner.user_id, "authorization code exchanged");

        session.store_grant(TokenGrant {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens.expires_at,
            owner,
        });

        Ok(LinkOutcome::redirect(&self.config.choose_account_path))
    }

    /// List the user's accounts, auto-selecting when there is exactly one.
    ///
    /// # Errors
    ///
    /// None in practice: every failure here is recoverable.
    pub async fn list_accounts(&self, session: &mut LinkSession) -> Result<LinkOutcome> {
        self.list_accounts_at(session, Utc::now()).await
    }

    /// [`list_accounts`](Self::list_accounts) with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// None in practice: every failure here is recoverable.
    pub async fn list_accounts_at(
        &self,
        session: &mut LinkSession,
        now: DateTime<Utc>,
    ) -> Result<LinkOutcome> {
        match self.try_list_accounts(session, now).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => self.recover(session, error),
        }
    }

    async fn try_list_accounts(
        &self,
        session: &mut LinkSession,
        now: DateTime<Utc>,
    ) -> Result<LinkOutcome> {
        let grant = session.grant().ok_or(LinkError::TokenExpired)?;
        if grant.is_expired_at(now) {
            return Err(LinkError::TokenExpired);
        }
        let access_token = grant.access_token.clone();

        let accounts = self
            .bounded(self.accounts.list_accounts(&access_token))
            .await
            .map_err(|message| LinkError::AccountFetchFailed { message })?;

        if accounts.is_empty() {
            return Err(LinkError::NoAccountsFound);
        }

        session.store_accounts(accounts.clone());

        if let [only] = accounts.as_slice() {
            session.choose(&only.id);
            info!(account_id = %only.id, "single account, chosen automatically");
            return Ok(LinkOutcome::redirect(&self.config.home_path));
        }

        debug!(count = accounts.len(), "presenting accounts for choice");
        Ok(LinkOutcome::PresentAccounts { accounts })
    }

    /// Choose one of the listed accounts.
    ///
    /// An unknown id leaves the session untouched.
    pub fn choose_account(&self, session: &mut LinkSession, account_id: &str) -> LinkOutcome {
        let has_accounts = session
            .available_accounts()
            .is_some_and(|accounts| !accounts.is_empty());
        if !has_accounts {
            return self.recovered(session, LinkError::NoAccountsPending);
        }

        if !session.choose(account_id) {
            let error = LinkError::InvalidAccountChoice {
                account_id: account_id.to_string(),
            };
            return self.recovered(session, error);
        }

        info!(account_id = %account_id, "account chosen");
        LinkOutcome::Redirect {
            target: self.config.home_path.clone(),
            flash: Some(Flash::success(ACCOUNT_CHOSEN_MESSAGE)),
        }
    }

    /// Abandon the link entirely.
    pub fn reset_link(&self, session: &mut LinkSession) -> LinkOutcome {
        session.reset();
        info!("link reset");
        LinkOutcome::redirect(&self.config.home_path)
    }

    /// Forget the chosen account but keep the listed ones.
    pub fn reset_account_choice(&self, session: &mut LinkSession) -> LinkOutcome {
        session.reset_account_choice();
        info!("account choice reset");
        LinkOutcome::redirect(&self.config.choose_account_path)
    }

    // -- Internal helpers ---------------------------------------------------

    /// Run a collaborator call under the configured timeout, flattening both
    /// failure modes into a message.
    async fn bounded<T, E, F>(&self, call: F) -> std::result::Result<T, String>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: Into<CollaboratorError>,
    {
        let timeout = self.config.call_timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.into().0),
            Err(_) => Err(format!("timed out after {}s", timeout.as_secs())),
        }
    }

    /// Turn an error into an outcome, propagating fatal ones.
    fn recover(&self, session: &mut LinkSession, error: LinkError) -> Result<LinkOutcome> {
        if error.is_fatal() {
            return Err(error);
        }
        Ok(self.recovered(session, error))
    }

    fn recovered(&self, session: &mut LinkSession, error: LinkError) -> LinkOutcome {
        if error.resets_session() {
            session.reset();
        }
        warn!(
            error = %error,
            reset = error.resets_session(),
            "link step failed"
        );
        LinkOutcome::Failed {
            target: self.config.path_for(error.recovery_target()).to_string(),
            flash: Flash::warning(error.user_message()),
            error,
        }
    }
}

/// Message extracted from a collaborator error.
///
/// Identity provider rejections carry the provider's own wording; everything
/// else uses the error's display form.
struct CollaboratorError(String);

impl From<AuthEngineError> for CollaboratorError {
    fn from(err: AuthEngineError) -> Self {
        match err {
            AuthEngineError::IdentityProvider { reason } => Self(reason),
            other => Self(other.to_string()),
        }
    }
}

impl From<banklink_adapters::AdapterError> for CollaboratorError {
    fn from(err: banklink_adapters::AdapterError) -> Self {
        Self(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
