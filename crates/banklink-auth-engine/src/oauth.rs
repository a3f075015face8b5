//! OAuth 2.0 Authorization Code Flow against the bank's identity provider.
//!
//! This module implements the confidential-client side of the authorization
//! code flow defined in RFC 6749, as used by Monzo:
//!
//! 1. Generate an unguessable `state` nonce.
//! 2. Build an authorization URL bound to that nonce and redirect the user.
//! 3. Receive the authorization code via the host's callback route.
//! 4. Exchange the code for tokens at the token endpoint.
//! 5. Ask the API who the token belongs to (`/ping/whoami`).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AuthEngineError, Result};

/// Length of the state nonce in bytes (before base64 encoding).
const STATE_NONCE_BYTES: usize = 32;

/// Default Monzo authorization endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://auth.monzo.com/";

/// Default Monzo token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://api.monzo.com/oauth2/token";

/// Default Monzo API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.monzo.com";

/// Default per-request timeout for identity provider calls.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the OAuth 2.0 authorization code flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// The OAuth client ID.
    pub client_id: String,

    /// The OAuth client secret (confidential clients only).
    pub client_secret: Option<String>,

    /// The authorization endpoint URL.
    pub auth_url: String,

    /// The token endpoint URL.
    pub token_url: String,

    /// Base URL of the resource API, used for `/ping/whoami`.
    pub api_base_url: String,

    /// The redirect URI registered with the authorization server.
    pub redirect_uri: String,

    /// The scopes to request. Monzo ignores scopes, so this is usually empty.
    pub scopes: Vec<String>,

    /// Timeout applied to every HTTP request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            redirect_uri: String::new(),
            scopes: Vec::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl OAuthConfig {
    /// Check that the fields required to run the flow are present.
    ///
    /// # Errors
    ///
    /// Returns [`AuthEngineError::InvalidConfig`] if `client_id` or
    /// `redirect_uri` is empty, or [`AuthEngineError::UrlParse`] if one of the
    /// endpoint URLs does not parse.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthEngineError::InvalidConfig {
                reason: "missing client_id".to_string(),
            });
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(AuthEngineError::InvalidConfig {
                reason: "missing redirect_uri".to_string(),
            });
        }
        Url::parse(&self.auth_url)?;
        Url::parse(&self.token_url)?;
        Url::parse(&self.api_base_url)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Token and identity types
// ---------------------------------------------------------------------------

/// Tokens returned by the authorization server after a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// The access token used to authenticate API requests.
    pub access_token: String,

    /// The refresh token used to obtain new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// The token type (typically "Bearer").
    pub token_type: String,

    /// The scopes that were granted.
    pub scopes: Vec<String>,
}

impl OAuthTokens {
    /// Whether the access token had expired at `now`.
    ///
    /// Tokens without expiry information are never considered expired here;
    /// callers that need stricter semantics must check `expires_at` themselves.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }
}

/// The resource owner a token was issued for, as reported by `whoami`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOwner {
    /// The OAuth client the token was issued to.
    pub client_id: String,
    /// The bank's identifier for the user.
    pub user_id: String,
}

/// Raw token response from the authorization server.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
}

impl TokenResponse {
    /// Convert into [`OAuthTokens`], computing `expires_at` from `expires_in`.
    ///
    /// An `expires_in` that does not fit a timestamp leaves `expires_at`
    /// unset.
    fn into_tokens(self, now: DateTime<Utc>) -> OAuthTokens {
        let expires_at = self.expires_in.and_then(|secs| {
            let expires_at = chrono::TimeDelta::try_seconds(secs)
                .and_then(|delta| now.checked_add_signed(delta));
            if expires_at.is_none() {
                tracing::warn!(expires_in = secs, "token lifetime out of range, ignoring it");
            }
            expires_at
        });

        let scopes = self
            .scope
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        OAuthTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scopes,
        }
    }
}

/// Raw error response from the authorization server.
///
/// Monzo sends a human-readable `message` alongside the RFC 6749 fields.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
}

impl TokenErrorResponse {
    fn reason(self) -> Option<String> {
        self.error_description.or(self.message).or(self.error)
    }
}

/// Raw `/ping/whoami` response.
#[derive(Debug, Deserialize)]
struct WhoAmIResponse {
    #[serde(default = "default_authenticated")]
    authenticated: bool,
    client_id: String,
    user_id: String,
}

fn default_authenticated() -> bool {
    true
}

// ---------------------------------------------------------------------------
// State nonce
// ---------------------------------------------------------------------------

/// Generate a state nonce (random 32 bytes, base64url encoded).
///
/// # Errors
///
/// Returns [`AuthEngineError::StateGeneration`] if the system CSPRNG fails.
pub fn generate_state_nonce() -> Result<String> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; STATE_NONCE_BYTES];
    rng.fill(&mut bytes)
        .map_err(|_| AuthEngineError::StateGeneration {
            reason: "CSPRNG error".to_string(),
        })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// The OAuth client operations the linking flow depends on.
///
/// [`OAuthFlow`] is the HTTP implementation; tests substitute their own.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Produce a fresh, unguessable state nonce.
    fn generate_state(&self) -> Result<String>;

    /// Build the authorization URL bound to `state`.
    fn authorization_url(&self, state: &str) -> Result<String>;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<OAuthTokens>;

    /// Look up the resource owner for an access token.
    async fn fetch_owner_identity(&self, access_token: &str) -> Result<ResourceOwner>;
}

// ---------------------------------------------------------------------------
// OAuth flow
// ---------------------------------------------------------------------------

/// HTTP implementation of [`OAuthProvider`].
///
/// Holds no per-user state; the pending nonce lives in the caller's session.
pub struct OAuthFlow {
    config: OAuthConfig,
    client: reqwest::Client,
}

impl OAuthFlow {
    /// Create a new OAuth flow with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthEngineError::Network`] if the HTTP client cannot be built.
    pub fn new(config: OAuthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("banklink/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    /// The configuration this flow was built with.
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Parse the HTTP response from the token endpoint.
    async fn parse_token_response(response: reqwest::Response) -> Result<OAuthTokens> {
        let status = response.status();

        if status.is_success() {
            let token_response: TokenResponse = response.json().await?;
            tracing::debug!("token exchange successful");
            Ok(token_response.into_tokens(Utc::now()))
        } else {
            let body = response.text().await.unwrap_or_default();

            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .and_then(TokenErrorResponse::reason)
                .unwrap_or_else(|| format!("HTTP {status}: {body}"));

            tracing::debug!(status = %status, "token endpoint rejected the code");
            Err(AuthEngineError::IdentityProvider { reason })
        }
    }
}

#[async_trait]
impl OAuthProvider for OAuthFlow {
    fn generate_state(&self) -> Result<String> {
        generate_state_nonce()
    }

    /// Includes a `state` parameter for CSRF protection and preserves any
    /// query parameters already present on `auth_url`.
    fn authorization_url(&self, state: &str) -> Result<String> {
        let mut url = Url::parse(&self.config.auth_url)?;

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", &self.config.client_id);
            params.append_pair("redirect_uri", &self.config.redirect_uri);
            params.append_pair("state", state);

            if !self.config.scopes.is_empty() {
                params.append_pair("scope", &self.config.scopes.join(" "));
            }
        }

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthTokens> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
        ];

        if let Some(ref secret) = self.config.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        tracing::debug!(token_url = %self.config.token_url, "exchanging authorization code");

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;

        Self::parse_token_response(response).await
    }

    async fn fetch_owner_identity(&self, access_token: &str) -> Result<ResourceOwner> {
        let url = format!(
            "{}/ping/whoami",
            self.config.api_base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthEngineError::IdentityProvider {
                reason: format!("whoami returned HTTP {status}: {body}"),
            });
        }

        let whoami: WhoAmIResponse = response.json().await?;
        if !whoami.authenticated {
            return Err(AuthEngineError::IdentityProvider {
                reason: "whoami reports the token as unauthenticated".to_string(),
            });
        }

        tracing::debug!(user_id = %whoami.user_id, "resolved resource owner");
        Ok(ResourceOwner {
            client_id: whoami.client_id,
            user_id: whoami.user_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
