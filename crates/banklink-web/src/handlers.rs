//! Route handlers.
//!
//! Every handler identifies the browser by the `banklink_session` cookie,
//! issuing a fresh one when it is missing, and holds that user's session
//! lock for the whole coordinator operation. Only the routes that start or
//! complete a link create a stored session; the rest work on an empty one
//! when the user has none.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Redirect, Response};
use banklink_link::{ChosenAccount, Flash, LinkOutcome, LinkSession, LinkState, ResourceOwner};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::Result;
use crate::state::AppState;

/// Name of the cookie that identifies a browser.
pub const SESSION_COOKIE: &str = "banklink_session";

// ---------------------------------------------------------------------------
// Session cookie
// ---------------------------------------------------------------------------

/// The browser making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UserKey {
    id: String,
    fresh: bool,
}

impl UserKey {
    /// Read the session cookie from `headers`, or mint a new key.
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        let existing = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
            .map(|(_, value)| value.to_string());

        match existing {
            Some(id) => Self { id, fresh: false },
            None => {
                let id = uuid::Uuid::now_v7().to_string();
                debug!(session = %id, "issuing new session cookie");
                Self { id, fresh: true }
            }
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    /// Attach the `Set-Cookie` header if this key was just minted.
    fn attach(&self, mut response: Response) -> Response {
        if self.fresh {
            let cookie = format!("{SESSION_COOKIE}={}; HttpOnly; SameSite=Lax; Path=/", self.id);
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }
        response
    }
}

/// Express a coordinator outcome as an HTTP response.
fn respond(state: &AppState, user: &UserKey, outcome: LinkOutcome) -> Response {
    let response = match outcome {
        LinkOutcome::Redirect { target, flash } => {
            if let Some(flash) = flash {
                state.set_flash(user.id(), flash);
            }
            Redirect::to(&target).into_response()
        }
        LinkOutcome::Failed { target, flash, .. } => {
            state.set_flash(user.id(), flash);
            Redirect::to(&target).into_response()
        }
        LinkOutcome::PresentAccounts { accounts } => {
            Json(json!({ "accounts": accounts })).into_response()
        }
    };
    user.attach(response)
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Payload for the home page.
#[derive(Debug, Serialize, Deserialize)]
pub struct HomeResponse {
    pub state: LinkState,
    pub chosen_account: Option<ChosenAccount>,
    pub owner: Option<ResourceOwner>,
    pub flash: Option<Flash>,
}

/// Report linking progress and consume the pending flash message.
pub async fn home(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let user = UserKey::from_headers(&headers);
    let session = state.sessions.snapshot(user.id()).await.unwrap_or_default();

    let body = HomeResponse {
        state: session.state(),
        chosen_account: session.chosen_account().cloned(),
        owner: session.owner_identity().cloned(),
        flash: state.take_flash(user.id()),
    };
    user.attach(Json(body).into_response())
}

// ---------------------------------------------------------------------------
// Linking
// ---------------------------------------------------------------------------

/// Query parameters the authorization server redirects back with.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
}

/// `GET /monzo/auth`: start linking.
pub async fn auth(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Response> {
    let user = UserKey::from_headers(&headers);
    let handle = state.sessions.session(user.id());
    let mut session = handle.lock().await;

    let outcome = state.coordinator.begin_link(&mut session)?;
    Ok(respond(&state, &user, outcome))
}

/// `GET /monzo/redirect`: the authorization server's callback.
pub async fn redirect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Response> {
    let user = UserKey::from_headers(&headers);
    let handle = state.sessions.session(user.id());
    let mut session = handle.lock().await;

    let outcome = state
        .coordinator
        .complete_link(&mut session, params.state.as_deref(), params.code.as_deref())
        .await?;
    Ok(respond(&state, &user, outcome))
}

/// `GET /monzo/choose-account`: list accounts or auto-select the only one.
pub async fn choose_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response> {
    let user = UserKey::from_headers(&headers);

    let outcome = match state.sessions.get(user.id()) {
        Some(handle) => {
            let mut session = handle.lock().await;
            state.coordinator.list_accounts(&mut session).await?
        }
        None => {
            state
                .coordinator
                .list_accounts(&mut LinkSession::new())
                .await?
        }
    };
    Ok(respond(&state, &user, outcome))
}

/// `GET /monzo/chosen/{account_id}`: record the user's pick.
pub async fn chosen(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> Response {
    let user = UserKey::from_headers(&headers);

    let outcome = match state.sessions.get(user.id()) {
        Some(handle) => {
            let mut session = handle.lock().await;
            state.coordinator.choose_account(&mut session, &account_id)
        }
        None => state
            .coordinator
            .choose_account(&mut LinkSession::new(), &account_id),
    };
    respond(&state, &user, outcome)
}

/// `GET /monzo/reset`: abandon the link and drop the stored session.
///
/// A pending flash survives.
pub async fn reset(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let user = UserKey::from_headers(&headers);

    let outcome = match state.sessions.get(user.id()) {
        Some(handle) => {
            let mut session = handle.lock().await;
            let outcome = state.coordinator.reset_link(&mut session);
            state.sessions.remove(user.id());
            outcome
        }
        None => state.coordinator.reset_link(&mut LinkSession::new()),
    };
    respond(&state, &user, outcome)
}

/// `GET /monzo/reset-account`: pick a different account.
pub async fn reset_account(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let user = UserKey::from_headers(&headers);

    let outcome = match state.sessions.get(user.id()) {
        Some(handle) => {
            let mut session = handle.lock().await;
            state.coordinator.reset_account_choice(&mut session)
        }
        None => state
            .coordinator
            .reset_account_choice(&mut LinkSession::new()),
    };
    respond(&state, &user, outcome)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.len(),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
