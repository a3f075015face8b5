//! End-to-end tests: a real server on a random port, driven over HTTP.
//!
//! The bank is replaced by in-process fakes; redirects are not followed so
//! each hop can be asserted.

use std::sync::Arc;

use async_trait::async_trait;
use banklink_adapters::{Account, AccountsProvider, AdapterError};
use banklink_auth_engine::{AuthEngineError, OAuthProvider, OAuthTokens, ResourceOwner};
use banklink_link::LinkCoordinator;
use banklink_web::{AppConfig, HomeResponse, SESSION_COOKIE, WebServer};
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use serde_json::Value;

// ═══════════════════════════════════════════════════════════════════════
//  Fakes
// ═══════════════════════════════════════════════════════════════════════

struct FakeOAuth {
    nonce_fails: bool,
}

#[async_trait]
impl OAuthProvider for FakeOAuth {
    fn generate_state(&self) -> banklink_auth_engine::Result<String> {
        if self.nonce_fails {
            return Err(AuthEngineError::StateGeneration {
                reason: "CSPRNG error".to_string(),
            });
        }
        Ok("nonce-1".to_string())
    }

    fn authorization_url(&self, state: &str) -> banklink_auth_engine::Result<String> {
        Ok(format!("https://auth.example.com/?state={state}"))
    }

    async fn exchange_code(&self, code: &str) -> banklink_auth_engine::Result<OAuthTokens> {
        if code == "used" {
            return Err(AuthEngineError::IdentityProvider {
                reason: "Authorization code has been used".to_string(),
            });
        }
        Ok(OAuthTokens {
            access_token: "access_abc".to_string(),
            refresh_token: None,
            expires_at: Some(Utc::now() + chrono::Duration::hours(6)),
            token_type: "Bearer".to_string(),
            scopes: vec![],
        })
    }

    async fn fetch_owner_identity(
        &self,
        _access_token: &str,
    ) -> banklink_auth_engine::Result<ResourceOwner> {
        Ok(ResourceOwner {
            client_id: "oauth2client_test".to_string(),
            user_id: "user_test".to_string(),
        })
    }
}

struct FakeAccounts {
    accounts: Vec<Account>,
}

#[async_trait]
impl AccountsProvider for FakeAccounts {
    async fn list_accounts(&self, access_token: &str) -> banklink_adapters::Result<Vec<Account>> {
        if access_token.is_empty() {
            return Err(AdapterError::AuthRequired("no token".to_string()));
        }
        Ok(self.accounts.clone())
    }
}

fn accounts(pairs: &[(&str, &str)]) -> Vec<Account> {
    pairs
        .iter()
        .map(|(id, description)| Account {
            id: id.to_string(),
            description: description.to_string(),
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
//  Harness
// ═══════════════════════════════════════════════════════════════════════

struct TestApp {
    base: String,
    client: reqwest::Client,
}

impl TestApp {
    async fn spawn(oauth: FakeOAuth, listed: Vec<Account>) -> Self {
        let config = AppConfig::default();
        let coordinator = LinkCoordinator::new(
            Arc::new(oauth),
            Arc::new(FakeAccounts { accounts: listed }),
            config.link.clone(),
        );
        let server = WebServer::from_parts(config, coordinator);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server.serve(listener));

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            base: format!("http://{addr}"),
            client,
        }
    }

    async fn get(&self, path: &str, user: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.base))
            .header(COOKIE, format!("{SESSION_COOKIE}={user}"))
            .send()
            .await
            .unwrap()
    }

    async fn home(&self, user: &str) -> HomeResponse {
        let response = self.get("/", user).await;
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.unwrap()
    }
}

fn location(response: &reqwest::Response) -> &str {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response.headers().get(LOCATION).unwrap().to_str().unwrap()
}

fn ok_oauth() -> FakeOAuth {
    FakeOAuth { nonce_fails: false }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn first_visit_issues_session_cookie() {
    let app = TestApp::spawn(ok_oauth(), vec![]).await;

    let response = app
        .client
        .get(format!("{}/", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));
    assert!(cookie.contains("HttpOnly"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["state"], "unlinked");
    assert!(body["flash"].is_null());
}

#[tokio::test]
async fn full_flow_with_account_choice() {
    let app = TestApp::spawn(
        ok_oauth(),
        accounts(&[("acc_1", "Personal"), ("acc_2", "Joint")]),
    )
    .await;

    let response = app.get("/monzo/auth", "alice").await;
    assert_eq!(location(&response), "https://auth.example.com/?state=nonce-1");
    assert_eq!(app.home("alice").await.state.to_string(), "awaiting-callback");

    let response = app
        .get("/monzo/redirect?state=nonce-1&code=code_1", "alice")
        .await;
    assert_eq!(location(&response), "/monzo/choose-account");

    let response = app.get("/monzo/choose-account", "alice").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["accounts"].as_array().unwrap().len(), 2);
    assert_eq!(body["accounts"][1]["id"], "acc_2");

    let response = app.get("/monzo/chosen/acc_2", "alice").await;
    assert_eq!(location(&response), "/");

    let home = app.home("alice").await;
    assert_eq!(home.state.to_string(), "linked");
    assert_eq!(home.chosen_account.unwrap().name, "Joint");
    assert_eq!(home.owner.unwrap().user_id, "user_test");
    assert_eq!(
        home.flash.unwrap().message,
        "Monzo account successfully chosen, YNAB now?"
    );

    // The flash is shown once.
    assert!(app.home("alice").await.flash.is_none());
}

#[tokio::test]
async fn single_account_is_chosen_automatically() {
    let app = TestApp::spawn(ok_oauth(), accounts(&[("acc_1", "Personal")])).await;

    app.get("/monzo/auth", "bob").await;
    app.get("/monzo/redirect?state=nonce-1&code=code_1", "bob")
        .await;

    let response = app.get("/monzo/choose-account", "bob").await;
    assert_eq!(location(&response), "/");

    let home = app.home("bob").await;
    assert_eq!(home.state.to_string(), "linked");
    assert_eq!(home.chosen_account.unwrap().id, "acc_1");
    assert!(home.flash.is_none());
}

#[tokio::test]
async fn state_mismatch_redirects_to_reset_and_flash_survives() {
    let app = TestApp::spawn(ok_oauth(), vec![]).await;

    app.get("/monzo/auth", "carol").await;
    let response = app
        .get("/monzo/redirect?state=forged&code=code_1", "carol")
        .await;
    assert_eq!(location(&response), "/monzo/reset");

    let response = app.get("/monzo/reset", "carol").await;
    assert_eq!(location(&response), "/");

    let home = app.home("carol").await;
    assert_eq!(home.state.to_string(), "unlinked");
    assert_eq!(
        home.flash.unwrap().message,
        "Something went wrong with your state, please try again."
    );
}

#[tokio::test]
async fn rejected_code_carries_provider_message() {
    let app = TestApp::spawn(ok_oauth(), vec![]).await;

    app.get("/monzo/auth", "dave").await;
    let response = app.get("/monzo/redirect?state=nonce-1&code=used", "dave").await;
    assert_eq!(location(&response), "/monzo/reset");

    let flash = app.home("dave").await.flash.unwrap();
    assert!(flash.message.ends_with("Authorization code has been used"));
}

#[tokio::test]
async fn missing_code_is_recovered() {
    let app = TestApp::spawn(ok_oauth(), vec![]).await;

    app.get("/monzo/auth", "erin").await;
    let response = app.get("/monzo/redirect?state=nonce-1", "erin").await;
    assert_eq!(location(&response), "/monzo/reset");
    assert_eq!(app.home("erin").await.state.to_string(), "unlinked");
}

#[tokio::test]
async fn choosing_before_listing_is_rejected() {
    let app = TestApp::spawn(ok_oauth(), vec![]).await;

    let response = app.get("/monzo/chosen/acc_1", "frank").await;
    assert_eq!(location(&response), "/monzo/reset");
    assert_eq!(
        app.home("frank").await.flash.unwrap().message,
        "You aren't ready to choose a Monzo account, please try again"
    );
}

#[tokio::test]
async fn listing_without_tokens_is_rejected() {
    let app = TestApp::spawn(ok_oauth(), vec![]).await;

    let response = app.get("/monzo/choose-account", "gina").await;
    assert_eq!(location(&response), "/monzo/reset");
    assert_eq!(
        app.home("gina").await.flash.unwrap().message,
        "Access token is invalid, cannot choose account"
    );
}

#[tokio::test]
async fn reset_account_returns_to_choice() {
    let app = TestApp::spawn(
        ok_oauth(),
        accounts(&[("acc_1", "Personal"), ("acc_2", "Joint")]),
    )
    .await;

    app.get("/monzo/auth", "hank").await;
    app.get("/monzo/redirect?state=nonce-1&code=code_1", "hank")
        .await;
    app.get("/monzo/choose-account", "hank").await;
    app.get("/monzo/chosen/acc_1", "hank").await;

    let response = app.get("/monzo/reset-account", "hank").await;
    assert_eq!(location(&response), "/monzo/choose-account");

    let home = app.home("hank").await;
    assert_eq!(home.state.to_string(), "awaiting-choice");
    assert!(home.chosen_account.is_none());
}

#[tokio::test]
async fn users_are_isolated() {
    let app = TestApp::spawn(ok_oauth(), accounts(&[("acc_1", "Personal")])).await;

    app.get("/monzo/auth", "ivy").await;
    assert_eq!(app.home("ivy").await.state.to_string(), "awaiting-callback");
    assert_eq!(app.home("jack").await.state.to_string(), "unlinked");
}

#[tokio::test]
async fn nonce_failure_is_a_server_error() {
    let app = TestApp::spawn(FakeOAuth { nonce_fails: true }, vec![]).await;

    let response = app.get("/monzo/auth", "kate").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("link error"));

    assert_eq!(app.home("kate").await.state.to_string(), "unlinked");
}

async fn session_count(app: &TestApp) -> u64 {
    let body: Value = app
        .client
        .get(format!("{}/health", app.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["sessions"].as_u64().unwrap()
}

#[tokio::test]
async fn cookieless_requests_store_no_sessions() {
    let app = TestApp::spawn(ok_oauth(), vec![]).await;

    for path in [
        "/monzo/reset",
        "/monzo/reset-account",
        "/monzo/choose-account",
        "/monzo/chosen/acc_1",
        "/",
    ] {
        for _ in 0..5 {
            let response = app
                .client
                .get(format!("{}{path}", app.base))
                .send()
                .await
                .unwrap();
            assert!(response.headers().get(SET_COOKIE).is_some());
        }
    }

    assert_eq!(session_count(&app).await, 0);
}

#[tokio::test]
async fn reset_reclaims_session_and_keeps_flash() {
    let app = TestApp::spawn(ok_oauth(), vec![]).await;

    app.get("/monzo/auth", "lena").await;
    app.get("/monzo/redirect?state=nonce-1", "lena").await;
    assert_eq!(session_count(&app).await, 1);

    let response = app.get("/monzo/reset", "lena").await;
    assert_eq!(location(&response), "/");
    assert_eq!(session_count(&app).await, 0);

    let home = app.home("lena").await;
    assert_eq!(home.state.to_string(), "unlinked");
    assert_eq!(
        home.flash.unwrap().message,
        "Something went wrong with your state, please try again."
    );
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::spawn(ok_oauth(), vec![]).await;

    let response = app
        .client
        .get(format!("{}/health", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
