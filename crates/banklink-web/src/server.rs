//! Web server setup and startup.
//!
//! [`WebServer`] wires the OAuth and accounts clients into a
//! [`LinkCoordinator`], registers the routes, and starts the HTTP listener.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use banklink_adapters::AccountsClient;
use banklink_auth_engine::OAuthFlow;
use banklink_link::LinkCoordinator;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::Result;
use crate::handlers;
use crate::state::AppState;

/// The BankLink web server.
pub struct WebServer {
    config: AppConfig,
    state: Arc<AppState>,
}

impl WebServer {
    /// Build a server talking to the configured bank endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client cannot be constructed.
    pub fn new(config: AppConfig) -> Result<Self> {
        let oauth = OAuthFlow::new(config.oauth.clone())?;
        let accounts = AccountsClient::new(&config.accounts)?;
        let coordinator =
            LinkCoordinator::new(Arc::new(oauth), Arc::new(accounts), config.link.clone());
        Ok(Self::from_parts(config, coordinator))
    }

    /// Build a server around an existing coordinator.
    pub fn from_parts(config: AppConfig, coordinator: LinkCoordinator) -> Self {
        let state = Arc::new(AppState::new(coordinator));
        Self { config, state }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        self.config.addr()
    }

    /// Build the Axum router with all routes registered.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(handlers::home))
            .route("/health", get(handlers::health))
            // Linking flow.
            .route("/monzo/auth", get(handlers::auth))
            .route("/monzo/redirect", get(handlers::redirect))
            .route("/monzo/choose-account", get(handlers::choose_account))
            .route("/monzo/chosen/{account_id}", get(handlers::chosen))
            // Resets.
            .route("/monzo/reset", get(handlers::reset))
            .route("/monzo/reset-account", get(handlers::reset_account))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.state))
    }

    /// Start the server and block until it is shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn run(self) -> Result<()> {
        let addr = self.addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the server stops with an I/O failure.
    pub async fn serve(self, listener: tokio::net::TcpListener) -> Result<()> {
        let router = self.router();
        tracing::info!(addr = %listener.local_addr()?, "starting web server");
        axum::serve(listener, router).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_builds_from_valid_config() {
        let mut config = AppConfig::default();
        config.oauth.client_id = "oauth2client_1".to_string();
        config.oauth.redirect_uri = "http://localhost:8000/monzo/redirect".to_string();
        config.server.port = 9123;

        let server = WebServer::new(config).unwrap();
        assert_eq!(server.addr(), "127.0.0.1:9123");
    }
}
