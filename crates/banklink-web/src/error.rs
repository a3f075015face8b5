//! Error types for the web crate.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors raised while configuring or serving the HTTP surface.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// A fatal error from the linking flow.
    #[error("link error: {0}")]
    Link(#[from] banklink_link::LinkError),

    /// The OAuth client could not be constructed or configured.
    #[error("auth engine error: {0}")]
    AuthEngine(#[from] banklink_auth_engine::AuthEngineError),

    /// The accounts client could not be constructed.
    #[error("adapter error: {0}")]
    Adapter(#[from] banklink_adapters::AdapterError),

    /// Configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error (config file, listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, WebError>;

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        let body = Json(json!({ "error": self.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_link_error_is_500() {
        let err = WebError::Link(banklink_link::LinkError::NonceGenerationFailed {
            message: "rng".to_string(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn config_error_display() {
        let err = WebError::Config("invalid port".to_string());
        assert_eq!(err.to_string(), "configuration error: invalid port");
    }
}
