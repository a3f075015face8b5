//! Application configuration.
//!
//! Loaded from a TOML file, then overridden by `BANKLINK_*` environment
//! variables so secrets never need to live in the file:
//!
//! ```toml
//! [server]
//! bind_addr = "127.0.0.1"
//! port = 8000
//!
//! [oauth]
//! client_id = "oauth2client_00009abc"
//! redirect_uri = "http://localhost:8000/monzo/redirect"
//!
//! [link]
//! verify_state = true
//! ```

use std::ffi::OsString;
use std::path::Path;

use banklink_adapters::AccountsConfig;
use banklink_auth_engine::OAuthConfig;
use banklink_link::LinkConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WebError};

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/banklink.toml";

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

/// Everything the service needs to start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    pub accounts: AccountsConfig,
    pub link: LinkConfig,
}

impl AppConfig {
    /// Load from `path`, falling back to defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns [`WebError::Io`] if the file exists but cannot be read, or
    /// [`WebError::Config`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "config file does not exist, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "configuration loaded from file");
        Ok(config)
    }

    /// Parse from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`WebError::Config`] on malformed TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| WebError::Config(format!("failed to parse TOML config: {e}")))
    }

    /// Apply overrides from the process environment. Variables whose name or
    /// value is not valid UTF-8 are skipped.
    ///
    /// # Errors
    ///
    /// See [`apply_overrides`](Self::apply_overrides).
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(utf8_vars(std::env::vars_os()))
    }

    /// Apply `BANKLINK_*` overrides from `vars`. Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`WebError::Config`] if `BANKLINK_PORT` is not a valid port.
    pub fn apply_overrides<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "BANKLINK_CLIENT_ID" => self.oauth.client_id = value,
                "BANKLINK_CLIENT_SECRET" => self.oauth.client_secret = Some(value),
                "BANKLINK_REDIRECT_URI" => self.oauth.redirect_uri = value,
                "BANKLINK_BIND_ADDR" => self.server.bind_addr = value,
                "BANKLINK_PORT" => {
                    self.server.port = value.parse().map_err(|_| {
                        WebError::Config(format!("BANKLINK_PORT is not a valid port: {value}"))
                    })?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Check the configuration is complete enough to serve requests.
    ///
    /// # Errors
    ///
    /// Returns [`WebError::AuthEngine`] if the OAuth section is incomplete.
    pub fn validate(&self) -> Result<()> {
        self.oauth.validate()?;
        Ok(())
    }

    /// The `host:port` string the server binds to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.bind_addr, self.server.port)
    }
}

/// Keep only the pairs that are valid UTF-8.
fn utf8_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}
