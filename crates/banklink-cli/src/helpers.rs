//! Shared helper functions used across CLI subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use banklink_web::AppConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Load the config file, apply `BANKLINK_*` overrides and validate.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let mut config = AppConfig::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    config
        .apply_env()
        .context("invalid BANKLINK_* environment override")?;
    config.validate().context("configuration is incomplete")?;

    info!(
        addr = %config.addr(),
        client_id = %config.oauth.client_id,
        verify_state = config.link.verify_state,
        "configuration ready"
    );
    Ok(config)
}

/// Render `secret` for display without revealing it.
pub fn redact(secret: Option<&str>) -> &'static str {
    match secret {
        Some(s) if !s.is_empty() => "<set>",
        _ => "<unset>",
    }
}
