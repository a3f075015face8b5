//! CLI entry point for BankLink.
//!
//! This binary provides the `banklink` command, which serves the linking
//! routes or checks the configuration.

mod cli;
mod helpers;

use anyhow::{Context, Result};
use banklink_web::{AppConfig, WebServer};
use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::helpers::{init_tracing, load_config, redact};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real deployments set the environment directly.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = load_config(&cli.config)?;

    match cli.command {
        None => cmd_serve(config, None, None).await,
        Some(Commands::Serve { bind, port }) => cmd_serve(config, bind, port).await,
        Some(Commands::CheckConfig) => {
            cmd_check_config(&config);
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(mut config: AppConfig, bind: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind_addr = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    info!("starting BankLink");

    let server = WebServer::new(config).context("failed to build web server")?;
    let addr = server.addr();
    server
        .run()
        .await
        .with_context(|| format!("web server on {addr} failed"))?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: check-config
// ---------------------------------------------------------------------------

fn cmd_check_config(config: &AppConfig) {
    println!("BankLink configuration");
    println!("  listen:         {}", config.addr());
    println!("  client id:      {}", config.oauth.client_id);
    println!(
        "  client secret:  {}",
        redact(config.oauth.client_secret.as_deref())
    );
    println!("  redirect uri:   {}", config.oauth.redirect_uri);
    println!("  auth url:       {}", config.oauth.auth_url);
    println!("  api base url:   {}", config.accounts.api_base_url);
    println!("  verify state:   {}", config.link.verify_state);
    println!("  call timeout:   {}s", config.link.call_timeout_secs);
}
