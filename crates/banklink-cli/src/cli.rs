//! CLI argument definitions for BankLink.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use banklink_web::DEFAULT_CONFIG_PATH;
use clap::{Parser, Subcommand};

/// BankLink -- link a Monzo account for budgeting sync.
#[derive(Parser)]
#[command(
    name = "banklink",
    version,
    about = "BankLink -- Monzo account linking service",
    long_about = "Walks a user through Monzo OAuth and account selection, keeping \
                  the linked account ready for downstream budgeting sync."
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (the default).
    Serve {
        /// Address to bind the HTTP server to.
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on.
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Load and validate the configuration, then print a summary.
    CheckConfig,
}
