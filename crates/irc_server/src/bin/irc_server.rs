//! Process entry point: CLI parsing, config load, and handing the bound
//! listener off to [`irc_server::server::accept_loop`].
//!
//! The `flexi_logger` initialization is carried over from this crate's
//! original prototype; the accept loop and per-connection body now live in
//! `irc_server::server` so integration tests can drive them directly
//! without spawning a separate process (see `DESIGN.md`).

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use flexi_logger::{Duplicate, Logger};
use log::{error, info};
use tokio::net::TcpListener;

use irc_server::config::Config;
use irc_server::registry::Registry;
use irc_server::server::accept_loop;

#[derive(Parser, Debug)]
#[command(name = "irc_server", about = "A single-node IRC server core")]
struct Args {
    /// Path to the TOML configuration document.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides `hostname:port` from the config file.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() {
    Logger::try_with_str("info")
        .and_then(|logger| logger.log_to_stderr().duplicate_to_stderr(Duplicate::All).start())
        .ok();

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load config {}: {e}", args.config.display());
            std::process::exit(1);
        }
    };

    let bind_addr = args.bind.clone().unwrap_or_else(|| config.bind_addr());
    let registry = Arc::new(Registry::new(config));

    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {bind_addr}: {e}");
            std::process::exit(1);
        }
    };
    info!("listening on {bind_addr}");

    accept_loop(registry, listener).await;
}
