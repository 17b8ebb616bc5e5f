//! Favicon resolver service.
//!
//! # Architecture Overview
//!
//! ```text
//!   GET /favicon?url=...
//!          │
//!          ▼
//!   ┌─────────────┐   ┌────────────┐   ┌────────────┐   ┌─────────────┐
//!   │ rate limit  │──▶│ url guard  │──▶│ dns guard  │──▶│ fetch +     │──▶ {"favicon": ...}
//!   │ (per addr)  │   │ (literal)  │   │ (resolved) │   │ extract     │
//!   └─────────────┘   └────────────┘   └────────────┘   └─────────────┘
//!                                            │ screened addresses ▲
//!                                            └────── pinned ──────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use favicon_resolver::config::load_config;
use favicon_resolver::lifecycle::Shutdown;
use favicon_resolver::observability::{logging, metrics};
use favicon_resolver::HttpServer;

#[derive(Parser)]
#[command(name = "favicon-resolver")]
#[command(about = "Resolve the favicon URL of a web page", version)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "FAVICON_RESOLVER_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port (overrides the config file and PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref(), cli.port)?;

    logging::init_logging(&config.observability);
    tracing::info!("favicon-resolver v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.bind_address(),
        fetch_timeout_secs = config.fetch.timeout_secs,
        pin_resolved_addresses = config.fetch.pin_resolved_addresses,
        rate_limit = config.rate_limit.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Server running");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        _ = shutdown.trigger_on_signal() => {}
        result = &mut server_task => {
            result??;
            return Ok(());
        }
    }

    server_task.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
