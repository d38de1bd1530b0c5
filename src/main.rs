//! Database guard service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Business code                        Orchestrator probes
//!          │                                       │
//!          ▼                                       ▼
//!   ┌──────────────┐                       ┌──────────────┐
//!   │   executor   │                       │  http server │
//!   │ profile, cb, │                       │ live / ready │
//!   │ timeout,retry│                       │ status/admin │
//!   └──────┬───────┘                       └──────┬───────┘
//!          │                                      │
//!          ▼                                      ▼
//!   ┌──────────────┐    snapshot    ┌──────────────────────┐
//!   │ managed pool │◀───────────────│  health aggregator   │
//!   │  (sqlx)      │                │ probes + pool band   │
//!   └──────┬───────┘                └──────────────────────┘
//!          ▼
//!      PostgreSQL
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use db_guard::config::{load_config, load_from_env};
use db_guard::lifecycle::signals::shutdown_signal;
use db_guard::lifecycle::StartupError;
use db_guard::observability::{logging, metrics};
use db_guard::{HttpServer, Services, Shutdown};

const DRAIN_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "db-guard")]
#[command(about = "Database resilience layer with health endpoints", long_about = None)]
struct Args {
    /// TOML configuration file; defaults plus environment when omitted.
    #[arg(short, long, env = "DB_GUARD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path),
        None => load_from_env(),
    }
    .map_err(StartupError::from)?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "db-guard starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.server.bind_address.clone();
    let services = Services::build(config)?;

    let shutdown = Shutdown::new();
    let tasks = services.spawn_background(&shutdown);

    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: bind_address.clone(),
            source,
        })?;

    let server = HttpServer::new(services.app_state());
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    shutdown_signal().await;
    tracing::info!("Shutting down");
    shutdown.trigger();

    match server_task.await {
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
        Ok(Ok(())) => {}
    }
    Shutdown::drain(tasks, DRAIN_DEADLINE).await;
    services.pool.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
