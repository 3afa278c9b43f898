//! Resolution server CLI
//!
//! Usage:
//!   ensearch-server --directory data/directory.json
//!   ensearch-server --directory data/directory.json --metrics-listen 127.0.0.1:9090
//!   ensearch-server --directory data/directory.json --public-admin

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use ensearch_server::{
    create_admin_router, create_public_router, create_router, init_prometheus_recorder,
    ServerConfig, ServerState,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "ensearch-server")]
#[command(about = "Serve name and address lookups from a profile directory")]
struct Args {
    /// Address for the public API
    #[arg(long, env = "ENSEARCH_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    /// JSON file with an array of profiles
    #[arg(long, env = "ENSEARCH_DIRECTORY")]
    directory: PathBuf,

    /// Separate address for admin routes and Prometheus metrics
    #[arg(long, env = "ENSEARCH_METRICS_LISTEN")]
    metrics_listen: Option<SocketAddr>,

    /// Serve the unauthenticated reload route on the public address when
    /// no --metrics-listen is given
    #[arg(long, env = "ENSEARCH_PUBLIC_ADMIN")]
    public_admin: bool,

    /// Maximum profiles returned by discovery search
    #[arg(long, env = "ENSEARCH_SEARCH_LIMIT", default_value_t = 20)]
    search_limit: usize,

    /// Maximum requests handled concurrently
    #[arg(long, env = "ENSEARCH_MAX_CONCURRENCY", default_value_t = 256)]
    max_concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ensearch_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = ServerConfig {
        search_limit: args.search_limit,
        max_concurrency: args.max_concurrency,
        ..ServerConfig::default()
    };

    let state = Arc::new(ServerState::from_file(&args.directory, config)?);

    let app = match args.metrics_listen {
        Some(metrics_addr) => {
            let prometheus = init_prometheus_recorder()?;
            let admin = create_admin_router(state.clone(), Some(prometheus));
            let listener = TcpListener::bind(metrics_addr).await?;
            tracing::info!(addr = %metrics_addr, "Admin and metrics listening");
            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, admin).await {
                    tracing::error!(error = %e, "Admin server stopped");
                }
            });
            create_public_router(state)
        }
        None if args.public_admin => {
            tracing::warn!("Admin routes exposed on the public address");
            create_router(state)
        }
        None => {
            tracing::info!("Admin routes disabled; pass --metrics-listen or --public-admin");
            create_public_router(state)
        }
    };

    let listener = TcpListener::bind(args.listen).await?;
    tracing::info!(addr = %args.listen, "Resolution server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
