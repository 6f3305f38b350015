//! Shadowplay relay - Main entry point
//!
//! Runs the channel relay that carries mirror traffic between panes and
//! processes, and owns the workspace database.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shadowplay_common::config;
use shadowplay_common::db;
use shadowplay_player::channel::relay::{router, RelayState};

/// Command-line arguments for the relay
#[derive(Parser, Debug)]
#[command(name = "shadowplay-player")]
#[command(about = "Channel relay and workspace database for Shadowplay")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5830", env = "SHADOWPLAY_PORT")]
    port: u16,

    /// Root folder for workspace data (database, media state)
    #[arg(short, long)]
    root_folder: Option<String>,

    /// Explicit database path; defaults to shadowplay.db in the root folder
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shadowplay_player=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), "SHADOWPLAY_ROOT_FOLDER")
        .context("Failed to resolve root folder")?;
    info!("Root folder: {}", root_folder.display());

    let db_path = args.db.unwrap_or_else(|| root_folder.join("shadowplay.db"));
    let _pool = db::init::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database ready at {}", db_path.display());

    let app = router(RelayState::new());
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting relay on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Relay shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
