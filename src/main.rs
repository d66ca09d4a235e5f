//! tictactoe_lobby - lobby server and room watcher.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tictactoe_lobby::{LobbyConfig, RoomWatcher, SessionEngine, router};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tictactoe_lobby=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, host, port } => run_server(config, host, port).await,
        Command::Watch {
            server_url,
            room_code,
            interval_ms,
        } => {
            RoomWatcher::new(server_url, room_code)
                .watch(Duration::from_millis(interval_ms))
                .await
        }
    }
}

/// Loads configuration: file, then environment, then flags.
#[instrument]
fn load_config(path: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<LobbyConfig> {
    let config = match path {
        Some(path) => LobbyConfig::from_file(&path)?,
        None => LobbyConfig::default(),
    };
    Ok(config.with_process_env()?.with_bind(host, port))
}

/// Run the HTTP lobby server until Ctrl-C.
async fn run_server(path: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = load_config(path, host, port)?;
    info!(backend = ?config.backend(), "Starting tictactoe lobby");

    let store = config
        .backend()
        .open()
        .context("Room store is unavailable")?;
    let engine = Arc::new(SessionEngine::new(store).with_code_attempts(*config.code_attempts()));
    let app = router(Arc::clone(&engine));

    let listener = tokio::net::TcpListener::bind((config.host().as_str(), *config.port())).await?;
    info!(addr = %listener.local_addr()?, "Lobby ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            }
            info!("Shutting down");
        })
        .await?;

    drop(engine);
    info!("Room store closed");
    Ok(())
}
