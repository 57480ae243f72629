//! Rustscape Game Server
//!
//! A revision 225 game server: one TCP listener, one tick-synchronous
//! world task. Connections are accepted here and handed to the world's
//! connection table; all further I/O and game logic run on the world's own
//! non-blocking poll loop.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use rustscape_server::config::ServerConfig;
use rustscape_server::state::AppState;
use rustscape_server::{REVISION, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("╔══════════════════════════════════════════════╗");
    info!("║        Rustscape Game Server v{}             ║", VERSION);
    info!("║          Revision: {}                         ║", REVISION);
    info!("╚══════════════════════════════════════════════╝");

    let config = ServerConfig::load().await?;
    info!(
        "Configuration loaded from: {}",
        config.config_path.display()
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let state = Arc::new(AppState::new(config.clone(), shutdown_tx.clone())?);
    info!("Application state initialized");

    let world_state = state.clone();
    let mut world_shutdown_rx = shutdown_tx.subscribe();
    let world_handle = tokio::spawn(async move {
        world_state.world.run(&mut world_shutdown_rx).await;
    });

    let game_addr: SocketAddr = format!("0.0.0.0:{}", config.actual_game_port()).parse()?;
    let game_listener = TcpListener::bind(game_addr).await?;
    info!("Game server listening on: {}", game_addr);

    let accept_state = state.clone();
    let mut accept_shutdown_rx = shutdown_tx.subscribe();
    let accept_handle = tokio::spawn(async move {
        accept_connections(game_listener, accept_state, &mut accept_shutdown_rx).await;
    });

    info!("Server startup complete!");
    info!("World {} is ready for connections", config.world_id);

    wait_for_shutdown(shutdown_tx.clone()).await;

    info!("Shutting down server...");

    let _ = accept_handle.await;
    let _ = world_handle.await;

    info!("Server shutdown complete. Goodbye!");
    Ok(())
}

/// Initialize the logging/tracing system
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rustscape_server=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();
}

/// Accept incoming game connections and hand each socket to the world's
/// connection table; no per-connection task is spawned.
async fn accept_connections(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown_rx: &mut broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        info!("New game connection from: {}", addr);
                        state.world.accept_connection(stream, addr);
                    }
                    Err(e) => {
                        error!("Failed to accept game connection: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Connection acceptor shutting down");
                break;
            }
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn wait_for_shutdown(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    let _ = shutdown_tx.send(());
}
