//! Application state module
//!
//! Contains the shared state used across all server connections.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::game::world::{GameWorld, WorldSettings};

/// Application state shared across the server
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Game world state (owns the connection table and tick loop)
    pub world: Arc<GameWorld>,
    /// Shutdown signal sender
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: ServerConfig, shutdown_tx: broadcast::Sender<()>) -> Result<Self> {
        let mut settings = WorldSettings::new(config.world_id)
            .with_name(config.server_name.clone())
            .with_maps_path(config.maps_path.clone());
        settings.max_players = config.max_players as usize;
        settings.tick_rate_ms = config.tick_rate_ms;
        let world = Arc::new(GameWorld::with_settings(settings)?);

        Ok(Self {
            config,
            world,
            shutdown_tx,
        })
    }
}
