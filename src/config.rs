//! Server configuration module
//!
//! Handles loading and parsing of server configuration from files and environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Server name displayed to players
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// World ID (1-255)
    #[serde(default = "default_world_id")]
    pub world_id: u8,

    /// Game port (TCP)
    #[serde(default = "default_game_port")]
    pub game_port: u16,

    /// Path to map square data files (land/loc CRC + streaming source)
    #[serde(default = "default_maps_path")]
    pub maps_path: PathBuf,

    /// Path to data files (configs, scripts, etc.)
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Maximum number of players
    #[serde(default = "default_max_players")]
    pub max_players: u32,

    /// Game tick rate in milliseconds
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,

    /// Autosave interval in seconds (0 to disable)
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval_secs: u64,

    /// Development mode flag
    #[serde(default)]
    pub dev_mode: bool,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

// Default value functions
fn default_server_name() -> String {
    "Rustscape".to_string()
}

fn default_world_id() -> u8 {
    1
}

fn default_game_port() -> u16 {
    43594
}

fn default_maps_path() -> PathBuf {
    PathBuf::from("./data/maps")
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./data")
}

fn default_max_players() -> u32 {
    2000
}

fn default_tick_rate() -> u64 {
    600 // 600ms = standard RS tick rate
}

fn default_autosave_interval() -> u64 {
    300 // 5 minutes = 300 seconds
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config/server.toml"),
            server_name: default_server_name(),
            world_id: default_world_id(),
            game_port: default_game_port(),
            maps_path: default_maps_path(),
            data_path: default_data_path(),
            max_players: default_max_players(),
            tick_rate_ms: default_tick_rate(),
            autosave_interval_secs: default_autosave_interval(),
            dev_mode: false,
            debug: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from file and environment variables
    pub async fn load() -> Result<Self> {
        let config_path = env::var("RUSTSCAPE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/server.toml"));

        let mut config = if config_path.exists() {
            let content = tokio::fs::read_to_string(&config_path)
                .await
                .with_context(|| {
                    format!("Failed to read config file: {}", config_path.display())
                })?;

            toml::from_str(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };

        config.config_path = config_path;
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("RUSTSCAPE_SERVER_NAME") {
            self.server_name = val;
        }
        if let Ok(val) = env::var("RUSTSCAPE_WORLD_ID") {
            if let Ok(id) = val.parse() {
                self.world_id = id;
            }
        }
        if let Ok(val) = env::var("RUSTSCAPE_GAME_PORT") {
            if let Ok(port) = val.parse() {
                self.game_port = port;
            }
        }
        if let Ok(val) = env::var("RUSTSCAPE_MAPS_PATH") {
            self.maps_path = PathBuf::from(val);
        }
        if let Ok(val) = env::var("RUSTSCAPE_DATA_PATH") {
            self.data_path = PathBuf::from(val);
        }
        if let Ok(val) = env::var("RUSTSCAPE_MAX_PLAYERS") {
            if let Ok(max) = val.parse() {
                self.max_players = max;
            }
        }
        if let Ok(val) = env::var("RUSTSCAPE_DEV_MODE") {
            self.dev_mode = val.to_lowercase() == "true" || val == "1";
        }
        if let Ok(val) = env::var("RUSTSCAPE_DEBUG") {
            self.debug = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.world_id == 0 {
            anyhow::bail!("World ID must be between 1 and 255");
        }

        if self.max_players == 0 || self.max_players > 10000 {
            anyhow::bail!("Max players must be between 1 and 10000");
        }

        if self.tick_rate_ms < 100 || self.tick_rate_ms > 5000 {
            anyhow::bail!("Tick rate must be between 100ms and 5000ms");
        }

        Ok(())
    }

    /// Get the actual game port (base port + world ID)
    pub fn actual_game_port(&self) -> u16 {
        self.game_port + self.world_id as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server_name, "Rustscape");
        assert_eq!(config.world_id, 1);
        assert_eq!(config.game_port, 43594);
        assert_eq!(config.tick_rate_ms, 600);
        assert_eq!(config.autosave_interval_secs, 300);
    }

    #[test]
    fn test_actual_game_port() {
        let mut config = ServerConfig::default();
        config.world_id = 1;
        assert_eq!(config.actual_game_port(), 43595);

        config.world_id = 2;
        assert_eq!(config.actual_game_port(), 43596);
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_ok());

        config.world_id = 0;
        assert!(config.validate().is_err());
        config.world_id = 1;

        config.tick_rate_ms = 10;
        assert!(config.validate().is_err());
    }
}
