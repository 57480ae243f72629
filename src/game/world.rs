//! World module
//!
//! Manages the game world including:
//! - The accept/login/service loop for connections (non-blocking, single task)
//! - Game tick loop (600ms intervals)
//! - Movement resolution and per-observer `PLAYER_INFO` emission
//! - Region/collision management

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::game::coord::Position;
use crate::game::player::{Player, PlayerManager};
use crate::game::store::{InMemoryPlayerStore, PlayerStore};
use crate::net::buffer::HeaderKind;
use crate::net::connection::{ConnectionState, LoginStage};
use crate::protocol::login::{ciphers_for, parse_login_header, HeaderParseOutcome, LoginResponse};
use crate::protocol::map::build_load_area;
use crate::protocol::packets::{OutgoingPacket, SidebarTabPacket};
use crate::protocol::player_info::{encode_player_info, NoopPayloadWriter, PlayerSnapshot};
use crate::protocol::update_flags::UpdateFlags;

/// Standard game tick rate in milliseconds
pub const TICK_RATE_MS: u64 = 600;

/// Maximum players per world
pub const MAX_PLAYERS: usize = 2048;

/// World settings
#[derive(Debug, Clone)]
pub struct WorldSettings {
    pub world_id: u8,
    pub name: String,
    pub members: bool,
    pub pvp: bool,
    pub dev_mode: bool,
    pub tick_rate_ms: u64,
    pub max_players: usize,
    pub maps_path: PathBuf,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            world_id: 1,
            name: "Rustscape".to_string(),
            members: false,
            pvp: false,
            dev_mode: true,
            tick_rate_ms: TICK_RATE_MS,
            max_players: MAX_PLAYERS,
            maps_path: PathBuf::from("./data/maps"),
        }
    }
}

impl WorldSettings {
    pub fn new(world_id: u8) -> Self {
        Self {
            world_id,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_members(mut self, members: bool) -> Self {
        self.members = members;
        self
    }

    pub fn with_pvp(mut self, pvp: bool) -> Self {
        self.pvp = pvp;
        self
    }

    pub fn with_maps_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.maps_path = path.into();
        self
    }
}

/// World state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldState {
    Initializing,
    Running,
    Updating,
    ShuttingDown,
    Stopped,
}

impl WorldState {
    pub fn accepting_connections(&self) -> bool {
        matches!(self, WorldState::Running)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, WorldState::Running | WorldState::Updating)
    }
}

/// Game world - manages the game tick, connection table, and entity lifecycle.
///
/// Everything here runs on one task: ticks and network servicing are two
/// branches of the same `tokio::select!`, and every connection operation is
/// non-blocking. No operation is allowed to suspend within a tick boundary.
pub struct GameWorld {
    pub settings: WorldSettings,
    state: RwLock<WorldState>,
    tick: AtomicU64,
    running: AtomicBool,
    start_time: RwLock<Option<Instant>>,
    update_countdown: AtomicU64,
    players: PlayerManager,
    store: Arc<dyn PlayerStore>,
    connections: DashMap<u64, ConnectionState>,
    next_connection_id: AtomicU64,
}

impl GameWorld {
    pub fn new(world_id: u8) -> Result<Self> {
        let settings = WorldSettings::new(world_id);
        Self::with_settings(settings)
    }

    pub fn with_settings(settings: WorldSettings) -> Result<Self> {
        info!(
            world_id = settings.world_id,
            name = %settings.name,
            "Creating game world"
        );

        Ok(Self {
            players: PlayerManager::new(settings.max_players as u16),
            store: Arc::new(InMemoryPlayerStore::new()),
            connections: DashMap::new(),
            next_connection_id: AtomicU64::new(1),
            settings,
            state: RwLock::new(WorldState::Initializing),
            tick: AtomicU64::new(0),
            running: AtomicBool::new(false),
            start_time: RwLock::new(None),
            update_countdown: AtomicU64::new(0),
        })
    }

    pub fn state(&self) -> WorldState {
        *self.state.read()
    }

    pub fn set_state(&self, new_state: WorldState) {
        let mut state = self.state.write();
        let old_state = *state;
        *state = new_state;
        info!(old_state = ?old_state, new_state = ?new_state, "World state changed");
    }

    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn player_count(&self) -> u64 {
        self.players.count() as u64
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .read()
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn start_update(&self, ticks: u64) {
        self.update_countdown.store(ticks, Ordering::SeqCst);
        self.set_state(WorldState::Updating);
        info!(ticks = ticks, "Update countdown started");
    }

    pub fn cancel_update(&self) {
        self.update_countdown.store(0, Ordering::SeqCst);
        self.set_state(WorldState::Running);
        info!("Update countdown cancelled");
    }

    /// Accept a freshly-connected socket into the connection table. Called
    /// by the acceptor loop in `main`; does no blocking I/O itself.
    pub fn accept_connection(&self, socket: TcpStream, addr: std::net::SocketAddr) {
        if let Err(e) = socket.set_nodelay(true) {
            warn!(error = %e, "failed to set TCP_NODELAY");
        }
        let id = self.next_connection_id.fetch_add(1, Ordering::SeqCst);
        let conn = ConnectionState::new(socket, addr);
        self.connections.insert(id, conn);
        debug!(id, %addr, "connection accepted");
    }

    /// Service every open connection once: drain readable bytes, advance the
    /// login handshake, flush writable bytes. Never blocks.
    fn service_connections(&self) {
        let mut closed = Vec::new();

        for mut entry in self.connections.iter_mut() {
            let id = *entry.key();
            let conn = entry.value_mut();

            if conn.try_recv().is_err() {
                closed.push(id);
                continue;
            }

            if conn.stage == LoginStage::AwaitingConnection {
                conn.outbound.write_uint(0x1122_3344);
                conn.outbound.write_uint(0x5566_7788);
                conn.stage = LoginStage::AwaitingHeader;
            }

            if conn.stage == LoginStage::AwaitingHeader {
                match self.try_advance_login(conn) {
                    Ok(true) => {}
                    Ok(false) => {}
                    Err(()) => {
                        closed.push(id);
                        continue;
                    }
                }
            }

            if conn.try_flush().is_err() {
                closed.push(id);
            }
            conn.compact_inbound();
        }

        for id in closed {
            self.drop_connection(id);
        }
    }

    /// Attempt to parse and apply the login header against one connection.
    /// Returns `Ok(true)` on a successful seat, `Ok(false)` if more data is
    /// needed, `Err(())` if the connection should be torn down.
    fn try_advance_login(&self, conn: &mut ConnectionState) -> std::result::Result<bool, ()> {
        let raw = conn.inbound.as_bytes()[conn.inbound.read_position()..].to_vec();
        match parse_login_header(&raw) {
            HeaderParseOutcome::NeedMoreData => Ok(false),
            HeaderParseOutcome::Reject => Err(()),
            HeaderParseOutcome::Parsed(header) => {
                conn.inbound.skip(raw.len());

                if self.players.is_full() {
                    conn.outbound.write_ubyte(LoginResponse::WorldFull as u8);
                    return Err(());
                }

                let record = self.store.load(&header.username);
                let player = match self.players.register(header.username.clone(), record.as_ref()) {
                    Ok(player) => player,
                    Err(_) => {
                        conn.outbound.write_ubyte(LoginResponse::AlreadyOnline as u8);
                        return Err(());
                    }
                };

                let ciphers = ciphers_for(&header.client_seeds);
                conn.seat(player.index, ciphers);

                conn.outbound.write_ubyte(LoginResponse::Ok as u8);
                conn.outbound.write_ubyte(0); // rights byte, normal player
                conn.outbound.write_ubyte(0); // flagged byte

                for (interface_id, tab) in crate::protocol::login::SIDEBAR_TABS {
                    let tab_packet = SidebarTabPacket::new(*interface_id, *tab);
                    let header = conn
                        .outbound
                        .open_packet(SidebarTabPacket::OPCODE, HeaderKind::Fixed, None);
                    tab_packet.encode(&mut conn.outbound);
                    conn.outbound.finish_packet(header);
                }

                let load_area = build_load_area(&self.settings.maps_path, &player.position());
                conn.outbound.write_bytes(load_area.as_bytes());

                info!(username = %player.username, index = player.index, "player logged in");
                Ok(true)
            }
        }
    }

    fn drop_connection(&self, id: u64) {
        if let Some((_, conn)) = self.connections.remove(&id) {
            if let Some(slot) = conn.player_slot {
                if let Some(player) = self.players.get(slot) {
                    self.store.save(&player.to_record());
                }
                self.players.unregister(slot);
            }
            debug!(id, "connection dropped");
        }
    }

    /// Run the game world tick loop
    pub async fn run(&self, shutdown_rx: &mut broadcast::Receiver<()>) {
        info!(
            world_id = self.settings.world_id,
            tick_rate_ms = self.settings.tick_rate_ms,
            "Starting game world"
        );

        self.running.store(true, Ordering::SeqCst);
        *self.start_time.write() = Some(Instant::now());
        self.set_state(WorldState::Running);

        let mut tick_interval = interval(Duration::from_millis(self.settings.tick_rate_ms));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut net_interval = interval(Duration::from_millis(20));
        net_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    if !self.is_running() {
                        break;
                    }

                    if let Err(e) = self.process_tick().await {
                        error!(error = %e, "Error processing game tick");
                    }

                    let countdown = self.update_countdown.load(Ordering::SeqCst);
                    if countdown > 0 {
                        let new_countdown = countdown - 1;
                        self.update_countdown.store(new_countdown, Ordering::SeqCst);
                        if new_countdown == 0 {
                            info!("Update countdown reached zero, initiating shutdown");
                            break;
                        }
                    }
                }
                _ = net_interval.tick() => {
                    self.service_connections();
                }
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        self.set_state(WorldState::Stopped);

        info!(
            total_ticks = self.tick(),
            uptime_secs = self.uptime_secs(),
            "Game world stopped"
        );
    }

    /// Process a single game tick: resolve movement for every seated player,
    /// take a snapshot, then encode and flush one `PLAYER_INFO` frame per
    /// observer against that snapshot.
    async fn process_tick(&self) -> Result<()> {
        let tick_num = self.tick.fetch_add(1, Ordering::SeqCst);
        if tick_num % 1000 == 0 {
            debug!(tick = tick_num, players = self.player_count(), "Game tick milestone");
        }

        let mut players: Vec<Arc<Player>> = Vec::new();
        self.collect_players(&mut players);

        for player in &players {
            let (dx, dz) = {
                let pos = player.position();
                let mut movement = player.movement.write();
                let dir = movement.next_direction(pos.x, pos.z);
                direction_delta(dir)
            };
            if dx != 0 || dz != 0 {
                let pos = player.position();
                let new_pos = Position::new(
                    (pos.x as i32 + dx).max(0) as u16,
                    (pos.z as i32 + dz).max(0) as u16,
                    pos.height,
                );
                player.set_position(new_pos);
            }
        }

        let snapshots: Vec<PlayerSnapshot> = players.iter().map(|p| snapshot_of(p)).collect();

        for mut entry in self.connections.iter_mut() {
            let conn = entry.value_mut();
            let Some(slot) = conn.player_slot else { continue };
            let Some(player) = self.players.get(slot) else { continue };
            let Some(observer) = snapshots.iter().find(|s| s.slot == slot) else { continue };

            let mut tracking = player.tracking.write();
            let packet = encode_player_info(observer, &mut tracking, &snapshots, &NoopPayloadWriter);
            drop(tracking);

            // Staged here; actually written to the socket on the next
            // network-service pass (`service_connections`'s `try_flush`).
            conn.outbound.write_bytes(packet.as_bytes());
        }

        for player in &players {
            *player.needs_placement.write() = false;
            *player.update_flags.write() = UpdateFlags::empty();
        }

        Ok(())
    }

    fn collect_players(&self, out: &mut Vec<Arc<Player>>) {
        for entry in self.connections.iter() {
            if let Some(slot) = entry.value().player_slot {
                if let Some(player) = self.players.get(slot) {
                    out.push(player);
                }
            }
        }
    }

    pub fn broadcast_message(&self, message: &str) {
        info!(message = %message, "Broadcasting message to all players");
    }

    pub fn info(&self) -> String {
        format!(
            "World {} ({}) - {} players - Tick {} - Uptime {}s",
            self.settings.world_id,
            self.settings.name,
            self.player_count(),
            self.tick(),
            self.uptime_secs()
        )
    }
}

fn direction_delta(direction: i32) -> (i32, i32) {
    match direction {
        0 => (-1, 1),
        1 => (0, 1),
        2 => (1, 1),
        3 => (-1, 0),
        4 => (1, 0),
        5 => (-1, -1),
        6 => (0, -1),
        7 => (1, -1),
        _ => (0, 0),
    }
}

fn snapshot_of(player: &Player) -> PlayerSnapshot {
    PlayerSnapshot {
        slot: player.index,
        position: player.position(),
        primary_direction: -1,
        secondary_direction: -1,
        region_changed: *player.needs_placement.read(),
        needs_placement: *player.needs_placement.read(),
        placement_ticks: 0,
        update_flags: *player.update_flags.read(),
        appearance_hash: 0,
    }
}

impl std::fmt::Debug for GameWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameWorld")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .field("tick", &self.tick())
            .field("running", &self.is_running())
            .field("player_count", &self.player_count())
            .field("uptime_secs", &self.uptime_secs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_settings_default() {
        let settings = WorldSettings::default();
        assert_eq!(settings.world_id, 1);
        assert_eq!(settings.tick_rate_ms, TICK_RATE_MS);
        assert!(!settings.members);
        assert!(!settings.pvp);
    }

    #[test]
    fn test_world_settings_builder() {
        let settings = WorldSettings::new(5)
            .with_name("Test World")
            .with_members(true)
            .with_pvp(true);

        assert_eq!(settings.world_id, 5);
        assert_eq!(settings.name, "Test World");
        assert!(settings.members);
        assert!(settings.pvp);
    }

    #[test]
    fn test_world_creation() {
        let world = GameWorld::new(1).unwrap();
        assert_eq!(world.settings.world_id, 1);
        assert_eq!(world.tick(), 0);
        assert!(!world.is_running());
        assert_eq!(world.player_count(), 0);
    }

    #[test]
    fn test_world_state() {
        let world = GameWorld::new(1).unwrap();
        assert_eq!(world.state(), WorldState::Initializing);

        world.set_state(WorldState::Running);
        assert_eq!(world.state(), WorldState::Running);
        assert!(world.state().accepting_connections());
        assert!(world.state().is_active());

        world.set_state(WorldState::Updating);
        assert!(!world.state().accepting_connections());
        assert!(world.state().is_active());

        world.set_state(WorldState::Stopped);
        assert!(!world.state().accepting_connections());
        assert!(!world.state().is_active());
    }

    #[test]
    fn test_update_countdown() {
        let world = GameWorld::new(1).unwrap();
        world.set_state(WorldState::Running);

        world.start_update(100);
        assert_eq!(world.state(), WorldState::Updating);

        world.cancel_update();
        assert_eq!(world.state(), WorldState::Running);
    }

    #[test]
    fn test_world_info() {
        let world = GameWorld::new(1).unwrap();
        let info = world.info();

        assert!(info.contains("World 1"));
        assert!(info.contains("Rustscape"));
    }

    #[test]
    fn direction_delta_matches_table() {
        assert_eq!(direction_delta(1), (0, 1));
        assert_eq!(direction_delta(6), (0, -1));
        assert_eq!(direction_delta(-1), (0, 0));
    }
}
