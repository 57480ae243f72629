//! Player module
//!
//! Manages seated-player state: identity, appearance, skills, position,
//! movement queue, tracking list, and the per-tick update-flag mask.

use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::info;

use crate::error::{GameError, Result, RustscapeError};
use crate::game::coord::Position;
use crate::game::movement::MovementQueue;
use crate::game::store::PlayerRecord;
use crate::game::tracking::PlayerTracking;
use crate::protocol::login::default_spawn;
use crate::protocol::update_flags::UpdateFlags;

/// Maximum player index value; index 0 is reserved.
pub const MAX_PLAYER_INDEX: u16 = 2047;

/// Player rights/privilege levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PlayerRights {
    #[default]
    Normal = 0,
    Moderator = 1,
    Administrator = 2,
}

impl PlayerRights {
    pub fn is_moderator(&self) -> bool {
        matches!(self, Self::Moderator | Self::Administrator)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Administrator)
    }
}

/// Player appearance, used to drive the APPEARANCE update-flag block.
#[derive(Debug, Clone)]
pub struct Appearance {
    pub gender: u8,
    pub head: u16,
    pub torso: u16,
    pub arms: u16,
    pub hands: u16,
    pub legs: u16,
    pub feet: u16,
    pub beard: u16,
    pub hair_color: u8,
    pub torso_color: u8,
    pub legs_color: u8,
    pub feet_color: u8,
    pub skin_color: u8,
}

impl Appearance {
    pub fn default_male() -> Self {
        Self {
            gender: 0,
            head: 0,
            torso: 18,
            arms: 26,
            hands: 33,
            legs: 36,
            feet: 42,
            beard: 10,
            hair_color: 0,
            torso_color: 0,
            legs_color: 0,
            feet_color: 0,
            skin_color: 0,
        }
    }
}

/// Skill IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Skill {
    Attack = 0,
    Defence = 1,
    Strength = 2,
    Hitpoints = 3,
    Ranged = 4,
    Prayer = 5,
    Magic = 6,
    Cooking = 7,
    Woodcutting = 8,
    Fletching = 9,
    Fishing = 10,
    Firemaking = 11,
    Crafting = 12,
    Smithing = 13,
    Mining = 14,
    Herblore = 15,
    Agility = 16,
    Thieving = 17,
    Slayer = 18,
    Farming = 19,
    Runecrafting = 20,
    Hunter = 21,
    Construction = 22,
    Summoning = 23,
    Dungeoneering = 24,
}

impl Skill {
    pub const COUNT: usize = 25;
}

/// Player skills data.
#[derive(Debug, Clone)]
pub struct Skills {
    pub levels: [u8; Skill::COUNT],
    pub experience: [u32; Skill::COUNT],
}

impl Default for Skills {
    fn default() -> Self {
        let mut levels = [1u8; Skill::COUNT];
        levels[Skill::Hitpoints as usize] = 10;
        let mut experience = [0u32; Skill::COUNT];
        experience[Skill::Hitpoints as usize] = 1154;
        Self { levels, experience }
    }
}

impl Skills {
    pub fn level(&self, skill: Skill) -> u8 {
        self.levels[skill as usize]
    }

    pub fn set_level(&mut self, skill: Skill, level: u8) {
        self.levels[skill as usize] = level;
    }

    pub fn total_level(&self) -> u32 {
        self.levels.iter().map(|&l| l as u32).sum()
    }

    pub fn combat_level(&self) -> u8 {
        let attack = self.level(Skill::Attack) as f64;
        let strength = self.level(Skill::Strength) as f64;
        let defence = self.level(Skill::Defence) as f64;
        let hitpoints = self.level(Skill::Hitpoints) as f64;
        let prayer = self.level(Skill::Prayer) as f64;
        let ranged = self.level(Skill::Ranged) as f64;
        let magic = self.level(Skill::Magic) as f64;
        let summoning = self.level(Skill::Summoning) as f64;

        let base =
            (defence + hitpoints + (prayer / 2.0).floor() + (summoning / 2.0).floor()) / 4.0;
        let melee = (attack + strength) * 0.325;
        let range = ranged * 0.4875;
        let mage = magic * 0.4875;

        (base + melee.max(range).max(mage)).floor() as u8
    }
}

/// A seated player entity in the world.
pub struct Player {
    pub index: u16,
    pub username: String,
    pub display_name: String,
    pub rights: RwLock<PlayerRights>,
    pub position: RwLock<Position>,
    pub origin_position: RwLock<Position>,
    pub appearance: RwLock<Appearance>,
    pub skills: RwLock<Skills>,
    pub movement: RwLock<MovementQueue>,
    pub tracking: RwLock<PlayerTracking>,
    pub update_flags: RwLock<UpdateFlags>,
    pub needs_placement: RwLock<bool>,
    pub placement_ticks: AtomicU16,
    pub last_activity: AtomicU64,
}

impl Player {
    /// Create a fresh player at the default spawn, with update flags
    /// primed for an initial appearance build (see the login flow's
    /// post-login ordering note).
    pub fn new(index: u16, username: String) -> Self {
        let display_name = username.replace('_', " ");
        Self {
            index,
            username,
            display_name,
            rights: RwLock::new(PlayerRights::Normal),
            position: RwLock::new(default_spawn()),
            origin_position: RwLock::new(default_spawn()),
            appearance: RwLock::new(Appearance::default_male()),
            skills: RwLock::new(Skills::default()),
            movement: RwLock::new(MovementQueue::new()),
            tracking: RwLock::new(PlayerTracking::new()),
            update_flags: RwLock::new(UpdateFlags::APPEARANCE),
            needs_placement: RwLock::new(true),
            placement_ticks: AtomicU16::new(0),
            last_activity: AtomicU64::new(0),
        }
    }

    /// Rebuild a player from a persisted record.
    pub fn from_record(index: u16, record: &PlayerRecord) -> Self {
        let player = Self::new(index, record.username.clone());
        *player.position.write() = record.position;
        *player.origin_position.write() = record.position;
        {
            let mut skills = player.skills.write();
            skills.levels = record.skill_levels;
            for (i, xp) in record.skill_experience.iter().enumerate() {
                skills.experience[i] = *xp;
            }
        }
        player.movement.write().run_energy = record.run_energy;
        player
    }

    /// Snapshot the player's account-level state for persistence.
    pub fn to_record(&self) -> PlayerRecord {
        let skills = self.skills.read();
        PlayerRecord {
            username: self.username.clone(),
            position: *self.position.read(),
            skill_levels: skills.levels,
            skill_experience: skills.experience,
            run_energy: self.movement.read().run_energy,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn position(&self) -> Position {
        *self.position.read()
    }

    pub fn set_position(&self, position: Position) {
        *self.position.write() = position;
    }

    pub fn teleport(&self, position: Position) {
        *self.position.write() = position;
        *self.origin_position.write() = position;
        *self.needs_placement.write() = true;
        self.placement_ticks.store(0, Ordering::SeqCst);
    }

    pub fn touch(&self, tick: u64) {
        self.last_activity.store(tick, Ordering::SeqCst);
    }

    pub fn combat_level(&self) -> u8 {
        self.skills.read().combat_level()
    }

    pub fn total_level(&self) -> u32 {
        self.skills.read().total_level()
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("index", &self.index)
            .field("username", &self.username)
            .field("position", &self.position())
            .finish()
    }
}

/// Player pool - handles player lifecycle and slot allocation.
pub struct PlayerManager {
    players: DashMap<u16, Arc<Player>>,
    username_to_index: DashMap<String, u16>,
    next_index: AtomicU16,
    max_players: u16,
}

impl PlayerManager {
    pub fn new(max_players: u16) -> Self {
        Self {
            players: DashMap::new(),
            username_to_index: DashMap::new(),
            next_index: AtomicU16::new(1), // Index 0 is reserved
            max_players: max_players.min(MAX_PLAYER_INDEX),
        }
    }

    pub fn register(&self, username: String, record: Option<&PlayerRecord>) -> Result<Arc<Player>> {
        let key = username.to_lowercase();
        if self.username_to_index.contains_key(&key) {
            return Err(RustscapeError::Game(GameError::InvalidPlayerState(
                "player already registered".to_string(),
            )));
        }

        let index = self.allocate_index()?;
        let player = Arc::new(match record {
            Some(record) => Player::from_record(index, record),
            None => Player::new(index, username),
        });

        self.players.insert(index, player.clone());
        self.username_to_index.insert(key, index);

        info!(index, username = %player.username, "player registered");
        Ok(player)
    }

    pub fn unregister(&self, index: u16) {
        if let Some((_, player)) = self.players.remove(&index) {
            self.username_to_index
                .remove(&player.username.to_lowercase());
            info!(index, username = %player.username, "player unregistered");
        }
    }

    pub fn get(&self, index: u16) -> Option<Arc<Player>> {
        self.players.get(&index).map(|r| r.clone())
    }

    pub fn get_by_username(&self, username: &str) -> Option<Arc<Player>> {
        let lower = username.to_lowercase();
        self.username_to_index
            .get(&lower)
            .and_then(|idx| self.get(*idx))
    }

    pub fn count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.count() >= self.max_players as usize
    }

    fn allocate_index(&self) -> Result<u16> {
        for _ in 0..self.max_players {
            let index = self.next_index.fetch_add(1, Ordering::SeqCst);
            if index > self.max_players {
                self.next_index.store(1, Ordering::SeqCst);
                continue;
            }
            if !self.players.contains_key(&index) {
                return Ok(index);
            }
        }
        Err(RustscapeError::Game(GameError::WorldNotReady))
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Player),
    {
        for entry in self.players.iter() {
            f(&entry);
        }
    }
}

impl Default for PlayerManager {
    fn default() -> Self {
        Self::new(MAX_PLAYER_INDEX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skills_default_hitpoints_is_ten() {
        let skills = Skills::default();
        assert_eq!(skills.level(Skill::Attack), 1);
        assert_eq!(skills.level(Skill::Hitpoints), 10);
    }

    #[test]
    fn skills_combat_level_has_a_floor() {
        let skills = Skills::default();
        assert!(skills.combat_level() >= 3);
    }

    #[test]
    fn new_player_starts_needing_placement() {
        let player = Player::new(1, "TestPlayer".to_string());
        assert_eq!(player.index, 1);
        assert!(*player.needs_placement.read());
        assert_eq!(*player.update_flags.read(), UpdateFlags::APPEARANCE);
    }

    #[test]
    fn record_round_trip_preserves_position_and_energy() {
        let mut record = PlayerRecord::new_character("zezima");
        record.position = Position::new(100, 200, 1);
        record.run_energy = 4321;

        let player = Player::from_record(1, &record);
        assert_eq!(player.position(), record.position);
        assert_eq!(player.movement.read().run_energy, 4321);

        let round_tripped = player.to_record();
        assert_eq!(round_tripped.position, record.position);
        assert_eq!(round_tripped.run_energy, 4321);
    }

    #[test]
    fn player_manager_register_get_unregister() {
        let manager = PlayerManager::new(100);
        assert_eq!(manager.count(), 0);

        let player = manager.register("TestPlayer".to_string(), None).unwrap();
        assert_eq!(player.index, 1);
        assert_eq!(manager.count(), 1);

        let found = manager.get_by_username("testplayer").unwrap();
        assert_eq!(found.index, 1);

        manager.unregister(1);
        assert_eq!(manager.count(), 0);
    }

    #[test]
    fn player_manager_rejects_duplicate_username() {
        let manager = PlayerManager::new(100);
        manager.register("TestPlayer".to_string(), None).unwrap();
        assert!(manager.register("TestPlayer".to_string(), None).is_err());
    }
}
