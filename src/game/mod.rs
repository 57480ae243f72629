//! Game module
//!
//! This module contains the core game logic for the Rustscape server:
//! - World management (tick scheduling, entity updates)
//! - Player management (state, skills, movement)
//! - Coordinate model (region/zone/mapsquare derivation)
//! - Movement queue and run energy
//! - Per-observer tracking lists
//! - Collision grid
//! - NPC definitions/instances
//! - Player persistence hook

pub mod collision;
pub mod coord;
pub mod movement;
pub mod npc;
pub mod player;
pub mod store;
pub mod tracking;
pub mod world;
